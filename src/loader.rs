//! JSONL load path - the thin end of an external loading pipeline
//!
//! One JSON object per line, tagged with a `type` field:
//!
//! ```json
//! {"type": "date", "date": "2025-01-01"}
//! {"type": "customer", "customer_id": "C1", "name": "Ada", "country": "PT"}
//! {"type": "product", "product_id": "P1", "name": "Widget", "category": "Widgets"}
//! {"type": "store", "store_id": "S1", "name": "Main St", "channel": "offline"}
//! {"type": "sale", "date": "2025-01-01", "customer_id": "C1", "product_id": "P1",
//!  "store_id": "S1", "quantity": 3, "unit_price": 10.0}
//! ```
//!
//! Sales carry natural keys; the loader resolves them to surrogate keys
//! before the fact insert. Rejected records are skipped and logged, never
//! retried: retry/backoff belongs to whatever feeds this file.

use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::dimension::{Customer, DateRow, Product, Store, date_key_for};
use crate::fact::{SalesRecord, TotalsPolicy};
use crate::storage::MartStore;
use crate::{Error, Result};

/// One line of a load file
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoadRecord {
    Date {
        date: NaiveDate,
    },
    Customer {
        #[serde(flatten)]
        row: Customer,
    },
    Product {
        #[serde(flatten)]
        row: Product,
    },
    Store {
        #[serde(flatten)]
        row: Store,
    },
    Sale {
        date: NaiveDate,
        customer_id: String,
        product_id: String,
        store_id: String,
        quantity: i64,
        unit_price: f64,
        /// Stored as-is when present (subject to the totals policy),
        /// computed from quantity * unit_price otherwise
        total_amount: Option<f64>,
    },
}

/// Counters for one load run
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct LoadReport {
    pub dates: usize,
    pub customers: usize,
    pub products: usize,
    pub stores: usize,
    pub facts: usize,
    pub failed: usize,
}

impl LoadReport {
    pub fn loaded(&self) -> usize {
        self.dates + self.customers + self.products + self.stores + self.facts
    }
}

impl std::fmt::Display for LoadReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Load Report:")?;
        writeln!(f, "  Dates: {}", self.dates)?;
        writeln!(f, "  Customers: {}", self.customers)?;
        writeln!(f, "  Products: {}", self.products)?;
        writeln!(f, "  Stores: {}", self.stores)?;
        writeln!(f, "  Facts: {}", self.facts)?;
        writeln!(f, "  Failed: {}", self.failed)
    }
}

/// Applies load records to a store, resolving natural keys
pub struct Loader<'a> {
    store: &'a MartStore,
    policy: TotalsPolicy,
}

impl<'a> Loader<'a> {
    pub fn new(store: &'a MartStore, policy: TotalsPolicy) -> Self {
        Self { store, policy }
    }

    /// Load a JSONL file
    pub fn load_path(&self, path: &Path) -> Result<LoadReport> {
        let file = std::fs::File::open(path)?;
        self.load_reader(BufReader::new(file))
    }

    /// Load newline-delimited JSON records from any reader.
    ///
    /// Bad lines are counted and skipped; dimension rows must appear before
    /// the facts that reference them, so files are applied in order.
    pub fn load_reader<R: BufRead>(&self, reader: R) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let record: LoadRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(e) => {
                    tracing::error!("line {}: unparseable record: {}", line_no + 1, e);
                    report.failed += 1;
                    continue;
                }
            };

            match self.apply(&record) {
                Ok(kind) => match kind {
                    LoadedKind::Date => report.dates += 1,
                    LoadedKind::Customer => report.customers += 1,
                    LoadedKind::Product => report.products += 1,
                    LoadedKind::Store => report.stores += 1,
                    LoadedKind::Fact => report.facts += 1,
                },
                Err(e) => {
                    tracing::error!("line {}: rejected: {}", line_no + 1, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Apply a single record
    pub fn apply(&self, record: &LoadRecord) -> Result<LoadedKind> {
        match record {
            LoadRecord::Date { date } => {
                self.store.insert_date(&DateRow::from_date(*date))?;
                Ok(LoadedKind::Date)
            }
            LoadRecord::Customer { row } => {
                self.store.insert_customer(row)?;
                Ok(LoadedKind::Customer)
            }
            LoadRecord::Product { row } => {
                self.store.insert_product(row)?;
                Ok(LoadedKind::Product)
            }
            LoadRecord::Store { row } => {
                self.store.insert_store(row)?;
                Ok(LoadedKind::Store)
            }
            LoadRecord::Sale {
                date,
                customer_id,
                product_id,
                store_id,
                quantity,
                unit_price,
                total_amount,
            } => {
                let customer_key = self.resolve(customer_id, "customer", |id| {
                    self.store.customer_key_for(id)
                })?;
                let product_key =
                    self.resolve(product_id, "product", |id| self.store.product_key_for(id))?;
                let store_key =
                    self.resolve(store_id, "store", |id| self.store.store_key_for(id))?;

                let mut sale = SalesRecord::new(
                    date_key_for(*date),
                    customer_key,
                    product_key,
                    store_key,
                    *quantity,
                    *unit_price,
                );
                if let Some(total) = total_amount {
                    sale = sale.with_total(*total);
                }
                self.store.insert_fact(&sale, self.policy)?;
                Ok(LoadedKind::Fact)
            }
        }
    }

    fn resolve(
        &self,
        natural_key: &str,
        dimension: &str,
        lookup: impl Fn(&str) -> Result<Option<i64>>,
    ) -> Result<i64> {
        lookup(natural_key)?.ok_or_else(|| {
            Error::ReferentialIntegrityViolation(format!(
                "{} natural key {} has no dimension row",
                dimension, natural_key
            ))
        })
    }
}

/// What kind of row a record became
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadedKind {
    Date,
    Customer,
    Product,
    Store,
    Fact,
}

/// Populate the date dimension for every day in `[start, end]`, skipping
/// dates already present. Returns the number of rows inserted.
pub fn populate_date_range(store: &MartStore, start: NaiveDate, end: NaiveDate) -> Result<usize> {
    if end < start {
        return Err(Error::InvalidRecord(format!(
            "date range end {} precedes start {}",
            end, start
        )));
    }

    let mut inserted = 0;
    let mut date = start;
    while date <= end {
        if store.get_date(date)?.is_none() {
            store.insert_date(&DateRow::from_date(date))?;
            inserted += 1;
        }
        date = date.succ_opt().ok_or_else(|| {
            Error::InvalidRecord(format!("date overflow past {}", date))
        })?;
    }
    Ok(inserted)
}
