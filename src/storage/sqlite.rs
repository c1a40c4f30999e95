//! SQLite storage implementation

use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, ffi, params};

use super::schema;
use crate::dimension::{Channel, Customer, DateRow, Product, Store};
use crate::fact::{SalesRecord, TotalsPolicy};
use crate::{Error, Result};

/// SQLite-backed store for the star schema.
///
/// Dimension inserts allocate surrogate keys from `surrogate_sequences`
/// (date keys are YYYYMMDD-derived instead); fact inserts verify all four
/// dimension keys before writing. Single writer assumed; concurrent readers
/// get SQLite's standard isolation.
pub struct MartStore {
    conn: Connection,
}

impl MartStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.enable_foreign_keys()?;
        store.create_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut store = Self { conn };
        store.enable_foreign_keys()?;
        store.create_schema()?;
        Ok(store)
    }

    fn enable_foreign_keys(&self) -> Result<()> {
        self.conn.pragma_update(None, "foreign_keys", true)?;
        Ok(())
    }

    /// Create the star schema.
    ///
    /// Idempotent: every statement is `IF NOT EXISTS`. Runs in a single
    /// transaction, so a failure leaves no partially-created schema. Fails
    /// with [`Error::Schema`] if an existing table is missing expected
    /// columns (an incompatible prior schema, not re-creatable in place).
    pub fn create_schema(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        for stmt in schema::all_schema_statements() {
            tx.execute(stmt, [])?;
        }
        tx.commit()?;
        self.verify_schema()
    }

    /// Drop all tables and re-create them, losing any loaded data
    pub fn reset_schema(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        for stmt in schema::DROP_STATEMENTS {
            tx.execute(stmt, [])?;
        }
        tx.commit()?;
        self.create_schema()
    }

    /// Check that every star table carries the columns the insert and query
    /// paths rely on. `CREATE TABLE IF NOT EXISTS` silently keeps a
    /// pre-existing table, so a database created by something else can pass
    /// creation and still be unusable.
    fn verify_schema(&self) -> Result<()> {
        const REQUIRED: &[(&str, &[&str])] = &[
            ("dim_date", &["date_key", "calendar_date", "year", "quarter", "month", "day_of_month", "day_of_week", "is_weekend"]),
            ("dim_customer", &["customer_key", "customer_id", "name", "gender", "age_band", "country", "signup_date"]),
            ("dim_product", &["product_key", "product_id", "name", "category", "brand", "list_price", "active"]),
            ("dim_store", &["store_key", "store_id", "name", "region", "channel"]),
            ("fact_sales", &["sale_key", "date_key", "customer_key", "product_key", "store_key", "quantity", "unit_price", "total_amount"]),
        ];

        for (table, columns) in REQUIRED {
            let mut stmt = self
                .conn
                .prepare("SELECT name FROM pragma_table_info(?1)")?;
            let present: Vec<String> = stmt
                .query_map([table], |row| row.get(0))?
                .collect::<rusqlite::Result<_>>()?;

            for column in *columns {
                if !present.iter().any(|c| c == column) {
                    return Err(Error::Schema(format!(
                        "existing table {} is missing column {}; refusing to treat it as part of the star",
                        table, column
                    )));
                }
            }
        }
        Ok(())
    }

    /// Shared connection handle for the query engine
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    // ========== Surrogate Key Allocation ==========

    /// Allocate the next surrogate key for a dimension table.
    ///
    /// Reads and bumps `surrogate_sequences` rather than using engine
    /// autoincrement, so allocation policy is portable across storage
    /// backends. A failed insert after allocation leaves a gap in the
    /// sequence; gaps are harmless.
    fn allocate_key(&self, table: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO surrogate_sequences (table_name, next_key) VALUES (?1, 1)",
            [table],
        )?;
        let key: i64 = self.conn.query_row(
            "SELECT next_key FROM surrogate_sequences WHERE table_name = ?1",
            [table],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "UPDATE surrogate_sequences SET next_key = ?1 WHERE table_name = ?2",
            params![key + 1, table],
        )?;
        Ok(key)
    }

    // ========== Dimension Operations ==========

    /// Insert a date dimension row.
    ///
    /// One row per calendar date; re-inserting the same date (or date key)
    /// fails with [`Error::UniquenessViolation`]. No implicit upsert.
    pub fn insert_date(&self, row: &DateRow) -> Result<i64> {
        row.validate()?;
        self.conn
            .execute(
                r#"
                INSERT INTO dim_date (date_key, calendar_date, year, quarter, month, day_of_month, day_of_week, is_weekend)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    row.date_key,
                    row.calendar_date.to_string(),
                    row.year,
                    row.quarter,
                    row.month,
                    row.day_of_month,
                    row.day_of_week,
                    row.is_weekend,
                ],
            )
            .map_err(|e| map_violation(e, &format!("dim_date {}", row.calendar_date)))?;
        Ok(row.date_key)
    }

    /// Insert a customer dimension row, allocating its surrogate key.
    ///
    /// Fails with [`Error::UniquenessViolation`] if the natural key already
    /// exists. Upsert is the loading pipeline's call, not the schema's.
    pub fn insert_customer(&self, customer: &Customer) -> Result<i64> {
        customer.validate()?;
        if self.customer_key_for(&customer.customer_id)?.is_some() {
            return Err(Error::UniquenessViolation(format!(
                "customer natural key {} already exists",
                customer.customer_id
            )));
        }
        let key = self.allocate_key("dim_customer")?;
        self.conn
            .execute(
                r#"
                INSERT INTO dim_customer (customer_key, customer_id, name, gender, age_band, country, signup_date)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    key,
                    customer.customer_id,
                    customer.name,
                    customer.gender,
                    customer.age_band,
                    customer.country,
                    customer.signup_date.map(|d| d.to_string()),
                ],
            )
            .map_err(|e| map_violation(e, &format!("dim_customer {}", customer.customer_id)))?;
        Ok(key)
    }

    /// Insert a product dimension row, allocating its surrogate key
    pub fn insert_product(&self, product: &Product) -> Result<i64> {
        product.validate()?;
        if self.product_key_for(&product.product_id)?.is_some() {
            return Err(Error::UniquenessViolation(format!(
                "product natural key {} already exists",
                product.product_id
            )));
        }
        let key = self.allocate_key("dim_product")?;
        self.conn
            .execute(
                r#"
                INSERT INTO dim_product (product_key, product_id, name, category, brand, list_price, active)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    key,
                    product.product_id,
                    product.name,
                    product.category,
                    product.brand,
                    product.list_price,
                    product.active,
                ],
            )
            .map_err(|e| map_violation(e, &format!("dim_product {}", product.product_id)))?;
        Ok(key)
    }

    /// Insert a store dimension row, allocating its surrogate key
    pub fn insert_store(&self, store: &Store) -> Result<i64> {
        store.validate()?;
        if self.store_key_for(&store.store_id)?.is_some() {
            return Err(Error::UniquenessViolation(format!(
                "store natural key {} already exists",
                store.store_id
            )));
        }
        let key = self.allocate_key("dim_store")?;
        self.conn
            .execute(
                r#"
                INSERT INTO dim_store (store_key, store_id, name, region, channel)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    key,
                    store.store_id,
                    store.name,
                    store.region,
                    store.channel.map(|c| c.as_str()),
                ],
            )
            .map_err(|e| map_violation(e, &format!("dim_store {}", store.store_id)))?;
        Ok(key)
    }

    /// Mark a product as retired without touching historical facts
    pub fn retire_product(&self, product_id: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE dim_product SET active = 0 WHERE product_id = ?1",
            [product_id],
        )?;
        Ok(changed > 0)
    }

    // ========== Natural Key Resolution ==========

    /// Resolve a customer natural key to its surrogate key
    pub fn customer_key_for(&self, customer_id: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT customer_key FROM dim_customer WHERE customer_id = ?1",
                [customer_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Resolve a product natural key to its surrogate key
    pub fn product_key_for(&self, product_id: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT product_key FROM dim_product WHERE product_id = ?1",
                [product_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Resolve a store natural key to its surrogate key
    pub fn store_key_for(&self, store_id: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT store_key FROM dim_store WHERE store_id = ?1",
                [store_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get the date row for a calendar date, if loaded
    pub fn get_date(&self, date: NaiveDate) -> Result<Option<DateRow>> {
        self.conn
            .query_row(
                r#"
                SELECT date_key, calendar_date, year, quarter, month, day_of_month, day_of_week, is_weekend
                FROM dim_date WHERE calendar_date = ?1
                "#,
                [date.to_string()],
                |row| row_to_date(row),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a product with its surrogate key by natural key
    pub fn get_product(&self, product_id: &str) -> Result<Option<(i64, Product)>> {
        self.conn
            .query_row(
                r#"
                SELECT product_key, product_id, name, category, brand, list_price, active
                FROM dim_product WHERE product_id = ?1
                "#,
                [product_id],
                |row| {
                    Ok((
                        row.get(0)?,
                        Product {
                            product_id: row.get(1)?,
                            name: row.get(2)?,
                            category: row.get(3)?,
                            brand: row.get(4)?,
                            list_price: row.get(5)?,
                            active: row.get(6)?,
                        },
                    ))
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a store with its surrogate key by natural key
    pub fn get_store(&self, store_id: &str) -> Result<Option<(i64, Store)>> {
        self.conn
            .query_row(
                r#"
                SELECT store_key, store_id, name, region, channel
                FROM dim_store WHERE store_id = ?1
                "#,
                [store_id],
                |row| {
                    let channel: Option<String> = row.get(4)?;
                    let channel = channel
                        .map(|s| {
                            Channel::from_str(&s).map_err(|e| {
                                rusqlite::Error::FromSqlConversionFailure(
                                    4,
                                    rusqlite::types::Type::Text,
                                    Box::new(e),
                                )
                            })
                        })
                        .transpose()?;
                    Ok((
                        row.get(0)?,
                        Store {
                            store_id: row.get(1)?,
                            name: row.get(2)?,
                            region: row.get(3)?,
                            channel,
                        },
                    ))
                },
            )
            .optional()
            .map_err(Into::into)
    }

    fn dimension_key_exists(&self, table: &str, key_column: &str, key: i64) -> Result<bool> {
        let sql = format!("SELECT 1 FROM {} WHERE {} = ?1", table, key_column);
        let found: Option<i64> = self
            .conn
            .query_row(&sql, [key], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    // ========== Fact Operations ==========

    /// Insert one immutable fact row.
    ///
    /// Validates measures against `policy`, then verifies each of the four
    /// dimension keys exists before writing. Nothing is inserted on any
    /// failure; the caller decides whether to retry or skip.
    pub fn insert_fact(&self, record: &SalesRecord, policy: TotalsPolicy) -> Result<i64> {
        record.validate(policy)?;

        let references = [
            ("dim_date", "date_key", record.date_key),
            ("dim_customer", "customer_key", record.customer_key),
            ("dim_product", "product_key", record.product_key),
            ("dim_store", "store_key", record.store_key),
        ];
        for (table, key_column, key) in references {
            if !self.dimension_key_exists(table, key_column, key)? {
                return Err(Error::ReferentialIntegrityViolation(format!(
                    "{}.{} = {} does not exist",
                    table, key_column, key
                )));
            }
        }

        self.conn
            .execute(
                r#"
                INSERT INTO fact_sales (date_key, customer_key, product_key, store_key, quantity, unit_price, total_amount)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    record.date_key,
                    record.customer_key,
                    record.product_key,
                    record.store_key,
                    record.quantity,
                    record.unit_price,
                    record.total_amount,
                ],
            )
            .map_err(|e| map_violation(e, "fact_sales"))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Delete a fact row by its surrogate key (explicit correction path).
    /// Returns false if no such row existed.
    pub fn delete_fact(&self, sale_key: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM fact_sales WHERE sale_key = ?1", [sale_key])?;
        Ok(changed > 0)
    }

    // ========== Bulk Operations ==========

    /// Begin a transaction for bulk loads
    pub fn begin_transaction(&mut self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", [])?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&mut self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&mut self) -> Result<()> {
        self.conn.execute("ROLLBACK", [])?;
        Ok(())
    }

    // ========== Statistics ==========

    fn count(&self, table: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Count date dimension rows
    pub fn count_dates(&self) -> Result<usize> {
        self.count("dim_date")
    }

    /// Count customer dimension rows
    pub fn count_customers(&self) -> Result<usize> {
        self.count("dim_customer")
    }

    /// Count product dimension rows
    pub fn count_products(&self) -> Result<usize> {
        self.count("dim_product")
    }

    /// Count store dimension rows
    pub fn count_stores(&self) -> Result<usize> {
        self.count("dim_store")
    }

    /// Count fact rows
    pub fn count_facts(&self) -> Result<usize> {
        self.count("fact_sales")
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<MartStats> {
        Ok(MartStats {
            dates: self.count_dates()?,
            customers: self.count_customers()?,
            products: self.count_products()?,
            stores: self.count_stores()?,
            facts: self.count_facts()?,
        })
    }
}

/// Map SQLite constraint failures onto the typed violation errors.
/// The Rust-side checks catch these first on the normal path; the SQL
/// constraints are the backstop for writes that bypass them.
fn map_violation(e: rusqlite::Error, context: &str) -> Error {
    if let rusqlite::Error::SqliteFailure(failure, ref message) = e {
        let detail = message.clone().unwrap_or_default();
        match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                return Error::UniquenessViolation(format!("{}: {}", context, detail));
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                return Error::ReferentialIntegrityViolation(format!("{}: {}", context, detail));
            }
            ffi::SQLITE_CONSTRAINT_CHECK | ffi::SQLITE_CONSTRAINT_NOTNULL => {
                return Error::ConstraintViolation(format!("{}: {}", context, detail));
            }
            _ => {}
        }
    }
    Error::Storage(e)
}

/// Helper to convert a row to a DateRow
fn row_to_date(row: &rusqlite::Row) -> rusqlite::Result<DateRow> {
    let date_str: String = row.get(1)?;
    let calendar_date = NaiveDate::from_str(&date_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(DateRow {
        date_key: row.get(0)?,
        calendar_date,
        year: row.get(2)?,
        quarter: row.get(3)?,
        month: row.get(4)?,
        day_of_month: row.get(5)?,
        day_of_week: row.get(6)?,
        is_weekend: row.get(7)?,
    })
}

/// Row counts per star table
#[derive(Debug, Clone, serde::Serialize)]
pub struct MartStats {
    pub dates: usize,
    pub customers: usize,
    pub products: usize,
    pub stores: usize,
    pub facts: usize,
}

impl std::fmt::Display for MartStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Mart Statistics:")?;
        writeln!(f, "  Dates: {}", self.dates)?;
        writeln!(f, "  Customers: {}", self.customers)?;
        writeln!(f, "  Products: {}", self.products)?;
        writeln!(f, "  Stores: {}", self.stores)?;
        writeln!(f, "  Facts: {}", self.facts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> (MartStore, i64, i64, i64, i64) {
        let store = MartStore::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let date_key = store.insert_date(&DateRow::from_date(date)).unwrap();
        let customer_key = store.insert_customer(&Customer::new("C1", "Ada")).unwrap();
        let product_key = store
            .insert_product(&Product::new("P1", "Widget").with_category("Widgets"))
            .unwrap();
        let store_key = store
            .insert_store(&Store::new("S1", "Main St").with_channel(Channel::Offline))
            .unwrap();
        (store, date_key, customer_key, product_key, store_key)
    }

    #[test]
    fn test_schema_create_is_idempotent() {
        let mut store = MartStore::open_in_memory().unwrap();
        store.create_schema().unwrap();
        store.create_schema().unwrap();
    }

    #[test]
    fn test_incompatible_existing_table_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE dim_date (wrong TEXT)", [])
            .unwrap();
        let mut store = MartStore { conn };
        store.enable_foreign_keys().unwrap();
        assert!(matches!(store.create_schema(), Err(Error::Schema(_))));
    }

    #[test]
    fn test_reset_schema_drops_data() {
        let (mut store, date_key, customer_key, product_key, store_key) = seeded_store();
        store
            .insert_fact(
                &SalesRecord::new(date_key, customer_key, product_key, store_key, 1, 5.0),
                TotalsPolicy::Enforce,
            )
            .unwrap();
        store.reset_schema().unwrap();
        assert_eq!(store.stats().unwrap().facts, 0);
        assert_eq!(store.count_customers().unwrap(), 0);
    }

    #[test]
    fn test_surrogate_keys_are_sequential_per_dimension() {
        let store = MartStore::open_in_memory().unwrap();
        let k1 = store.insert_customer(&Customer::new("C1", "Ada")).unwrap();
        let k2 = store.insert_customer(&Customer::new("C2", "Grace")).unwrap();
        let p1 = store.insert_product(&Product::new("P1", "Widget")).unwrap();
        assert_eq!(k1, 1);
        assert_eq!(k2, 2);
        // Each dimension owns its own sequence
        assert_eq!(p1, 1);
    }

    #[test]
    fn test_duplicate_natural_key_rejected() {
        let store = MartStore::open_in_memory().unwrap();
        store.insert_customer(&Customer::new("C1", "Ada")).unwrap();
        let err = store
            .insert_customer(&Customer::new("C1", "Imposter"))
            .unwrap_err();
        assert!(matches!(err, Error::UniquenessViolation(_)));
        // The original row is untouched
        assert_eq!(store.count_customers().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_date_rejected() {
        let store = MartStore::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        store.insert_date(&DateRow::from_date(date)).unwrap();
        let err = store.insert_date(&DateRow::from_date(date)).unwrap_err();
        assert!(matches!(err, Error::UniquenessViolation(_)));
    }

    #[test]
    fn test_date_roundtrip_preserves_derived_fields() {
        let store = MartStore::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        store.insert_date(&DateRow::from_date(date)).unwrap();

        let row = store.get_date(date).unwrap().unwrap();
        assert_eq!(row, DateRow::from_date(date));
        assert_eq!(row.date_key, 20250115);
        assert_eq!(row.year, 2025);
        assert_eq!(row.quarter, 1);
    }

    #[test]
    fn test_natural_key_resolution() {
        let (store, _, customer_key, product_key, store_key) = seeded_store();
        assert_eq!(store.customer_key_for("C1").unwrap(), Some(customer_key));
        assert_eq!(store.product_key_for("P1").unwrap(), Some(product_key));
        assert_eq!(store.store_key_for("S1").unwrap(), Some(store_key));
        assert_eq!(store.customer_key_for("C999").unwrap(), None);

        let (key, shop) = store.get_store("S1").unwrap().unwrap();
        assert_eq!(key, store_key);
        assert_eq!(shop.channel, Some(Channel::Offline));
    }

    #[test]
    fn test_bulk_transaction() {
        let mut store = MartStore::open_in_memory().unwrap();

        store.begin_transaction().unwrap();
        store.insert_customer(&Customer::new("C1", "Ada")).unwrap();
        store.rollback().unwrap();
        assert_eq!(store.count_customers().unwrap(), 0);

        store.begin_transaction().unwrap();
        store.insert_customer(&Customer::new("C1", "Ada")).unwrap();
        store.commit().unwrap();
        assert_eq!(store.count_customers().unwrap(), 1);
    }

    #[test]
    fn test_fact_insert_and_count() {
        let (store, date_key, customer_key, product_key, store_key) = seeded_store();
        let record = SalesRecord::new(date_key, customer_key, product_key, store_key, 3, 10.0);
        let sale_key = store.insert_fact(&record, TotalsPolicy::Enforce).unwrap();
        assert!(sale_key > 0);
        assert_eq!(store.count_facts().unwrap(), 1);
    }

    #[test]
    fn test_fact_with_missing_dimension_rejected() {
        let (store, date_key, customer_key, product_key, _) = seeded_store();
        let record = SalesRecord::new(date_key, customer_key, product_key, 999_999, 3, 10.0);
        let err = store.insert_fact(&record, TotalsPolicy::Enforce).unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrityViolation(_)));
        // No partial row
        assert_eq!(store.count_facts().unwrap(), 0);
    }

    #[test]
    fn test_fact_with_negative_measures_rejected() {
        let (store, date_key, customer_key, product_key, store_key) = seeded_store();

        let mut record = SalesRecord::new(date_key, customer_key, product_key, store_key, 3, 10.0);
        record.quantity = -3;
        let err = store.insert_fact(&record, TotalsPolicy::Trust).unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(_)));

        let mut record = SalesRecord::new(date_key, customer_key, product_key, store_key, 3, 10.0);
        record.unit_price = -10.0;
        let err = store.insert_fact(&record, TotalsPolicy::Trust).unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(_)));

        assert_eq!(store.count_facts().unwrap(), 0);
    }

    #[test]
    fn test_fact_totals_policy() {
        let (store, date_key, customer_key, product_key, store_key) = seeded_store();
        let discounted =
            SalesRecord::new(date_key, customer_key, product_key, store_key, 3, 10.0)
                .with_total(25.0);

        let err = store
            .insert_fact(&discounted, TotalsPolicy::Enforce)
            .unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(_)));

        store.insert_fact(&discounted, TotalsPolicy::Trust).unwrap();
        assert_eq!(store.count_facts().unwrap(), 1);
    }

    #[test]
    fn test_fact_delete_correction_path() {
        let (store, date_key, customer_key, product_key, store_key) = seeded_store();
        let record = SalesRecord::new(date_key, customer_key, product_key, store_key, 3, 10.0);
        let sale_key = store.insert_fact(&record, TotalsPolicy::Enforce).unwrap();

        assert!(store.delete_fact(sale_key).unwrap());
        assert!(!store.delete_fact(sale_key).unwrap());
        assert_eq!(store.count_facts().unwrap(), 0);
    }

    #[test]
    fn test_retired_product_keeps_historical_facts() {
        let (store, date_key, customer_key, product_key, store_key) = seeded_store();
        let record = SalesRecord::new(date_key, customer_key, product_key, store_key, 2, 4.0);
        store.insert_fact(&record, TotalsPolicy::Enforce).unwrap();

        assert!(store.retire_product("P1").unwrap());
        let (key, product) = store.get_product("P1").unwrap().unwrap();
        assert_eq!(key, product_key);
        assert!(!product.active);
        assert_eq!(store.count_facts().unwrap(), 1);
    }

    #[test]
    fn test_stats_display() {
        let store = MartStore::open_in_memory().unwrap();
        let rendered = store.stats().unwrap().to_string();
        assert!(rendered.contains("Facts: 0"));
    }

    #[test]
    fn test_stats() {
        let (store, date_key, customer_key, product_key, store_key) = seeded_store();
        store
            .insert_fact(
                &SalesRecord::new(date_key, customer_key, product_key, store_key, 1, 1.0),
                TotalsPolicy::Enforce,
            )
            .unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.dates, 1);
        assert_eq!(stats.customers, 1);
        assert_eq!(stats.products, 1);
        assert_eq!(stats.stores, 1);
        assert_eq!(stats.facts, 1);
    }

    #[test]
    fn test_open_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mart.db");

        {
            let store = MartStore::open(&path).unwrap();
            store.insert_customer(&Customer::new("C1", "Ada")).unwrap();
        }

        let store = MartStore::open(&path).unwrap();
        assert_eq!(store.count_customers().unwrap(), 1);
        // Sequence continues where it left off
        let k2 = store.insert_customer(&Customer::new("C2", "Grace")).unwrap();
        assert_eq!(k2, 2);
    }
}
