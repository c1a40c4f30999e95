//! Aggregate query engine
//!
//! Composes ordinary relational SQL over the star: the fact table joined to
//! exactly the dimensions a query touches, grouped by any subset of
//! dimension attributes. No planner; SQLite's own join machinery does the
//! work, leaning on the per-foreign-key indexes.

use rusqlite::types::Value;
use serde::Serialize;
use std::str::FromStr;

use crate::storage::MartStore;
use crate::{Error, Result};

/// Dimension tables a query can join to, in canonical join order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DimTable {
    Date,
    Customer,
    Product,
    Store,
}

impl DimTable {
    fn join_sql(&self) -> &'static str {
        match self {
            DimTable::Date => "JOIN dim_date d ON d.date_key = f.date_key",
            DimTable::Customer => "JOIN dim_customer c ON c.customer_key = f.customer_key",
            DimTable::Product => "JOIN dim_product p ON p.product_key = f.product_key",
            DimTable::Store => "JOIN dim_store s ON s.store_key = f.store_key",
        }
    }

    fn all_in_join_order() -> &'static [DimTable] {
        &[
            DimTable::Date,
            DimTable::Customer,
            DimTable::Product,
            DimTable::Store,
        ]
    }
}

/// Dimension attributes available for grouping and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupField {
    Year,
    Quarter,
    Month,
    DayOfWeek,
    Weekend,
    Country,
    Gender,
    AgeBand,
    Customer,
    Category,
    Brand,
    Product,
    Region,
    Channel,
    Store,
}

impl GroupField {
    /// CLI/report name of the field
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupField::Year => "year",
            GroupField::Quarter => "quarter",
            GroupField::Month => "month",
            GroupField::DayOfWeek => "day_of_week",
            GroupField::Weekend => "weekend",
            GroupField::Country => "country",
            GroupField::Gender => "gender",
            GroupField::AgeBand => "age_band",
            GroupField::Customer => "customer",
            GroupField::Category => "category",
            GroupField::Brand => "brand",
            GroupField::Product => "product",
            GroupField::Region => "region",
            GroupField::Channel => "channel",
            GroupField::Store => "store",
        }
    }

    /// Get all group fields
    pub fn all() -> &'static [GroupField] {
        &[
            GroupField::Year,
            GroupField::Quarter,
            GroupField::Month,
            GroupField::DayOfWeek,
            GroupField::Weekend,
            GroupField::Country,
            GroupField::Gender,
            GroupField::AgeBand,
            GroupField::Customer,
            GroupField::Category,
            GroupField::Brand,
            GroupField::Product,
            GroupField::Region,
            GroupField::Channel,
            GroupField::Store,
        ]
    }

    /// Qualified SQL column the field reads from
    fn column(&self) -> &'static str {
        match self {
            GroupField::Year => "d.year",
            GroupField::Quarter => "d.quarter",
            GroupField::Month => "d.month",
            GroupField::DayOfWeek => "d.day_of_week",
            GroupField::Weekend => "d.is_weekend",
            GroupField::Country => "c.country",
            GroupField::Gender => "c.gender",
            GroupField::AgeBand => "c.age_band",
            GroupField::Customer => "c.customer_id",
            GroupField::Category => "p.category",
            GroupField::Brand => "p.brand",
            GroupField::Product => "p.product_id",
            GroupField::Region => "s.region",
            GroupField::Channel => "s.channel",
            GroupField::Store => "s.store_id",
        }
    }

    /// The dimension the field lives on
    fn dimension(&self) -> DimTable {
        match self {
            GroupField::Year
            | GroupField::Quarter
            | GroupField::Month
            | GroupField::DayOfWeek
            | GroupField::Weekend => DimTable::Date,
            GroupField::Country | GroupField::Gender | GroupField::AgeBand | GroupField::Customer => {
                DimTable::Customer
            }
            GroupField::Category | GroupField::Brand | GroupField::Product => DimTable::Product,
            GroupField::Region | GroupField::Channel | GroupField::Store => DimTable::Store,
        }
    }
}

impl FromStr for GroupField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "year" => Ok(GroupField::Year),
            "quarter" | "qtr" => Ok(GroupField::Quarter),
            "month" => Ok(GroupField::Month),
            "day_of_week" | "dow" | "weekday" => Ok(GroupField::DayOfWeek),
            "weekend" | "is_weekend" => Ok(GroupField::Weekend),
            "country" => Ok(GroupField::Country),
            "gender" => Ok(GroupField::Gender),
            "age_band" | "age" => Ok(GroupField::AgeBand),
            "customer" | "customer_id" => Ok(GroupField::Customer),
            "category" => Ok(GroupField::Category),
            "brand" => Ok(GroupField::Brand),
            "product" | "product_id" => Ok(GroupField::Product),
            "region" => Ok(GroupField::Region),
            "channel" => Ok(GroupField::Channel),
            "store" | "store_id" => Ok(GroupField::Store),
            _ => Err(Error::InvalidRecord(format!("Unknown group field: {}", s))),
        }
    }
}

impl std::fmt::Display for GroupField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregable fact measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    /// SUM(total_amount)
    Revenue,
    /// SUM(quantity)
    Units,
    /// COUNT(*) of fact rows
    Orders,
    /// AVG(unit_price)
    AvgUnitPrice,
}

impl Measure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Measure::Revenue => "revenue",
            Measure::Units => "units",
            Measure::Orders => "orders",
            Measure::AvgUnitPrice => "avg_unit_price",
        }
    }

    pub fn all() -> &'static [Measure] {
        &[
            Measure::Revenue,
            Measure::Units,
            Measure::Orders,
            Measure::AvgUnitPrice,
        ]
    }

    fn sql_expr(&self) -> &'static str {
        match self {
            Measure::Revenue => "SUM(f.total_amount)",
            Measure::Units => "SUM(f.quantity)",
            Measure::Orders => "COUNT(*)",
            Measure::AvgUnitPrice => "AVG(f.unit_price)",
        }
    }
}

impl FromStr for Measure {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "revenue" | "total" | "amount" => Ok(Measure::Revenue),
            "units" | "quantity" | "qty" => Ok(Measure::Units),
            "orders" | "count" | "sales" => Ok(Measure::Orders),
            "avg_unit_price" | "avg_price" => Ok(Measure::AvgUnitPrice),
            _ => Err(Error::InvalidRecord(format!("Unknown measure: {}", s))),
        }
    }
}

impl std::fmt::Display for Measure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Equality filter on a dimension attribute
#[derive(Debug, Clone)]
struct Filter {
    field: GroupField,
    value: String,
}

impl Filter {
    /// Bind with the storage class the column actually holds, so integer
    /// columns are not compared against text.
    fn bind_value(&self) -> Value {
        match self.value.to_lowercase().as_str() {
            "true" => return Value::Integer(1),
            "false" => return Value::Integer(0),
            _ => {}
        }
        if let Ok(n) = self.value.parse::<i64>() {
            Value::Integer(n)
        } else {
            Value::Text(self.value.clone())
        }
    }
}

/// A group-by aggregation over the star, built up fluently:
///
/// ```no_run
/// # use starmart::{AggregateQuery, GroupField, Measure};
/// let query = AggregateQuery::new()
///     .group_by(GroupField::Year)
///     .group_by(GroupField::Month)
///     .measure(Measure::Revenue);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AggregateQuery {
    group_by: Vec<GroupField>,
    measures: Vec<Measure>,
    filters: Vec<Filter>,
}

impl AggregateQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a grouping attribute (order determines result column order)
    pub fn group_by(mut self, field: GroupField) -> Self {
        if !self.group_by.contains(&field) {
            self.group_by.push(field);
        }
        self
    }

    /// Add a measure column
    pub fn measure(mut self, measure: Measure) -> Self {
        if !self.measures.contains(&measure) {
            self.measures.push(measure);
        }
        self
    }

    /// Restrict to facts whose attribute equals the given value
    pub fn filter(mut self, field: GroupField, value: impl Into<String>) -> Self {
        self.filters.push(Filter {
            field,
            value: value.into(),
        });
        self
    }

    /// Render the query to SQL plus bound parameter values.
    ///
    /// Joins only the dimensions that grouping or filtering touches; an
    /// empty group-by yields a single grand-total row.
    pub fn to_sql(&self) -> Result<(String, Vec<Value>)> {
        if self.measures.is_empty() {
            return Err(Error::InvalidRecord(
                "aggregate query needs at least one measure".to_string(),
            ));
        }

        let mut select = Vec::new();
        for field in &self.group_by {
            select.push(format!("{} AS {}", field.column(), field.as_str()));
        }
        for measure in &self.measures {
            select.push(format!("{} AS {}", measure.sql_expr(), measure.as_str()));
        }

        let mut sql = format!("SELECT {} FROM fact_sales f", select.join(", "));

        let used: Vec<DimTable> = DimTable::all_in_join_order()
            .iter()
            .copied()
            .filter(|dim| {
                self.group_by.iter().any(|g| g.dimension() == *dim)
                    || self.filters.iter().any(|f| f.field.dimension() == *dim)
            })
            .collect();
        for dim in used {
            sql.push(' ');
            sql.push_str(dim.join_sql());
        }

        let mut values = Vec::new();
        if !self.filters.is_empty() {
            let clauses: Vec<String> = self
                .filters
                .iter()
                .enumerate()
                .map(|(i, filter)| format!("{} = ?{}", filter.field.column(), i + 1))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
            values.extend(self.filters.iter().map(Filter::bind_value));
        }

        if !self.group_by.is_empty() {
            let names: Vec<&str> = self.group_by.iter().map(GroupField::as_str).collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&names.join(", "));
            sql.push_str(" ORDER BY ");
            sql.push_str(&names.join(", "));
        }

        Ok((sql, values))
    }
}

/// One result row: group values in query order, then measure values
#[derive(Debug, Clone, Serialize)]
pub struct AggregateRow {
    pub groups: Vec<String>,
    pub measures: Vec<f64>,
}

/// A completed aggregation: column headers plus rows
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub columns: Vec<String>,
    pub rows: Vec<AggregateRow>,
}

impl AggregateReport {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of a measure in the only row; handy for grand totals
    pub fn single(&self, measure_index: usize) -> Option<f64> {
        if self.rows.len() == 1 {
            self.rows[0].measures.get(measure_index).copied()
        } else {
            None
        }
    }
}

/// Query engine over a borrowed store
pub struct QueryEngine<'a> {
    store: &'a MartStore,
}

impl<'a> QueryEngine<'a> {
    /// Create a new query engine
    pub fn new(store: &'a MartStore) -> Self {
        Self { store }
    }

    /// Run an aggregation and collect the full result set
    pub fn run(&self, query: &AggregateQuery) -> Result<AggregateReport> {
        let (sql, values) = query.to_sql()?;
        tracing::debug!(%sql, "running aggregate query");

        let group_count = query.group_by.len();
        let measure_count = query.measures.len();

        let mut columns: Vec<String> = query
            .group_by
            .iter()
            .map(|g| g.as_str().to_string())
            .collect();
        columns.extend(query.measures.iter().map(|m| m.as_str().to_string()));

        let conn = self.store.connection();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(values))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut groups = Vec::with_capacity(group_count);
            for i in 0..group_count {
                groups.push(display_value(row.get::<_, Value>(i)?));
            }
            let mut measures = Vec::with_capacity(measure_count);
            for i in 0..measure_count {
                // SUM/AVG over zero rows is NULL
                let v: Option<f64> = row.get(group_count + i)?;
                measures.push(v.unwrap_or(0.0));
            }
            out.push(AggregateRow { groups, measures });
        }

        Ok(AggregateReport {
            columns,
            rows: out,
        })
    }
}

fn display_value(value: Value) -> String {
    match value {
        Value::Null => "(none)".to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Text(s) => s,
        Value::Blob(_) => "(blob)".to_string(),
    }
}
