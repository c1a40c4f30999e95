//! Database schema definitions
//!
//! Star topology: `fact_sales` references each `dim_*` table by surrogate
//! key; no dimension references another dimension. All statements use
//! `IF NOT EXISTS` so creation is safe to re-run.

/// SQL to create the date dimension.
/// `date_key` is the YYYYMMDD encoding of `calendar_date`.
pub const CREATE_DIM_DATE: &str = r#"
CREATE TABLE IF NOT EXISTS dim_date (
    date_key INTEGER PRIMARY KEY,
    calendar_date TEXT NOT NULL UNIQUE,
    year INTEGER NOT NULL,
    quarter INTEGER NOT NULL CHECK (quarter BETWEEN 1 AND 4),
    month INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
    day_of_month INTEGER NOT NULL CHECK (day_of_month BETWEEN 1 AND 31),
    day_of_week INTEGER NOT NULL CHECK (day_of_week BETWEEN 0 AND 6),
    is_weekend INTEGER NOT NULL CHECK (is_weekend IN (0, 1))
)
"#;

/// SQL to create the customer dimension
pub const CREATE_DIM_CUSTOMER: &str = r#"
CREATE TABLE IF NOT EXISTS dim_customer (
    customer_key INTEGER PRIMARY KEY,
    customer_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    gender TEXT,
    age_band TEXT,
    country TEXT,
    signup_date TEXT
)
"#;

/// SQL to create the product dimension
pub const CREATE_DIM_PRODUCT: &str = r#"
CREATE TABLE IF NOT EXISTS dim_product (
    product_key INTEGER PRIMARY KEY,
    product_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    category TEXT,
    brand TEXT,
    list_price REAL CHECK (list_price IS NULL OR list_price >= 0),
    active INTEGER NOT NULL DEFAULT 1 CHECK (active IN (0, 1))
)
"#;

/// SQL to create the store dimension
pub const CREATE_DIM_STORE: &str = r#"
CREATE TABLE IF NOT EXISTS dim_store (
    store_key INTEGER PRIMARY KEY,
    store_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    region TEXT,
    channel TEXT
)
"#;

/// SQL to create the sales fact table.
/// Append-only event records; every dimension key is required.
pub const CREATE_FACT_SALES: &str = r#"
CREATE TABLE IF NOT EXISTS fact_sales (
    sale_key INTEGER PRIMARY KEY,
    date_key INTEGER NOT NULL REFERENCES dim_date(date_key),
    customer_key INTEGER NOT NULL REFERENCES dim_customer(customer_key),
    product_key INTEGER NOT NULL REFERENCES dim_product(product_key),
    store_key INTEGER NOT NULL REFERENCES dim_store(store_key),
    quantity INTEGER NOT NULL CHECK (quantity >= 0),
    unit_price REAL NOT NULL CHECK (unit_price >= 0),
    total_amount REAL NOT NULL CHECK (total_amount >= 0)
)
"#;

/// SQL to create the surrogate-key sequence table.
/// One row per dimension table; key allocation reads and bumps `next_key`
/// instead of relying on engine autoincrement.
pub const CREATE_SEQUENCES: &str = r#"
CREATE TABLE IF NOT EXISTS surrogate_sequences (
    table_name TEXT PRIMARY KEY,
    next_key INTEGER NOT NULL
)
"#;

/// SQL to create indexes (one per fact foreign-key column, join support)
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_fact_sales_date ON fact_sales(date_key)",
    "CREATE INDEX IF NOT EXISTS idx_fact_sales_customer ON fact_sales(customer_key)",
    "CREATE INDEX IF NOT EXISTS idx_fact_sales_product ON fact_sales(product_key)",
    "CREATE INDEX IF NOT EXISTS idx_fact_sales_store ON fact_sales(store_key)",
    "CREATE INDEX IF NOT EXISTS idx_dim_product_category ON dim_product(category)",
    "CREATE INDEX IF NOT EXISTS idx_dim_date_year_month ON dim_date(year, month)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_DIM_DATE,
        CREATE_DIM_CUSTOMER,
        CREATE_DIM_PRODUCT,
        CREATE_DIM_STORE,
        CREATE_FACT_SALES,
        CREATE_SEQUENCES,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}

/// Drop statements for a forced re-init, fact table first so the foreign
/// keys never dangle mid-drop.
pub const DROP_STATEMENTS: &[&str] = &[
    "DROP TABLE IF EXISTS fact_sales",
    "DROP TABLE IF EXISTS dim_date",
    "DROP TABLE IF EXISTS dim_customer",
    "DROP TABLE IF EXISTS dim_product",
    "DROP TABLE IF EXISTS dim_store",
    "DROP TABLE IF EXISTS surrogate_sequences",
];

/// Tables that make up the star, in load order (dimensions before facts)
pub const TABLES: &[&str] = &[
    "dim_date",
    "dim_customer",
    "dim_product",
    "dim_store",
    "fact_sales",
];
