//! Storage Layer - SQLite-backed star schema
//!
//! System of record is SQLite with tables:
//! - dim_date(date_key, calendar_date, year, quarter, month, day_of_month, day_of_week, is_weekend)
//! - dim_customer(customer_key, customer_id, name, gender, age_band, country, signup_date)
//! - dim_product(product_key, product_id, name, category, brand, list_price, active)
//! - dim_store(store_key, store_id, name, region, channel)
//! - fact_sales(sale_key, date_key, customer_key, product_key, store_key, quantity, unit_price, total_amount)
//! - surrogate_sequences(table_name, next_key)

pub mod schema;
pub mod sqlite;

pub use sqlite::{MartStats, MartStore};
