//! # Starmart - Embedded Star-Schema Sales Mart
//!
//! A dimensional data mart on SQLite: four dimension tables (date, customer,
//! product, store) keyed by surrogate keys, one append-only sales fact table
//! referencing all four, and an aggregate query surface over the star.
//!
//! Starmart provides:
//! - Idempotent schema creation with foreign-key, uniqueness, and check
//!   constraints plus indexes on every fact foreign-key column
//! - Dimension inserts with engine-agnostic surrogate-key allocation
//! - Fact inserts validated against measures and referential integrity
//! - Join-then-group-by aggregation over any subset of dimension attributes
//! - A JSONL loader that resolves natural keys to surrogate keys

pub mod dimension;
pub mod fact;
pub mod storage;
pub mod query;
pub mod loader;
pub mod output;
pub mod config;

// Re-exports for convenient access
pub use dimension::{Channel, Customer, DateRow, Product, Store};
pub use fact::{SalesRecord, TotalsPolicy};
pub use storage::MartStore;
pub use query::{AggregateQuery, GroupField, Measure, QueryEngine};

/// Result type alias for Starmart operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Starmart operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Duplicate natural key (or surrogate key) on a dimension insert
    #[error("uniqueness violation: {0}")]
    UniquenessViolation(String),

    /// A fact row referenced a dimension surrogate key that does not exist
    #[error("referential integrity violation: {0}")]
    ReferentialIntegrityViolation(String),

    /// A numeric or categorical check failed (negative measure,
    /// out-of-range calendar field, inconsistent total)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Schema creation found an incompatible existing object
    #[error("schema error: {0}")]
    Schema(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
