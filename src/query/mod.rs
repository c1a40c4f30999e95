//! Query layer - join-then-group-by aggregation over the star

pub mod engine;

pub use engine::{AggregateQuery, AggregateReport, AggregateRow, GroupField, Measure, QueryEngine};
