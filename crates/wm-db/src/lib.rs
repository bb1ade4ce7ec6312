//! wm-db - Database abstraction layer for Wikimig
//!
//! This crate provides the `Database` trait used by the migration engine,
//! a DuckDB implementation, and detection of the connected product's
//! dialect and capabilities.

pub mod dialect;
pub mod duckdb;
pub mod error;
pub mod probe;
pub mod traits;
pub mod value;

pub use dialect::{
    Capabilities, DialectProfile, Product, ProductInfo, ProductVersion, QuoteStyle,
};
pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult, DialectProbeError};
pub use probe::probe;
pub use traits::{run_isolated, transaction, ColumnInfo, ConstraintKind, Database};
pub use value::{Row, Value};
