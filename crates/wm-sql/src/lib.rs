//! wm-sql - SQL layer for Wikimig
//!
//! This crate maps store products onto sqlparser dialects and validates the
//! raw SQL carried by schema fragments before anything is applied.

pub mod dialect;
pub mod error;
pub mod validator;

pub use dialect::{
    for_product, DuckDbDialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect,
    SqlDialect,
};
pub use error::{SqlError, SqlResult};
pub use validator::{split_statements, validate_sql, SqlValidation, StatementCheck};
