//! Error types for wm-sql

use thiserror::Error;

/// SQL parsing and validation errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// SQL parse error (S001)
    #[error("[S001] SQL parse error at line {line}, column {column}: {message}")]
    ParseError {
        message: String,
        line: usize,
        column: usize,
    },

    /// Empty SQL (S002)
    #[error("[S002] SQL is empty")]
    EmptySql,

    /// SQL could not be tokenized (S003)
    #[error("[S003] SQL tokenizer error: {0}")]
    TokenizeError(String),

    /// Statement rejected by the validator (S004)
    #[error("[S004] SQL validation failed: {0}")]
    ValidationError(String),
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
