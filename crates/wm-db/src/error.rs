//! Error types for wm-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Table not found (D003)
    #[error("[D003] Table or view not found: {0}")]
    TableNotFound(String),

    /// Transaction management error (D004)
    #[error("[D004] Transaction failed: {0}")]
    TransactionError(String),

    /// Row value had an unexpected type (D005)
    #[error("[D005] Column {index} is not {expected}: found {found}")]
    TypeMismatch {
        index: usize,
        expected: &'static str,
        found: String,
    },

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Internal error (D007)
    #[error("[D007] Internal database error: {0}")]
    Internal(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error does not expose structured variants, so the message
        // is the only reliable classifier.
        let msg = err.to_string();
        if msg.contains("Table with name")
            || msg.contains("Table or view with name")
            || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
        {
            DbError::TableNotFound(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}

/// Failure to determine the connected store's product.
///
/// Never fatal on its own: migrations gating on the dialect fail open.
#[derive(Error, Debug)]
pub enum DialectProbeError {
    /// Product metadata could not be read (D010)
    #[error("[D010] Could not read store product metadata: {0}")]
    Metadata(#[source] DbError),

    /// The store reported no product name (D011)
    #[error("[D011] Store reported an empty product name")]
    EmptyProductName,
}
