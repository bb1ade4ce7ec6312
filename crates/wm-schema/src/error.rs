//! Error types for wm-schema

use thiserror::Error;
use wm_db::DbError;

/// Schema tool errors
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Store access failed (SC001)
    #[error("[SC001] {0}")]
    Db(#[from] DbError),

    /// The change cannot be expressed for the connected product (SC002)
    #[error("[SC002] {change} is not supported on {product}")]
    Unsupported { change: String, product: String },

    /// A precondition with onFail/onError HALT did not hold (SC003)
    #[error("[SC003] Precondition halted change set '{change_set}': {message}")]
    PreconditionHalt { change_set: String, message: String },

    /// One or more fragments failed to apply (SC004)
    #[error("[SC004] {} schema fragment(s) failed: {}", failures.len(), summarize(failures))]
    ApplyFailed { failures: Vec<FragmentFailure> },

    /// Data type string not understood (SC005)
    #[error("[SC005] Invalid data type '{0}'")]
    InvalidDataType(String),

    /// Changelog YAML (de)serialization failed (SC006)
    #[error("[SC006] Changelog YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Checksum input could not be serialized (SC007)
    #[error("[SC007] Change set serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// A fragment whose change set failed; later change sets of the same
/// fragment were skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentFailure {
    pub fragment: String,
    pub change_set: String,
    pub message: String,
}

fn summarize(failures: &[FragmentFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({}): {}", f.fragment, f.change_set, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for SchemaError
pub type SchemaResult<T> = Result<T, SchemaError>;
