//! Error types for wm-core

use thiserror::Error;

/// Core error type for Wikimig
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Invalid configuration value
    #[error("[C002] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C003: Version stamp could not be parsed
    #[error("[C003] Invalid version stamp '{value}': {reason}")]
    InvalidVersion { value: String, reason: String },

    /// C004: IO error
    #[error("[C004] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// C005: IO error with file path context
    #[error("[C005] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C006: YAML parse error
    #[error("[C006] Config parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
