//! Error types for wm-migrate

use thiserror::Error;
use wm_core::{CoreError, VersionStamp};
use wm_db::{DbError, DialectProbeError};
use wm_schema::SchemaError;
use wm_sql::SqlError;

/// Migration engine errors
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Catalog or plan is invalid (M001)
    #[error("[M001] Planning failed: {0}")]
    Planning(String),

    /// Two catalog entries target the same version without an allowance (M002)
    #[error("[M002] Migrations '{first}' and '{second}' both target version {version}; register the version with allow_shared_version if this is intended")]
    DuplicateVersion {
        version: VersionStamp,
        first: String,
        second: String,
    },

    /// Raw SQL in a fragment does not parse (M003)
    #[error("[M003] Migration '{name}' carries invalid SQL: {source}")]
    InvalidFragmentSql {
        name: String,
        #[source]
        source: SqlError,
    },

    /// Product detection failed (M004)
    #[error("[M004] {0}")]
    DialectProbe(#[from] DialectProbeError),

    /// The schema tool failed; no data transform has run (M005)
    #[error("[M005] Schema update failed: {0}")]
    SchemaApply(#[from] SchemaError),

    /// A migration's data transform failed (M006)
    #[error("[M006] Migration '{name}' failed: {source}")]
    DataTransform {
        name: String,
        #[source]
        source: Box<MigrateError>,
    },

    /// Migrations are disabled but the store is behind the catalog (M007)
    #[error("[M007] Store is at version {current} but the catalog requires {latest}; migrations are disabled (migration.enabled: false)")]
    StoreOutdated {
        current: VersionStamp,
        latest: VersionStamp,
    },

    /// Store access failed (M008)
    #[error("[M008] {0}")]
    Db(#[from] DbError),

    /// Core error (M009)
    #[error("[M009] {0}")]
    Core(#[from] CoreError),

    /// Progress log could not be read or written (M010)
    #[error("[M010] Progress log '{path}': {source}")]
    Progress {
        path: String,
        source: std::io::Error,
    },

    /// A data transform found the store in a state it cannot handle (M011)
    #[error("[M011] {0}")]
    Transform(String),
}

/// Result type alias for MigrateError
pub type MigrateResult<T> = Result<T, MigrateError>;
