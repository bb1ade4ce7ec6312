//! wm-core - Core library for Wikimig
//!
//! This crate provides the shared vocabulary of the migration engine: version
//! stamps, strongly-typed names, configuration parsing, and checksums.

pub mod checksum;
pub mod config;
pub mod error;
pub mod names;
mod newtype_string;
pub mod version;

pub use checksum::{compute_checksum, stable_hash};
pub use config::{AnnotationConfig, Config, MigrationConfig, StoreConfig, WikiConfig};
pub use error::{CoreError, CoreResult};
pub use names::{MigrationName, WikiId};
pub use version::VersionStamp;
