//! wm-migrate - Migration engine for Wikimig
//!
//! This crate provides the migration descriptor trait, the validated catalog,
//! the planner that selects and renders pending migrations, the version
//! store, resumable batch helpers, and the startup runner tying them together.

pub mod batch;
pub mod catalog;
pub mod error;
pub mod migration;
pub mod planner;
pub mod runner;
pub mod version_store;

pub use batch::{run_batches, ProgressLog};
pub use catalog::{Catalog, CatalogBuilder};
pub use error::{MigrateError, MigrateResult};
pub use migration::{Migration, MigrationContext, TransactionMode};
pub use planner::{plan, render_pre_schema, render_schema, Plan};
pub use runner::{
    MigrationRunner, PendingMigration, RunReport, RunnerState, StartupPath, StatusReport,
};
pub use version_store::{VersionStore, VERSION_COLUMN};
