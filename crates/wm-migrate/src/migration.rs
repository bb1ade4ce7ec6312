//! The migration descriptor trait and the context it runs in.

use crate::error::MigrateResult;
use std::path::{Path, PathBuf};
use wm_core::{Config, VersionStamp, WikiId};
use wm_db::{Capabilities, Database, DialectProbeError, DialectProfile, Product};
use wm_schema::SchemaFragment;

/// How the runner wraps a migration's data transform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransactionMode {
    /// `migrate` and the stamp write share one transaction
    #[default]
    Single,
    /// `migrate` commits its own batches; the stamp is written in a separate
    /// transaction right after it returns
    PerBatch,
}

/// A named, versioned unit of change.
///
/// Every hook has a default, so a migration only overrides what it needs.
/// `migrate` must be idempotent: a crash between its commit and the stamp
/// write re-runs it on the next startup.
pub trait Migration: Send + Sync {
    /// Unique name, e.g. `R40000XWIKI6990`
    fn name(&self) -> &str;

    /// Stamp the store is at once this migration has run
    fn version(&self) -> VersionStamp;

    fn description(&self) -> &str;

    /// Whether the migration applies to this store.
    ///
    /// `startup` is the stamp read before any migration ran in this session.
    /// Implementations may query the store.
    fn should_execute(&self, _ctx: &MigrationContext<'_>, _startup: VersionStamp) -> bool {
        true
    }

    /// Changes applied before the generic schema sync
    fn pre_schema_fragment(&self, _ctx: &MigrationContext<'_>) -> Option<SchemaFragment> {
        None
    }

    /// Changes applied after the generic schema sync
    fn schema_fragment(&self, _ctx: &MigrationContext<'_>) -> Option<SchemaFragment> {
        None
    }

    /// Procedural data fix-up
    fn migrate(&self, _ctx: &MigrationContext<'_>) -> MigrateResult<()> {
        Ok(())
    }

    fn transaction_mode(&self) -> TransactionMode {
        TransactionMode::Single
    }
}

/// Everything a migration may consult while deciding or running.
pub struct MigrationContext<'a> {
    db: &'a dyn Database,
    dialect: Result<DialectProfile, DialectProbeError>,
    wiki: WikiId,
    is_main_wiki: bool,
    config: &'a Config,
    progress_dir: PathBuf,
}

impl<'a> MigrationContext<'a> {
    pub fn new(
        db: &'a dyn Database,
        dialect: Result<DialectProfile, DialectProbeError>,
        wiki: WikiId,
        is_main_wiki: bool,
        config: &'a Config,
        progress_dir: PathBuf,
    ) -> Self {
        Self {
            db,
            dialect,
            wiki,
            is_main_wiki,
            config,
            progress_dir,
        }
    }

    pub fn db(&self) -> &'a dyn Database {
        self.db
    }

    /// Probed profile, `None` when the probe failed
    pub fn dialect(&self) -> Option<&DialectProfile> {
        self.dialect.as_ref().ok()
    }

    pub fn probe_error(&self) -> Option<&DialectProbeError> {
        self.dialect.as_ref().err()
    }

    pub fn wiki(&self) -> &WikiId {
        &self.wiki
    }

    pub fn is_main_wiki(&self) -> bool {
        self.is_main_wiki
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    /// Directory for this wiki's progress logs
    pub fn progress_dir(&self) -> &Path {
        &self.progress_dir
    }

    /// Whether the store is one of `products`.
    ///
    /// Fails open: without a profile the answer is `true` and a warning is
    /// logged on behalf of `migration`.
    pub fn product_is(&self, migration: &str, products: &[Product]) -> bool {
        match &self.dialect {
            Ok(profile) => profile.is_any(products),
            Err(e) => {
                log::warn!("[{migration}] Unknown store product ({e}), assuming it applies");
                true
            }
        }
    }

    /// Evaluate a capability, failing open like [`product_is`](Self::product_is).
    pub fn capability(&self, migration: &str, check: impl FnOnce(&Capabilities) -> bool) -> bool {
        match &self.dialect {
            Ok(profile) => check(&profile.capabilities),
            Err(e) => {
                log::warn!("[{migration}] Unknown store capabilities ({e}), assuming it applies");
                true
            }
        }
    }
}
