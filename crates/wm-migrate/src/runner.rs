//! Startup state machine: probe, plan, apply schema, run data transforms.

use crate::catalog::Catalog;
use crate::error::{MigrateError, MigrateResult};
use crate::migration::{Migration, MigrationContext, TransactionMode};
use crate::planner::{plan, render_pre_schema, render_schema};
use crate::version_store::VersionStore;
use serde::Serialize;
use std::path::{Path, PathBuf};
use wm_core::{Config, VersionStamp, WikiId};
use wm_db::{transaction, Database, DialectProfile, Product, ProductVersion};
use wm_schema::{
    ApplyReport, Changelog, ChangelogApplier, SchemaModel, SchemaSync, SchemaTool, SyncReport,
};

/// Runner states, in the order a startup walks through them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerState {
    NotStarted,
    ProbingVersion,
    EmptyStoreInit,
    LegacySchemaSync,
    NormalMigration,
    Idle,
}

/// Which branch a startup took
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupPath {
    /// Empty store: schema created, stamp set to the latest version
    EmptyStoreInit,
    /// Legacy store migrated from stamp 0
    Legacy,
    Normal,
    /// Nothing pending
    UpToDate,
}

/// Outcome of one startup against one wiki
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub wiki: WikiId,
    pub path: StartupPath,
    pub initial: Option<VersionStamp>,
    pub final_stamp: Option<VersionStamp>,
    /// Migrations whose data transform ran, in order
    pub executed: Vec<String>,
    #[serde(skip)]
    pub pre_schema: ApplyReport,
    #[serde(skip)]
    pub schema: ApplyReport,
    #[serde(skip)]
    pub sync: SyncReport,
}

/// A pending migration as shown by `status`
#[derive(Debug, Clone, Serialize)]
pub struct PendingMigration {
    pub name: String,
    pub version: VersionStamp,
    pub description: String,
}

/// Read-only view of a wiki's migration state
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub wiki: WikiId,
    pub product: Option<String>,
    pub current: Option<VersionStamp>,
    pub latest: Option<VersionStamp>,
    pub pending: Vec<PendingMigration>,
}

/// Drives a wiki's store from whatever version it is at to the catalog's
/// latest.
pub struct MigrationRunner<'a> {
    catalog: &'a Catalog,
    config: &'a Config,
    baseline: &'a SchemaModel,
    project_root: PathBuf,
    schema_tool: Option<Box<dyn SchemaTool + 'a>>,
    state: RunnerState,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(
        catalog: &'a Catalog,
        config: &'a Config,
        baseline: &'a SchemaModel,
        project_root: &Path,
    ) -> Self {
        Self {
            catalog,
            config,
            baseline,
            project_root: project_root.to_path_buf(),
            schema_tool: None,
            state: RunnerState::NotStarted,
        }
    }

    /// Replace the changelog applier used for fragments
    pub fn with_schema_tool(mut self, tool: Box<dyn SchemaTool + 'a>) -> Self {
        self.schema_tool = Some(tool);
        self
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    fn transition(&mut self, to: RunnerState) {
        log::debug!("Runner state {:?} -> {:?}", self.state, to);
        self.state = to;
    }

    fn context<'d>(&self, db: &'d dyn Database, wiki: &WikiId) -> MigrationContext<'d>
    where
        'a: 'd,
    {
        let dialect = wm_db::probe(db);
        if let Err(e) = &dialect {
            log::warn!(
                "Could not determine store product, product-specific migrations fail open: {e}"
            );
        }
        let is_main = self
            .config
            .main_wiki()
            .is_some_and(|main| main.id == *wiki);
        let progress_dir = self
            .config
            .progress_dir_absolute(&self.project_root)
            .join(wiki.as_str());
        MigrationContext::new(db, dialect, wiki.clone(), is_main, self.config, progress_dir)
    }

    fn profile_or_default(ctx: &MigrationContext<'_>) -> DialectProfile {
        ctx.dialect().cloned().unwrap_or_else(|| {
            DialectProfile::for_product(Product::Other, ProductVersion::default())
        })
    }

    fn version_store(&self, ctx: &MigrationContext<'_>) -> VersionStore {
        VersionStore::new(&self.config.store).with_profile(&Self::profile_or_default(ctx))
    }

    /// Run the startup sequence for `wiki` against `db`.
    pub fn run(&mut self, db: &dyn Database, wiki: &WikiId) -> MigrateResult<RunReport> {
        self.transition(RunnerState::ProbingVersion);
        let ctx = self.context(db, wiki);
        let store = self.version_store(&ctx);
        let initial = store.read(db)?;

        let mut report = RunReport {
            wiki: wiki.clone(),
            path: StartupPath::UpToDate,
            initial,
            final_stamp: initial,
            executed: Vec::new(),
            pre_schema: ApplyReport::default(),
            schema: ApplyReport::default(),
            sync: SyncReport::default(),
        };

        let Some(startup) = initial else {
            self.transition(RunnerState::EmptyStoreInit);
            self.init_empty_store(&ctx, &store, &mut report)?;
            self.transition(RunnerState::Idle);
            return Ok(report);
        };

        if startup.is_legacy() {
            self.transition(RunnerState::LegacySchemaSync);
            log::info!("[{wiki}] Legacy store without version record, migrating from version 0");
        }

        let pending = plan(self.catalog, startup, &ctx);
        if pending.is_empty() {
            log::info!("[{wiki}] Store is up to date at version {startup}");
            self.transition(RunnerState::Idle);
            return Ok(report);
        }

        if !self.config.migration.enabled {
            let latest = pending
                .versions()
                .last()
                .copied()
                .unwrap_or(startup);
            return Err(MigrateError::StoreOutdated {
                current: startup,
                latest,
            });
        }

        self.transition(RunnerState::NormalMigration);
        report.path = if startup.is_legacy() {
            StartupPath::Legacy
        } else {
            StartupPath::Normal
        };
        log::info!(
            "[{wiki}] Migrating from version {startup}: {}",
            pending.names().join(", ")
        );

        // Render both passes before touching the store
        let pre = render_pre_schema(&pending, &ctx)?;
        let post = render_schema(&pending, &ctx)?;

        let profile = Self::profile_or_default(&ctx);
        let default_tool;
        let tool: &dyn SchemaTool = match &self.schema_tool {
            Some(tool) => tool.as_ref(),
            None => {
                default_tool =
                    ChangelogApplier::new(profile.clone(), &self.config.store.changelog_table);
                &default_tool
            }
        };

        report.pre_schema = apply_changelog(tool, db, &pre)?;
        report.sync = SchemaSync::new(&profile).sync(db, self.baseline)?;
        report.schema = apply_changelog(tool, db, &post)?;

        // The stamp of a shared version is written once the whole group committed
        let entries: Vec<&dyn Migration> = pending.iter().collect();
        for (index, migration) in entries.iter().copied().enumerate() {
            let closes_version = entries
                .get(index + 1)
                .map_or(true, |next| next.version() != migration.version());
            run_one(migration, &ctx, &store, closes_version)?;
            report.executed.push(migration.name().to_string());
            if closes_version {
                report.final_stamp = Some(migration.version());
            }
        }

        log::info!(
            "[{wiki}] Migration finished at version {}",
            report
                .final_stamp
                .map_or_else(|| "none".to_string(), |s| s.to_string())
        );
        self.transition(RunnerState::Idle);
        Ok(report)
    }

    fn init_empty_store(
        &self,
        ctx: &MigrationContext<'_>,
        store: &VersionStore,
        report: &mut RunReport,
    ) -> MigrateResult<()> {
        let wiki = ctx.wiki();
        log::info!("[{wiki}] Empty store, creating schema");
        let profile = Self::profile_or_default(ctx);
        report.path = StartupPath::EmptyStoreInit;
        report.sync = SchemaSync::new(&profile).sync(ctx.db(), self.baseline)?;

        if let Some(latest) = self.catalog.latest() {
            transaction(ctx.db(), |tx| store.write(tx, latest))?;
            report.final_stamp = Some(latest);
            log::info!("[{wiki}] Store initialized at version {latest}");
        }
        Ok(())
    }

    /// Current stamp and pending plan, without changing anything.
    pub fn status(&self, db: &dyn Database, wiki: &WikiId) -> MigrateResult<StatusReport> {
        let ctx = self.context(db, wiki);
        let current = self.version_store(&ctx).read(db)?;
        let pending = match current {
            Some(startup) => plan(self.catalog, startup, &ctx)
                .iter()
                .map(|m| PendingMigration {
                    name: m.name().to_string(),
                    version: m.version(),
                    description: m.description().to_string(),
                })
                .collect(),
            None => Vec::new(),
        };
        Ok(StatusReport {
            wiki: wiki.clone(),
            product: ctx.dialect().map(|p| format!("{} {}", p.product, p.version)),
            current,
            latest: self.catalog.latest(),
            pending,
        })
    }

    /// Rendered pre-schema and schema changelogs for the pending plan.
    ///
    /// Empty when the store has no version yet; an empty store is built by
    /// the schema sync instead.
    pub fn changelogs(
        &self,
        db: &dyn Database,
        wiki: &WikiId,
    ) -> MigrateResult<(Changelog, Changelog)> {
        let ctx = self.context(db, wiki);
        let Some(startup) = self.version_store(&ctx).read(db)? else {
            return Ok((Changelog::new(), Changelog::new()));
        };
        let pending = plan(self.catalog, startup, &ctx);
        Ok((
            render_pre_schema(&pending, &ctx)?,
            render_schema(&pending, &ctx)?,
        ))
    }
}

fn apply_changelog(
    tool: &dyn SchemaTool,
    db: &dyn Database,
    changelog: &Changelog,
) -> MigrateResult<ApplyReport> {
    if changelog.is_empty() {
        return Ok(ApplyReport::default());
    }
    Ok(tool.apply(db, changelog)?)
}

/// Run one data transform; `write_stamp` is false for all but the last
/// entry of a shared version.
fn run_one(
    migration: &dyn Migration,
    ctx: &MigrationContext<'_>,
    store: &VersionStore,
    write_stamp: bool,
) -> MigrateResult<()> {
    let name = migration.name();
    let version = migration.version();
    log::info!("[{name}] {}", migration.description());

    let stamp = |tx: &dyn Database| -> MigrateResult<()> {
        if write_stamp {
            store.write(tx, version)?;
        }
        Ok(())
    };
    let result = match migration.transaction_mode() {
        TransactionMode::Single => transaction(ctx.db(), |tx| {
            migration.migrate(ctx)?;
            stamp(tx)
        }),
        TransactionMode::PerBatch => migration
            .migrate(ctx)
            .and_then(|()| transaction(ctx.db(), stamp)),
    };

    result.map_err(|source| {
        log::error!("[{name}] Failed: {source}");
        MigrateError::DataTransform {
            name: name.to_string(),
            source: Box::new(source),
        }
    })?;
    if write_stamp {
        log::info!("[{name}] Done, store at version {version}");
    } else {
        log::info!("[{name}] Done, version {version} is recorded after its last migration");
    }
    Ok(())
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
