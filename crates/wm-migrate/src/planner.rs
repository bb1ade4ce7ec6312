//! Pending-set computation and changelog rendering.

use crate::catalog::Catalog;
use crate::error::{MigrateError, MigrateResult};
use crate::migration::{Migration, MigrationContext};
use wm_core::VersionStamp;
use wm_schema::{Change, Changelog, SchemaFragment};
use wm_sql::{SqlDialect, StatementCheck};

/// Migrations to run, in execution order.
pub struct Plan<'c> {
    startup: VersionStamp,
    entries: Vec<&'c dyn Migration>,
}

impl<'c> Plan<'c> {
    pub fn startup(&self) -> VersionStamp {
        self.startup
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'c dyn Migration> + '_ {
        self.entries.iter().copied()
    }

    pub fn versions(&self) -> Vec<VersionStamp> {
        self.entries.iter().map(|m| m.version()).collect()
    }

    pub fn names(&self) -> Vec<&'c str> {
        self.entries.iter().copied().map(|m| m.name()).collect()
    }
}

/// Catalog entries above `startup` that are not ignored and agree to run.
pub fn plan<'c>(
    catalog: &'c Catalog,
    startup: VersionStamp,
    ctx: &MigrationContext<'_>,
) -> Plan<'c> {
    let mut entries = Vec::new();
    for migration in catalog.iter() {
        if migration.version() <= startup {
            continue;
        }
        if ctx.config().is_ignored(migration.name()) {
            log::info!("[{}] Ignored by configuration", migration.name());
            continue;
        }
        if !migration.should_execute(ctx, startup) {
            log::debug!("[{}] Not applicable to this store", migration.name());
            continue;
        }
        entries.push(migration);
    }
    Plan { startup, entries }
}

#[derive(Clone, Copy)]
enum Pass {
    Pre,
    Schema,
}

/// Changelog of every planned migration's pre-schema fragment
pub fn render_pre_schema(plan: &Plan<'_>, ctx: &MigrationContext<'_>) -> MigrateResult<Changelog> {
    render(plan, ctx, Pass::Pre)
}

/// Changelog of every planned migration's schema fragment
pub fn render_schema(plan: &Plan<'_>, ctx: &MigrationContext<'_>) -> MigrateResult<Changelog> {
    render(plan, ctx, Pass::Schema)
}

fn render(plan: &Plan<'_>, ctx: &MigrationContext<'_>, pass: Pass) -> MigrateResult<Changelog> {
    let dialect: Box<dyn SqlDialect> = match ctx.dialect() {
        Some(profile) => wm_sql::for_product(profile.product),
        None => Box::new(wm_sql::GenericDialect::new()),
    };
    let author = &ctx.config().migration.author;

    let mut changelog = Changelog::new();
    for migration in plan.iter() {
        let fragment = match pass {
            Pass::Pre => migration.pre_schema_fragment(ctx),
            Pass::Schema => migration.schema_fragment(ctx),
        };
        let Some(fragment) = fragment else {
            continue;
        };
        validate_fragment(migration.name(), &fragment, ctx, dialect.as_ref())?;

        for (i, unit) in fragment.units.into_iter().enumerate() {
            let id = match pass {
                Pass::Pre => format!("{}-pre-{:03}", migration.name(), i),
                Pass::Schema => format!("{}-{:03}", migration.name(), i),
            };
            changelog.push(unit.into_change_set(id, author, migration.name()));
        }
    }
    Ok(changelog)
}

/// Parse the raw SQL a fragment will run on this store.
fn validate_fragment(
    name: &str,
    fragment: &SchemaFragment,
    ctx: &MigrationContext<'_>,
    dialect: &dyn SqlDialect,
) -> MigrateResult<()> {
    let product = ctx.dialect().map(|p| p.product);
    for unit in &fragment.units {
        for change in &unit.changes {
            let Change::Sql { sql, dbms } = change else {
                continue;
            };
            if let Some(product) = product {
                if !dbms.is_empty() && !dbms.contains(&product) {
                    continue;
                }
            }
            let validation = wm_sql::validate_sql(dialect, sql).map_err(|source| {
                MigrateError::InvalidFragmentSql {
                    name: name.to_string(),
                    source,
                }
            })?;
            for (stmt, check) in &validation.statements {
                if let StatementCheck::Unverified { reason } = check {
                    log::debug!("[{name}] Unverified vendor statement '{stmt}': {reason}");
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "planner_test.rs"]
mod tests;
