//! Changelog application with change-set tracking.

use crate::changelog::{
    Change, ChangeSet, Changelog, ColumnSpec, DataType, FailAction, Precondition,
};
use crate::error::{FragmentFailure, SchemaError, SchemaResult};
use crate::generator::DdlGenerator;
use chrono::Utc;
use std::collections::HashSet;
use wm_db::{transaction, ConstraintKind, Database, DialectProfile, Value};

/// Something that can bring a store in line with a changelog.
pub trait SchemaTool {
    fn apply(&self, db: &dyn Database, changelog: &Changelog) -> SchemaResult<ApplyReport>;
}

/// How a change set was recorded in the tracking table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecType {
    Executed,
    MarkRan,
}

impl ExecType {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecType::Executed => "EXECUTED",
            ExecType::MarkRan => "MARK_RAN",
        }
    }
}

/// Change set ids grouped by what happened to them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub executed: Vec<String>,
    pub marked_ran: Vec<String>,
    /// Already recorded by an earlier run
    pub already_applied: Vec<String>,
    /// Precondition failed with CONTINUE; evaluated again next time
    pub deferred: Vec<String>,
}

impl ApplyReport {
    pub fn total(&self) -> usize {
        self.executed.len()
            + self.marked_ran.len()
            + self.already_applied.len()
            + self.deferred.len()
    }
}

enum Decision {
    Run,
    Record(ExecType),
    Defer,
}

/// Applies changelogs and tracks applied change sets in a table.
///
/// A failing change set stops the rest of its fragment; other fragments are
/// still attempted and all failures are reported together.
pub struct ChangelogApplier {
    profile: DialectProfile,
    tracking_table: String,
    deployment_id: String,
}

impl ChangelogApplier {
    pub fn new(profile: DialectProfile, tracking_table: &str) -> Self {
        Self {
            profile,
            tracking_table: tracking_table.to_string(),
            deployment_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn deployment_id(&self) -> &str {
        &self.deployment_id
    }

    fn generator(&self) -> DdlGenerator<'_> {
        DdlGenerator::new(&self.profile)
    }

    /// Create the tracking table if it does not exist yet.
    pub fn ensure_tracking_table(&self, db: &dyn Database) -> SchemaResult<()> {
        if db.relation_exists(&self.tracking_table)? {
            return Ok(());
        }
        log::debug!("Creating changelog tracking table {}", self.tracking_table);
        let create = Change::CreateTable {
            table_name: self.tracking_table.clone(),
            columns: vec![
                ColumnSpec::new("id", DataType::Varchar(255)).primary_key(),
                ColumnSpec::new("author", DataType::Varchar(255)).primary_key(),
                ColumnSpec::new("checksum", DataType::Varchar(64)).not_null(),
                ColumnSpec::new("exec_type", DataType::Varchar(16)).not_null(),
                ColumnSpec::new("order_executed", DataType::Integer).not_null(),
                ColumnSpec::new("date_executed", DataType::Timestamp).not_null(),
                ColumnSpec::new("deployment_id", DataType::Varchar(36)).not_null(),
                ColumnSpec::new("comments", DataType::Varchar(255)),
            ],
        };
        for sql in self.generator().render(&create)? {
            db.execute(&sql)?;
        }
        Ok(())
    }

    /// Recorded checksum of a change set, if it has been applied
    pub fn recorded_checksum(
        &self,
        db: &dyn Database,
        id: &str,
        author: &str,
    ) -> SchemaResult<Option<String>> {
        let rows = db.query_rows(
            &format!(
                "SELECT checksum FROM {} WHERE id = ? AND author = ?",
                self.tracking_table
            ),
            &[id.into(), author.into()],
        )?;
        match rows.first() {
            Some(row) => Ok(Some(row.get_str(0)?.to_string())),
            None => Ok(None),
        }
    }

    fn record(
        &self,
        db: &dyn Database,
        change_set: &ChangeSet,
        checksum: &str,
        exec_type: ExecType,
    ) -> SchemaResult<()> {
        let next_order = db
            .query_i64(
                &format!(
                    "SELECT COALESCE(MAX(order_executed), 0) + 1 FROM {}",
                    self.tracking_table
                ),
                &[],
            )?
            .unwrap_or(1);
        let comments: Option<String> = change_set
            .comment
            .as_deref()
            .map(|c| c.chars().take(255).collect());
        db.execute_params(
            &format!(
                "INSERT INTO {} (id, author, checksum, exec_type, order_executed, date_executed, deployment_id, comments) \
                 VALUES (?, ?, ?, ?, ?, CAST(? AS TIMESTAMP), ?, ?)",
                self.tracking_table
            ),
            &[
                change_set.id.as_str().into(),
                change_set.author.as_str().into(),
                checksum.into(),
                exec_type.as_str().into(),
                Value::Int(next_order),
                Utc::now().format("%Y-%m-%d %H:%M:%S").to_string().into(),
                self.deployment_id.as_str().into(),
                comments.into(),
            ],
        )?;
        Ok(())
    }

    /// Evaluate one precondition against the live store
    pub fn evaluate(&self, db: &dyn Database, condition: &Precondition) -> SchemaResult<bool> {
        let holds = match condition {
            Precondition::Dbms { products } => products.contains(&self.profile.product),
            Precondition::TableExists { table_name } => db.relation_exists(table_name)?,
            Precondition::ColumnExists {
                table_name,
                column_name,
            } => db.column_info(table_name, column_name)?.is_some(),
            Precondition::ColumnType {
                table_name,
                column_name,
                data_type,
            } => db
                .column_info(table_name, column_name)?
                .is_some_and(|info| self.generator().column_matches(&info, *data_type)),
            Precondition::IndexExists {
                table_name,
                index_name,
            } => db.index_exists(table_name, index_name)?,
            Precondition::ForeignKeyExists {
                table_name,
                foreign_key_name,
            } => db.constraint_exists(
                table_name,
                ConstraintKind::ForeignKey,
                foreign_key_name.as_deref(),
            )?,
            Precondition::PrimaryKeyExists {
                table_name,
                primary_key_name,
            } => db.constraint_exists(
                table_name,
                ConstraintKind::PrimaryKey,
                primary_key_name.as_deref(),
            )?,
            Precondition::SqlCheck {
                sql,
                expected_result,
            } => db.query_i64(sql, &[])? == Some(*expected_result),
            Precondition::Not(inner) => {
                for c in inner {
                    if self.evaluate(db, c)? {
                        return Ok(false);
                    }
                }
                true
            }
            Precondition::And(inner) => {
                for c in inner {
                    if !self.evaluate(db, c)? {
                        return Ok(false);
                    }
                }
                true
            }
            Precondition::Or(inner) => {
                for c in inner {
                    if self.evaluate(db, c)? {
                        return Ok(true);
                    }
                }
                false
            }
        };
        Ok(holds)
    }

    fn decide(&self, db: &dyn Database, change_set: &ChangeSet) -> SchemaResult<Decision> {
        let Some(pre) = &change_set.preconditions else {
            return Ok(Decision::Run);
        };

        let mut holds = Ok(true);
        for condition in &pre.conditions {
            match self.evaluate(db, condition) {
                Ok(true) => {}
                Ok(false) => {
                    holds = Ok(false);
                    break;
                }
                Err(e) => {
                    holds = Err(e);
                    break;
                }
            }
        }

        let (action, message) = match holds {
            Ok(true) => return Ok(Decision::Run),
            Ok(false) => (pre.on_fail, "preconditions failed".to_string()),
            Err(e) => (pre.on_error, format!("precondition error: {e}")),
        };

        match action {
            FailAction::Halt => Err(SchemaError::PreconditionHalt {
                change_set: change_set.id.clone(),
                message,
            }),
            FailAction::Continue => {
                log::info!("Skipping change set {}: {}", change_set.id, message);
                Ok(Decision::Defer)
            }
            FailAction::MarkRan => {
                log::info!("Marking change set {} as ran: {}", change_set.id, message);
                Ok(Decision::Record(ExecType::MarkRan))
            }
            FailAction::Warn => {
                log::warn!("Change set {}: {}, applying anyway", change_set.id, message);
                Ok(Decision::Run)
            }
        }
    }

    fn run_change_set(
        &self,
        db: &dyn Database,
        change_set: &ChangeSet,
        checksum: &str,
    ) -> SchemaResult<()> {
        let mut statements = Vec::new();
        for change in &change_set.changes {
            statements.extend(self.generator().render(change)?);
        }

        let body = |conn: &dyn Database| -> SchemaResult<()> {
            for sql in &statements {
                log::debug!("[{}] {}", change_set.id, sql);
                conn.execute_batch(sql)?;
            }
            self.record(conn, change_set, checksum, ExecType::Executed)
        };

        if self.profile.capabilities.transactional_ddl {
            transaction(db, body)
        } else {
            body(db)
        }
    }

    fn apply_one(
        &self,
        db: &dyn Database,
        change_set: &ChangeSet,
        report: &mut ApplyReport,
    ) -> SchemaResult<()> {
        let checksum = change_set.checksum()?;
        if let Some(recorded) = self.recorded_checksum(db, &change_set.id, &change_set.author)? {
            if recorded != checksum {
                log::warn!(
                    "Change set {} was modified after it was applied (checksum {} != {}), not re-applying",
                    change_set.id,
                    recorded,
                    checksum
                );
            }
            report.already_applied.push(change_set.id.clone());
            return Ok(());
        }

        match self.decide(db, change_set)? {
            Decision::Run => {
                self.run_change_set(db, change_set, &checksum)?;
                report.executed.push(change_set.id.clone());
            }
            Decision::Record(exec_type) => {
                self.record(db, change_set, &checksum, exec_type)?;
                report.marked_ran.push(change_set.id.clone());
            }
            Decision::Defer => report.deferred.push(change_set.id.clone()),
        }
        Ok(())
    }
}

impl SchemaTool for ChangelogApplier {
    fn apply(&self, db: &dyn Database, changelog: &Changelog) -> SchemaResult<ApplyReport> {
        let mut report = ApplyReport::default();
        if changelog.is_empty() {
            return Ok(report);
        }
        self.ensure_tracking_table(db)?;

        let mut failed_fragments: HashSet<&str> = HashSet::new();
        let mut failures = Vec::new();

        for change_set in &changelog.change_sets {
            let fragment = change_set.fragment();
            if failed_fragments.contains(fragment) {
                log::warn!(
                    "Skipping change set {} after an earlier failure in {}",
                    change_set.id,
                    fragment
                );
                continue;
            }

            if let Err(e) = self.apply_one(db, change_set, &mut report) {
                log::error!("Change set {} failed: {}", change_set.id, e);
                failed_fragments.insert(fragment);
                failures.push(FragmentFailure {
                    fragment: fragment.to_string(),
                    change_set: change_set.id.clone(),
                    message: e.to_string(),
                });
            }
        }

        if failures.is_empty() {
            log::info!(
                "Changelog applied: {} executed, {} marked ran, {} already applied, {} deferred",
                report.executed.len(),
                report.marked_ran.len(),
                report.already_applied.len(),
                report.deferred.len()
            );
            Ok(report)
        } else {
            Err(SchemaError::ApplyFailed { failures })
        }
    }
}

#[cfg(test)]
#[path = "applier_test.rs"]
mod tests;
