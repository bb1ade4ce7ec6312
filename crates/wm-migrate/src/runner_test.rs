use super::*;
use crate::test_support::config;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wm_db::DuckDbBackend;
use wm_schema::{ColumnSpec, DataType, SchemaFragment, SchemaResult, TableDef};

/// Records its name in `applied`, optionally failing after the insert
struct Recorder {
    name: &'static str,
    version: u64,
    fail: Arc<AtomicBool>,
}

impl Recorder {
    fn new(name: &'static str, version: u64) -> Self {
        Self {
            name,
            version,
            fail: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Migration for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn version(&self) -> VersionStamp {
        VersionStamp::new(self.version)
    }

    fn description(&self) -> &str {
        "records itself"
    }

    fn pre_schema_fragment(&self, _ctx: &MigrationContext<'_>) -> Option<SchemaFragment> {
        Some(SchemaFragment::sql(format!(
            "CREATE TABLE pre_{} (id BIGINT)",
            self.name.to_lowercase()
        )))
    }

    fn migrate(&self, ctx: &MigrationContext<'_>) -> MigrateResult<()> {
        ctx.db()
            .execute_params("INSERT INTO applied VALUES (?)", &[self.name.into()])?;
        if self.fail.load(Ordering::SeqCst) {
            return Err(MigrateError::Transform(format!("{} refused", self.name)));
        }
        Ok(())
    }
}

fn baseline() -> SchemaModel {
    SchemaModel::new(vec![
        TableDef::new(
            "xwikidoc",
            vec![
                ColumnSpec::new("xwd_id", DataType::BigInt).not_null(),
                ColumnSpec::new("xwd_fullname", DataType::Varchar(255)),
            ],
        ),
        TableDef::new("applied", vec![ColumnSpec::new("name", DataType::Varchar(255))]),
    ])
}

fn legacy_store() -> DuckDbBackend {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute("CREATE TABLE xwikidoc (xwd_id BIGINT NOT NULL, xwd_fullname VARCHAR)")
        .unwrap();
    db.execute("INSERT INTO xwikidoc VALUES (1, 'Main.WebHome')")
        .unwrap();
    db
}

fn applied(db: &DuckDbBackend) -> Vec<String> {
    db.query_rows("SELECT name FROM applied ORDER BY name", &[])
        .unwrap()
        .iter()
        .map(|r| r.get_str(0).unwrap().to_string())
        .collect()
}

fn wiki() -> WikiId {
    WikiId::new("xwiki")
}

#[test]
fn test_empty_store_is_initialized_at_latest() {
    let db = DuckDbBackend::in_memory().unwrap();
    let config = config("");
    let baseline = baseline();
    let catalog = Catalog::builder()
        .register(Recorder::new("M10", 10))
        .register(Recorder::new("M20", 20))
        .build()
        .unwrap();

    let mut runner = MigrationRunner::new(&catalog, &config, &baseline, Path::new("."));
    assert_eq!(runner.state(), RunnerState::NotStarted);
    let report = runner.run(&db, &wiki()).unwrap();

    assert_eq!(report.path, StartupPath::EmptyStoreInit);
    assert_eq!(report.initial, None);
    assert_eq!(report.final_stamp, Some(VersionStamp::new(20)));
    assert!(report.executed.is_empty());
    assert!(applied(&db).is_empty());
    assert!(!db.relation_exists("pre_m10").unwrap());
    assert_eq!(runner.state(), RunnerState::Idle);
}

#[test]
fn test_empty_store_initialized_even_when_disabled() {
    let db = DuckDbBackend::in_memory().unwrap();
    let config = config("migration:\n  enabled: false\n");
    let baseline = baseline();
    let catalog = Catalog::builder()
        .register(Recorder::new("M10", 10))
        .build()
        .unwrap();

    let report = MigrationRunner::new(&catalog, &config, &baseline, Path::new("."))
        .run(&db, &wiki())
        .unwrap();
    assert_eq!(report.final_stamp, Some(VersionStamp::new(10)));
}

#[test]
fn test_legacy_store_runs_every_migration() {
    let db = legacy_store();
    let config = config("");
    let baseline = baseline();
    let catalog = Catalog::builder()
        .register(Recorder::new("M10", 10))
        .register(Recorder::new("M20", 20))
        .build()
        .unwrap();

    let report = MigrationRunner::new(&catalog, &config, &baseline, Path::new("."))
        .run(&db, &wiki())
        .unwrap();

    assert_eq!(report.path, StartupPath::Legacy);
    assert_eq!(report.initial, Some(VersionStamp::LEGACY));
    assert_eq!(report.executed, vec!["M10", "M20"]);
    assert_eq!(report.pre_schema.executed, vec!["M10-pre-000", "M20-pre-000"]);
    assert_eq!(report.sync.tables_created, vec!["applied"]);
    assert_eq!(applied(&db), vec!["M10", "M20"]);
    assert!(db.relation_exists("pre_m20").unwrap());
}

#[test]
fn test_second_run_is_a_no_op() {
    let db = legacy_store();
    let config = config("");
    let baseline = baseline();
    let catalog = Catalog::builder()
        .register(Recorder::new("M10", 10))
        .build()
        .unwrap();

    let mut runner = MigrationRunner::new(&catalog, &config, &baseline, Path::new("."));
    runner.run(&db, &wiki()).unwrap();
    let again = runner.run(&db, &wiki()).unwrap();

    assert_eq!(again.path, StartupPath::UpToDate);
    assert!(again.executed.is_empty());
    assert_eq!(applied(&db), vec!["M10"]);
}

#[test]
fn test_failure_stops_and_keeps_previous_stamp() {
    let db = legacy_store();
    let config = config("");
    let baseline = baseline();
    let failing = Recorder::new("M20", 20);
    let fail = failing.fail.clone();
    fail.store(true, Ordering::SeqCst);
    let catalog = Catalog::builder()
        .register(Recorder::new("M10", 10))
        .register(failing)
        .register(Recorder::new("M30", 30))
        .build()
        .unwrap();

    let mut runner = MigrationRunner::new(&catalog, &config, &baseline, Path::new("."));
    let err = runner.run(&db, &wiki()).unwrap_err();
    assert!(matches!(err, MigrateError::DataTransform { ref name, .. } if name == "M20"));
    // M20's insert shares the rolled back transaction
    assert_eq!(applied(&db), vec!["M10"]);

    let status = runner.status(&db, &wiki()).unwrap();
    assert_eq!(status.current, Some(VersionStamp::new(10)));
    let pending: Vec<&str> = status.pending.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(pending, vec!["M20", "M30"]);

    fail.store(false, Ordering::SeqCst);
    let report = runner.run(&db, &wiki()).unwrap();
    assert_eq!(report.executed, vec!["M20", "M30"]);
    assert_eq!(report.final_stamp, Some(VersionStamp::new(30)));
}

#[test]
fn test_shared_version_is_recorded_after_its_last_entry() {
    let db = legacy_store();
    let config = config("");
    let baseline = baseline();
    let second = Recorder::new("B", 10);
    let fail = second.fail.clone();
    fail.store(true, Ordering::SeqCst);
    let catalog = Catalog::builder()
        .register(Recorder::new("A", 10))
        .register(second)
        .register(Recorder::new("C", 20))
        .allow_shared_version(VersionStamp::new(10), "branch backport")
        .build()
        .unwrap();

    let mut runner = MigrationRunner::new(&catalog, &config, &baseline, Path::new("."));
    let err = runner.run(&db, &wiki()).unwrap_err();
    assert!(matches!(err, MigrateError::DataTransform { ref name, .. } if name == "B"));
    assert_eq!(applied(&db), vec!["A"]);

    // A committed but the version it shares with B is not recorded yet
    let status = runner.status(&db, &wiki()).unwrap();
    assert_eq!(status.current, Some(VersionStamp::LEGACY));
    let pending: Vec<&str> = status.pending.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(pending, vec!["A", "B", "C"]);

    fail.store(false, Ordering::SeqCst);
    let report = runner.run(&db, &wiki()).unwrap();
    assert_eq!(report.executed, vec!["A", "B", "C"]);
    assert_eq!(report.final_stamp, Some(VersionStamp::new(20)));
    assert_eq!(applied(&db), vec!["A", "A", "B", "C"]);
}

#[test]
fn test_shared_version_group_writes_one_stamp() {
    let db = legacy_store();
    let config = config("");
    let baseline = baseline();
    let catalog = Catalog::builder()
        .register(Recorder::new("A", 10))
        .register(Recorder::new("B", 10))
        .allow_shared_version(VersionStamp::new(10), "branch backport")
        .build()
        .unwrap();

    let mut runner = MigrationRunner::new(&catalog, &config, &baseline, Path::new("."));
    let report = runner.run(&db, &wiki()).unwrap();
    assert_eq!(report.executed, vec!["A", "B"]);
    assert_eq!(report.final_stamp, Some(VersionStamp::new(10)));

    let again = runner.run(&db, &wiki()).unwrap();
    assert_eq!(again.path, StartupPath::UpToDate);
    assert_eq!(applied(&db), vec!["A", "B"]);
}

/// Runs only against the main wiki
struct MainWikiOnly;

impl Migration for MainWikiOnly {
    fn name(&self) -> &str {
        "MainOnly"
    }

    fn version(&self) -> VersionStamp {
        VersionStamp::new(20)
    }

    fn description(&self) -> &str {
        "main wiki only"
    }

    fn should_execute(&self, ctx: &MigrationContext<'_>, _startup: VersionStamp) -> bool {
        ctx.is_main_wiki()
    }

    fn migrate(&self, ctx: &MigrationContext<'_>) -> MigrateResult<()> {
        ctx.db()
            .execute_params("INSERT INTO applied VALUES (?)", &[self.name().into()])?;
        Ok(())
    }
}

#[test]
fn test_main_wiki_only_migration_skips_other_wikis() {
    let config = config("  - id: sub\n    path: \":memory:\"\n");
    let baseline = baseline();
    let catalog = Catalog::builder()
        .register(Recorder::new("M10", 10))
        .register(MainWikiOnly)
        .build()
        .unwrap();
    let mut runner = MigrationRunner::new(&catalog, &config, &baseline, Path::new("."));

    let main = legacy_store();
    let report = runner.run(&main, &wiki()).unwrap();
    assert_eq!(report.executed, vec!["M10", "MainOnly"]);

    let sub = legacy_store();
    let report = runner.run(&sub, &WikiId::new("sub")).unwrap();
    assert_eq!(report.executed, vec!["M10"]);
    assert_eq!(report.final_stamp, Some(VersionStamp::new(10)));
    assert_eq!(applied(&sub), vec!["M10"]);
}

#[test]
fn test_disabled_migrations_reject_outdated_store() {
    let db = legacy_store();
    let config = config("migration:\n  enabled: false\n");
    let baseline = baseline();
    let catalog = Catalog::builder()
        .register(Recorder::new("M10", 10))
        .build()
        .unwrap();

    let err = MigrationRunner::new(&catalog, &config, &baseline, Path::new("."))
        .run(&db, &wiki())
        .unwrap_err();
    assert!(matches!(err, MigrateError::StoreOutdated { .. }));
    assert!(!db.relation_exists("applied").unwrap());
}

struct RecordingTool(Rc<RefCell<Vec<String>>>);

impl SchemaTool for RecordingTool {
    fn apply(&self, _db: &dyn Database, changelog: &Changelog) -> SchemaResult<ApplyReport> {
        let ids: Vec<String> = changelog.change_sets.iter().map(|c| c.id.clone()).collect();
        self.0.borrow_mut().extend(ids.iter().cloned());
        Ok(ApplyReport {
            executed: ids,
            ..ApplyReport::default()
        })
    }
}

#[test]
fn test_schema_tool_override_receives_both_passes() {
    let db = legacy_store();
    let config = config("");
    let baseline = baseline();
    let catalog = Catalog::builder()
        .register(Recorder::new("M10", 10))
        .build()
        .unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let report = MigrationRunner::new(&catalog, &config, &baseline, Path::new("."))
        .with_schema_tool(Box::new(RecordingTool(seen.clone())))
        .run(&db, &wiki())
        .unwrap();

    assert_eq!(*seen.borrow(), vec!["M10-pre-000".to_string()]);
    assert!(!db.relation_exists("pre_m10").unwrap());
    assert_eq!(report.executed, vec!["M10"]);
}

#[test]
fn test_changelogs_for_pending_plan() {
    let db = legacy_store();
    let config = config("");
    let baseline = baseline();
    let catalog = Catalog::builder()
        .register(Recorder::new("M10", 10))
        .build()
        .unwrap();
    let runner = MigrationRunner::new(&catalog, &config, &baseline, Path::new("."));

    let (pre, post) = runner.changelogs(&db, &wiki()).unwrap();
    assert_eq!(pre.len(), 1);
    assert!(post.is_empty());
    assert!(!db.relation_exists("pre_m10").unwrap());
}

#[test]
fn test_report_serializes_to_json() {
    let db = DuckDbBackend::in_memory().unwrap();
    let config = config("");
    let baseline = baseline();
    let catalog = Catalog::builder()
        .register(Recorder::new("M10", 10))
        .build()
        .unwrap();
    let report = MigrationRunner::new(&catalog, &config, &baseline, Path::new("."))
        .run(&db, &wiki())
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["path"], "empty_store_init");
    assert_eq!(json["final_stamp"], 10);
}
