use super::*;
use crate::changelog::{ChangeUnit, Preconditions};
use wm_db::{DuckDbBackend, Product, ProductVersion};

fn duck_profile() -> DialectProfile {
    DialectProfile::for_product(Product::DuckDb, ProductVersion::new(1, 1, 0))
}

fn setup() -> (DuckDbBackend, ChangelogApplier) {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE xwikidoc (xwd_id BIGINT NOT NULL, xwd_fullname VARCHAR)")
        .unwrap();
    (db, ChangelogApplier::new(duck_profile(), "wm_changelog"))
}

fn change_set(fragment: &str, n: usize, unit: ChangeUnit) -> ChangeSet {
    unit.into_change_set(format!("{fragment}-{n:03}"), "wikimig", fragment)
}

fn add_column(name: &str) -> ChangeUnit {
    ChangeUnit::new(vec![Change::AddColumn {
        table_name: "xwikidoc".to_string(),
        columns: vec![ColumnSpec::new(name, DataType::Varchar(255))],
    }])
}

#[test]
fn test_apply_records_and_skips_on_rerun() {
    let (db, applier) = setup();
    let mut changelog = Changelog::new();
    changelog.push(change_set("M1", 0, add_column("xwd_title")));

    let first = applier.apply(&db, &changelog).unwrap();
    assert_eq!(first.executed, vec!["M1-000".to_string()]);
    assert!(db.column_info("xwikidoc", "xwd_title").unwrap().is_some());

    let second = applier.apply(&db, &changelog).unwrap();
    assert!(second.executed.is_empty());
    assert_eq!(second.already_applied, vec!["M1-000".to_string()]);

    let recorded = db
        .query_rows(
            "SELECT exec_type, order_executed, deployment_id FROM wm_changelog",
            &[],
        )
        .unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].get_str(0).unwrap(), "EXECUTED");
    assert_eq!(recorded[0].get_i64(1).unwrap(), 1);
    assert_eq!(recorded[0].get_str(2).unwrap(), applier.deployment_id());
}

#[test]
fn test_mark_ran_when_precondition_fails() {
    let (db, applier) = setup();
    let unit = ChangeUnit::new(vec![Change::ModifyDataType {
        table_name: "xwikidoc".to_string(),
        column_name: "xwd_id".to_string(),
        new_data_type: DataType::BigInt,
    }])
    .with_preconditions(Preconditions::new(
        FailAction::MarkRan,
        vec![Precondition::Not(vec![Precondition::ColumnType {
            table_name: "xwikidoc".to_string(),
            column_name: "xwd_id".to_string(),
            data_type: DataType::BigInt,
        }])],
    ));
    let mut changelog = Changelog::new();
    changelog.push(change_set("R40000", 0, unit));

    let report = applier.apply(&db, &changelog).unwrap();
    assert_eq!(report.marked_ran, vec!["R40000-000".to_string()]);
    let exec_type = db
        .query_rows("SELECT exec_type FROM wm_changelog", &[])
        .unwrap();
    assert_eq!(exec_type[0].get_str(0).unwrap(), "MARK_RAN");
}

#[test]
fn test_continue_defers_without_recording() {
    let (db, applier) = setup();
    let unit = add_column("xwd_hidden").with_preconditions(Preconditions::new(
        FailAction::Continue,
        vec![Precondition::Dbms {
            products: vec![Product::MySql],
        }],
    ));
    let mut changelog = Changelog::new();
    changelog.push(change_set("M1", 0, unit));

    let report = applier.apply(&db, &changelog).unwrap();
    assert_eq!(report.deferred.len(), 1);
    assert_eq!(db.query_count("SELECT * FROM wm_changelog").unwrap(), 0);
    assert!(db.column_info("xwikidoc", "xwd_hidden").unwrap().is_none());
}

#[test]
fn test_halt_fails_fragment() {
    let (db, applier) = setup();
    let unit = add_column("xwd_hidden").with_preconditions(Preconditions::new(
        FailAction::Halt,
        vec![Precondition::TableExists {
            table_name: "missing".to_string(),
        }],
    ));
    let mut changelog = Changelog::new();
    changelog.push(change_set("M1", 0, unit));

    let err = applier.apply(&db, &changelog).unwrap_err();
    match err {
        SchemaError::ApplyFailed { failures } => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].message.contains("SC003"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_failure_isolated_per_fragment() {
    let (db, applier) = setup();
    let mut changelog = Changelog::new();
    changelog.push(change_set(
        "Broken",
        0,
        ChangeUnit::new(vec![Change::sql("UPDATE no_such_table SET x = 1")]),
    ));
    changelog.push(change_set("Broken", 1, add_column("xwd_never")));
    changelog.push(change_set("Healthy", 0, add_column("xwd_title")));

    let err = applier.apply(&db, &changelog).unwrap_err();
    let SchemaError::ApplyFailed { failures } = err else {
        panic!("expected ApplyFailed");
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].fragment, "Broken");
    assert_eq!(failures[0].change_set, "Broken-000");

    assert!(db.column_info("xwikidoc", "xwd_never").unwrap().is_none());
    assert!(db.column_info("xwikidoc", "xwd_title").unwrap().is_some());
}

#[test]
fn test_logical_preconditions() {
    let (db, applier) = setup();
    let table = |name: &str| Precondition::TableExists {
        table_name: name.to_string(),
    };
    assert!(applier
        .evaluate(&db, &Precondition::Or(vec![table("missing"), table("xwikidoc")]))
        .unwrap());
    assert!(!applier
        .evaluate(&db, &Precondition::And(vec![table("missing"), table("xwikidoc")]))
        .unwrap());
    assert!(applier
        .evaluate(&db, &Precondition::Not(vec![table("missing")]))
        .unwrap());
    assert!(applier
        .evaluate(
            &db,
            &Precondition::SqlCheck {
                sql: "SELECT COUNT(*) FROM xwikidoc".to_string(),
                expected_result: 0,
            }
        )
        .unwrap());
}

#[test]
fn test_precondition_error_uses_on_error() {
    let (db, applier) = setup();
    let unit = add_column("xwd_hidden").with_preconditions(
        Preconditions::new(
            FailAction::Halt,
            vec![Precondition::SqlCheck {
                sql: "SELECT COUNT(*) FROM no_such_table".to_string(),
                expected_result: 0,
            }],
        )
        .on_error(FailAction::MarkRan),
    );
    let mut changelog = Changelog::new();
    changelog.push(change_set("M1", 0, unit));

    let report = applier.apply(&db, &changelog).unwrap();
    assert_eq!(report.marked_ran.len(), 1);
}
