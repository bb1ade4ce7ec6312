use super::*;
use crate::test_support::{config, context, profile};
use tempfile::TempDir;
use wm_db::DuckDbBackend;

fn map(pairs: &[(i64, i64)]) -> BTreeMap<i64, i64> {
    pairs.iter().copied().collect()
}

#[test]
fn test_independent_conversions_keep_key_order() {
    let ordered = order_conversions(&map(&[(3, 30), (1, 10)])).unwrap();
    assert_eq!(ordered, vec![(1, 10), (3, 30)]);
}

#[test]
fn test_chain_converts_tail_first() {
    // 1 -> 2 must wait until 2 has moved to 3
    let ordered = order_conversions(&map(&[(1, 2), (2, 3)])).unwrap();
    assert_eq!(ordered, vec![(2, 3), (1, 2)]);
}

#[test]
fn test_cycle_is_rejected() {
    let err = order_conversions(&map(&[(1, 2), (2, 1), (5, 6)])).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("circular"), "{message}");
    assert!(message.contains("1, 2"), "{message}");
}

fn legacy_store() -> DuckDbBackend {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE xwikidoc (xwd_id BIGINT, xwd_fullname VARCHAR, xwd_language VARCHAR);
         CREATE TABLE xwikilinks (xwl_doc_id BIGINT, xwl_link VARCHAR);
         CREATE TABLE xwikiobjects (xwo_id BIGINT, xwo_number INTEGER, xwo_name VARCHAR, xwo_classname VARCHAR);
         CREATE TABLE xwikistrings (xws_id BIGINT, xws_name VARCHAR, xws_value VARCHAR);
         INSERT INTO xwikidoc VALUES (1, 'Main.WebHome', ''), (2, 'Main.WebHome', 'fr');
         INSERT INTO xwikilinks VALUES (1, 'Sandbox.WebHome');
         INSERT INTO xwikiobjects VALUES (7, 0, 'Main.WebHome', 'XWiki.TagClass');
         INSERT INTO xwikistrings VALUES (7, 'tags', 'news');",
    )
    .unwrap();
    db
}

#[test]
fn test_migrate_rewrites_ids_everywhere() {
    let dir = TempDir::new().unwrap();
    let db = legacy_store();
    let config = config("");
    let ctx = context(&db, &config, profile(Product::DuckDb, 1, 1, 0), dir.path());

    IdHashConversion.migrate(&ctx).unwrap();

    let default_id = document_id("Main.WebHome", "");
    let french_id = document_id("Main.WebHome", "fr");
    let object = object_id("Main.WebHome", "XWiki.TagClass", 0);
    assert_eq!(
        db.query_i64("SELECT xwd_id FROM xwikidoc WHERE xwd_language = ''", &[])
            .unwrap(),
        Some(default_id)
    );
    assert_eq!(
        db.query_i64("SELECT xwd_id FROM xwikidoc WHERE xwd_language = 'fr'", &[])
            .unwrap(),
        Some(french_id)
    );
    assert_eq!(
        db.query_i64("SELECT xwl_doc_id FROM xwikilinks", &[]).unwrap(),
        Some(default_id)
    );
    assert_eq!(
        db.query_i64("SELECT xwo_id FROM xwikiobjects", &[]).unwrap(),
        Some(object)
    );
    assert_eq!(
        db.query_i64("SELECT xws_id FROM xwikistrings", &[]).unwrap(),
        Some(object)
    );
}

#[test]
fn test_migrate_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let db = legacy_store();
    let config = config("");
    let ctx = context(&db, &config, profile(Product::DuckDb, 1, 1, 0), dir.path());

    IdHashConversion.migrate(&ctx).unwrap();
    let before = db
        .query_rows("SELECT xwd_id FROM xwikidoc ORDER BY xwd_id", &[])
        .unwrap();
    IdHashConversion.migrate(&ctx).unwrap();
    let after = db
        .query_rows("SELECT xwd_id FROM xwikidoc ORDER BY xwd_id", &[])
        .unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_schema_fragment_marks_ran_when_already_bigint() {
    let db = DuckDbBackend::in_memory().unwrap();
    let config = config("");
    let dir = TempDir::new().unwrap();
    let ctx = context(&db, &config, profile(Product::MySql, 8, 0, 0), dir.path());

    let fragment = IdHashConversion.schema_fragment(&ctx).unwrap();
    assert_eq!(fragment.units.len(), WIDENED_COLUMNS.len());
    let first = &fragment.units[0];
    let preconditions = first.preconditions.as_ref().unwrap();
    assert_eq!(preconditions.on_fail, FailAction::MarkRan);
    assert!(preconditions.conditions.contains(&Precondition::Not(vec![
        Precondition::Dbms {
            products: vec![Product::Oracle]
        }
    ])));
    assert!(matches!(
        first.changes[0],
        Change::ModifyDataType {
            new_data_type: DataType::BigInt,
            ..
        }
    ));
}
