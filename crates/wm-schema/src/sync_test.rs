use super::*;
use crate::changelog::DataType;
use wm_db::{DuckDbBackend, Product, ProductVersion};

fn model() -> SchemaModel {
    SchemaModel::new(vec![TableDef::new(
        "xwikidoc",
        vec![
            ColumnSpec::new("xwd_id", DataType::BigInt).primary_key(),
            ColumnSpec::new("xwd_fullname", DataType::Varchar(768)).not_null(),
            ColumnSpec::new("xwd_title", DataType::Varchar(768)),
        ],
    )
    .index(IndexDef::new("xwd_fullname_idx", &["xwd_fullname"]))])
}

#[test]
fn test_sync_creates_missing_table() {
    let db = DuckDbBackend::in_memory().unwrap();
    let profile = DialectProfile::for_product(Product::DuckDb, ProductVersion::new(1, 1, 0));

    let report = SchemaSync::new(&profile).sync(&db, &model()).unwrap();
    assert_eq!(report.tables_created, vec!["xwikidoc".to_string()]);
    assert_eq!(report.indexes_created, vec!["xwd_fullname_idx".to_string()]);
    assert!(db.relation_exists("xwikidoc").unwrap());
    assert!(db.index_exists("xwikidoc", "xwd_fullname_idx").unwrap());

    let again = SchemaSync::new(&profile).sync(&db, &model()).unwrap();
    assert!(again.is_noop());
}

#[test]
fn test_sync_adds_missing_column_as_nullable() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE xwikidoc (xwd_id BIGINT NOT NULL, xwd_fullname VARCHAR NOT NULL);
         INSERT INTO xwikidoc VALUES (1, 'Main.WebHome');",
    )
    .unwrap();
    let profile = DialectProfile::for_product(Product::DuckDb, ProductVersion::new(1, 1, 0));

    let report = SchemaSync::new(&profile).sync(&db, &model()).unwrap();
    assert_eq!(report.columns_added, vec!["xwikidoc.xwd_title".to_string()]);
    let info = db.column_info("xwikidoc", "xwd_title").unwrap().unwrap();
    assert!(info.nullable);
}

#[test]
fn test_model_lookup_is_case_insensitive() {
    let model = model();
    let table = model.table("XWIKIDOC").unwrap();
    assert!(table.column("XWD_TITLE").is_some());
    assert!(model.table("xwikiobjects").is_none());
}
