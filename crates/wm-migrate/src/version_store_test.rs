use super::*;
use wm_db::DuckDbBackend;

fn store() -> VersionStore {
    VersionStore::new(&StoreConfig::default())
        .with_profile(&DialectProfile::for_product(Product::DuckDb, ProductVersion::new(1, 1, 0)))
}

#[test]
fn test_empty_store_has_no_stamp() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert_eq!(store().read(&db).unwrap(), None);
}

#[test]
fn test_empty_content_table_is_still_empty() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute("CREATE TABLE xwikidoc (xwd_id BIGINT)").unwrap();
    assert_eq!(store().read(&db).unwrap(), None);
}

#[test]
fn test_populated_store_without_record_is_legacy() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute("CREATE TABLE xwikidoc (xwd_id BIGINT)").unwrap();
    db.execute("INSERT INTO xwikidoc VALUES (1)").unwrap();
    assert_eq!(store().read(&db).unwrap(), Some(VersionStamp::LEGACY));
}

#[test]
fn test_write_creates_table_and_replaces_record() {
    let db = DuckDbBackend::in_memory().unwrap();
    let store = store();
    store.write(&db, VersionStamp::new(40000)).unwrap();
    store.write(&db, VersionStamp::new(40001)).unwrap();

    assert_eq!(store.read(&db).unwrap(), Some(VersionStamp::new(40001)));
    assert_eq!(db.query_count("SELECT * FROM xwikidbversion").unwrap(), 1);
}

#[test]
fn test_record_wins_over_content_probe() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute("CREATE TABLE xwikidoc (xwd_id BIGINT)").unwrap();
    db.execute("INSERT INTO xwikidoc VALUES (1)").unwrap();
    store().write(&db, VersionStamp::new(130200000)).unwrap();
    assert_eq!(store().read(&db).unwrap(), Some(VersionStamp::new(130200000)));
}

#[test]
fn test_empty_version_table_falls_back_to_content() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute("CREATE TABLE xwikidbversion (xwv_version BIGINT)").unwrap();
    assert_eq!(store().read(&db).unwrap(), None);
}
