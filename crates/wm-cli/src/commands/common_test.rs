use super::*;
use std::fs;
use tempfile::TempDir;
use wm_db::Database;

const CONFIG: &str = "name: farm
wikis:
  - id: xwiki
    path: stores/main.duckdb
  - id: sub
    path: \":memory:\"
";

fn global(dir: &Path, config: Option<String>) -> GlobalArgs {
    GlobalArgs {
        verbose: false,
        project_dir: dir.display().to_string(),
        config,
    }
}

#[test]
fn test_load_project_from_dir() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("wikimig.yml"), CONFIG).unwrap();

    let project = load_project(&global(dir.path(), None)).unwrap();
    assert_eq!(project.config.name, "farm");
    assert_eq!(project.root, dir.path());
}

#[test]
fn test_load_project_with_config_override() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("other.yml");
    fs::write(&path, CONFIG).unwrap();

    let project = load_project(&global(dir.path(), Some(path.display().to_string()))).unwrap();
    assert_eq!(project.config.wikis.len(), 2);

    let missing = global(dir.path(), None);
    assert!(load_project(&missing).is_err());
}

#[test]
fn test_selected_wikis() {
    let config: Config = load_config();
    let all = selected_wikis(&config, None).unwrap();
    let ids: Vec<&str> = all.iter().map(|w| w.id.as_str()).collect();
    assert_eq!(ids, vec!["xwiki", "sub"]);

    let one = selected_wikis(&config, Some("sub")).unwrap();
    assert_eq!(one.len(), 1);

    let err = selected_wikis(&config, Some("nope")).unwrap_err();
    assert!(err.to_string().contains("nope"));
}

#[test]
fn test_open_store_resolves_relative_paths() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("stores")).unwrap();
    let config = load_config();

    let db = open_store(dir.path(), &config.wikis[0]).unwrap();
    db.execute("CREATE TABLE marker (id INTEGER)").unwrap();
    drop(db);
    assert!(dir.path().join("stores/main.duckdb").exists());

    let memory = open_store(dir.path(), &config.wikis[1]).unwrap();
    assert!(!memory.relation_exists("marker").unwrap());
}

fn load_config() -> Config {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wikimig.yml");
    fs::write(&path, CONFIG).unwrap();
    Config::load(&path).unwrap()
}
