//! End-to-end tests of the `wm` binary against file-backed stores.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use wm_db::{Database, DuckDbBackend};

/// Path to the compiled wm binary
fn wm_bin() -> String {
    env!("CARGO_BIN_EXE_wm").to_string()
}

/// Run a `wm` command in `project` and return (stdout, stderr, success).
fn run_wm(project: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(wm_bin())
        .arg("--project-dir")
        .arg(project)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute wm with args {:?}: {}", args, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn project(config: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("wikimig.yml"), config).unwrap();
    dir
}

const SINGLE_WIKI: &str = "name: cli
wikis:
  - id: xwiki
    path: main.duckdb
";

fn status_json(project: &Path) -> serde_json::Value {
    let (stdout, stderr, ok) = run_wm(project, &["status", "--output", "json"]);
    assert!(ok, "status failed: {stderr}");
    serde_json::from_str(&stdout).unwrap()
}

// ── Empty store ────────────────────────────────────────────────────────

#[test]
fn test_migrate_creates_empty_store() {
    let dir = project(SINGLE_WIKI);

    let (stdout, stderr, ok) = run_wm(dir.path(), &["migrate"]);
    assert!(ok, "migrate failed: {stderr}");
    assert!(stdout.contains("[xwiki] created, version 180100000"), "{stdout}");

    let status = status_json(dir.path());
    assert_eq!(status[0]["wiki"], "xwiki");
    assert_eq!(status[0]["current"], 180100000);
    assert_eq!(status[0]["pending"].as_array().unwrap().len(), 0);

    let (stdout, _, ok) = run_wm(dir.path(), &["migrate"]);
    assert!(ok);
    assert!(stdout.contains("up to date"), "{stdout}");
}

// ── Legacy store ───────────────────────────────────────────────────────

fn seed_legacy(path: &Path) {
    let db = DuckDbBackend::from_path(path).unwrap();
    db.execute_batch(
        "CREATE TABLE xwikidoc (xwd_id BIGINT, xwd_fullname VARCHAR, xwd_language VARCHAR);
         INSERT INTO xwikidoc VALUES (1, 'Main.WebHome', '');",
    )
    .unwrap();
}

#[test]
fn test_legacy_store_status_then_migrate() {
    let dir = project(SINGLE_WIKI);
    seed_legacy(&dir.path().join("main.duckdb"));

    let status = status_json(dir.path());
    assert_eq!(status[0]["current"], 0);
    let pending: Vec<&str> = status[0]["pending"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert!(pending.contains(&"R40000XWIKI6990"));

    let (stdout, _, ok) = run_wm(dir.path(), &["changelog", "--pass", "schema"]);
    assert!(ok);
    assert!(stdout.contains("# schema:"), "{stdout}");
    assert!(!stdout.contains("# pre-schema:"), "{stdout}");

    let (stdout, stderr, ok) = run_wm(dir.path(), &["migrate", "--verbose"]);
    assert!(ok, "migrate failed: {stderr}");
    assert!(stdout.contains("migrated 0 -> 180100000"), "{stdout}");
    assert!(stdout.contains("R40000XWIKI6990"), "{stdout}");

    let status = status_json(dir.path());
    assert_eq!(status[0]["current"], 180100000);
}

// ── Failures ───────────────────────────────────────────────────────────

#[test]
fn test_disabled_migrations_fail_outdated_store() {
    let dir = project(
        "name: cli
wikis:
  - id: xwiki
    path: main.duckdb
migration:
  enabled: false
",
    );
    seed_legacy(&dir.path().join("main.duckdb"));

    let (_, stderr, ok) = run_wm(dir.path(), &["migrate"]);
    assert!(!ok);
    assert!(stderr.contains("xwiki"), "{stderr}");
}

#[test]
fn test_unknown_wiki_is_an_error() {
    let dir = project(SINGLE_WIKI);
    let (_, stderr, ok) = run_wm(dir.path(), &["status", "--wiki", "missing"]);
    assert!(!ok);
    assert!(stderr.contains("Unknown wiki 'missing'"), "{stderr}");
}

#[test]
fn test_missing_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, ok) = run_wm(dir.path(), &["status"]);
    assert!(!ok);
    assert!(stderr.contains("Failed to load configuration"), "{stderr}");
}
