//! Status command implementation

use anyhow::{Context, Result};
use wm_migrate::{MigrationRunner, StatusReport};
use wm_wiki::{baseline_schema, builtin_catalog};

use crate::cli::{GlobalArgs, StatusArgs, StatusOutput};
use crate::commands::common::{load_project, open_store, selected_wikis};

/// Execute the status command
pub fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let catalog = builtin_catalog().context("Invalid built-in migration catalog")?;
    let baseline = baseline_schema();
    let runner = MigrationRunner::new(&catalog, &project.config, &baseline, &project.root);

    let mut reports = Vec::new();
    for wiki in selected_wikis(&project.config, args.wiki.as_deref())? {
        let db = open_store(&project.root, wiki)?;
        let report = runner
            .status(&db, &wiki.id)
            .with_context(|| format!("Failed to read the status of wiki '{}'", wiki.id))?;
        reports.push(report);
    }

    match args.output {
        StatusOutput::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        StatusOutput::Text => {
            for report in &reports {
                print_text(report);
            }
        }
    }
    Ok(())
}

fn print_text(report: &StatusReport) {
    let product = report.product.as_deref().unwrap_or("unknown product");
    println!("{} ({product})", report.wiki);
    match report.current {
        None => println!("  empty store, will be created at the latest version"),
        Some(current) if current.is_legacy() => println!("  legacy store without version record"),
        Some(current) => println!("  version {current}"),
    }
    if let Some(latest) = report.latest {
        println!("  latest  {latest}");
    }

    if report.pending.is_empty() {
        println!("  up to date");
        return;
    }
    println!("  {} pending migration(s):", report.pending.len());
    let width = report
        .pending
        .iter()
        .map(|p| p.name.len())
        .max()
        .unwrap_or(0);
    for pending in &report.pending {
        println!(
            "    {:>10}  {:<width$}  {}",
            pending.version.to_string(),
            pending.name,
            pending.description
        );
    }
}
