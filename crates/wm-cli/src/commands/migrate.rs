//! Migrate command implementation

use anyhow::{Context, Result};
use wm_core::VersionStamp;
use wm_migrate::{MigrationRunner, RunReport, StartupPath};
use wm_wiki::{baseline_schema, builtin_catalog};

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::common::{load_project, open_store, selected_wikis, ExitCode};

/// Execute the migrate command
///
/// A failing main wiki stops the run; other wikis are reported and skipped.
pub fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let catalog = builtin_catalog().context("Invalid built-in migration catalog")?;
    let baseline = baseline_schema();
    let main = project.config.main_wiki().map(|w| w.id.clone());

    let mut failed = Vec::new();
    for wiki in selected_wikis(&project.config, args.wiki.as_deref())? {
        let db = open_store(&project.root, wiki)?;
        let mut runner = MigrationRunner::new(&catalog, &project.config, &baseline, &project.root);

        match runner.run(&db, &wiki.id) {
            Ok(report) => print_report(&report, global.verbose),
            Err(e) if main.as_ref() == Some(&wiki.id) => {
                return Err(e).with_context(|| format!("Main wiki '{}' failed to migrate", wiki.id));
            }
            Err(e) => {
                eprintln!("  [{}] FAILED: {e}", wiki.id);
                failed.push(wiki.id.to_string());
            }
        }
    }

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{} wiki(s) failed: {}", failed.len(), failed.join(", "));
        return Err(ExitCode(1).into());
    }
    Ok(())
}

fn stamp(stamp: Option<VersionStamp>) -> String {
    stamp.map_or_else(|| "-".to_string(), |s| s.to_string())
}

fn print_report(report: &RunReport, verbose: bool) {
    match report.path {
        StartupPath::EmptyStoreInit => println!(
            "  [{}] created, version {} ({} table(s))",
            report.wiki,
            stamp(report.final_stamp),
            report.sync.tables_created.len()
        ),
        StartupPath::UpToDate => println!(
            "  [{}] up to date at version {}",
            report.wiki,
            stamp(report.final_stamp)
        ),
        StartupPath::Legacy | StartupPath::Normal => {
            println!(
                "  [{}] migrated {} -> {} ({} migration(s))",
                report.wiki,
                stamp(report.initial),
                stamp(report.final_stamp),
                report.executed.len()
            );
            if verbose {
                for name in &report.executed {
                    println!("      {name}");
                }
                println!(
                    "      schema: {} change set(s) executed, {} marked ran",
                    report.schema.executed.len() + report.pre_schema.executed.len(),
                    report.schema.marked_ran.len() + report.pre_schema.marked_ran.len()
                );
            }
        }
    }
}
