//! Changelog command implementation

use anyhow::{Context, Result};
use wm_migrate::MigrationRunner;
use wm_wiki::{baseline_schema, builtin_catalog};

use crate::cli::{ChangelogArgs, ChangelogPass, GlobalArgs};
use crate::commands::common::{load_project, open_store, selected_wikis};

/// Execute the changelog command
pub fn execute(args: &ChangelogArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let catalog = builtin_catalog().context("Invalid built-in migration catalog")?;
    let baseline = baseline_schema();
    let runner = MigrationRunner::new(&catalog, &project.config, &baseline, &project.root);

    for wiki in selected_wikis(&project.config, args.wiki.as_deref())? {
        let db = open_store(&project.root, wiki)?;
        let (pre, schema) = runner
            .changelogs(&db, &wiki.id)
            .with_context(|| format!("Failed to render the changelogs of wiki '{}'", wiki.id))?;

        println!("# wiki: {}", wiki.id);
        let passes = [
            (ChangelogPass::Pre, "pre-schema", &pre),
            (ChangelogPass::Schema, "schema", &schema),
        ];
        for (pass, label, changelog) in passes {
            if args.pass != ChangelogPass::All && args.pass != pass {
                continue;
            }
            println!("# {label}: {} change set(s)", changelog.len());
            if !changelog.is_empty() {
                print!("{}", changelog.to_yaml()?);
            }
        }
    }
    Ok(())
}
