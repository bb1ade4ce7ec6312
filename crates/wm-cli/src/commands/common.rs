//! Shared utilities for CLI commands

use anyhow::{bail, Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use wm_core::{Config, WikiConfig};
use wm_db::DuckDbBackend;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Return `Err(ExitCode(N).into())` instead of calling `std::process::exit`
/// so open stores are dropped before the process ends.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Failures were already reported; main only reads the code
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Project directory and its configuration
pub(crate) struct Project {
    pub root: PathBuf,
    pub config: Config,
}

/// Load the configuration named by the global arguments.
///
/// `--config` wins over the `wikimig.yml` of the project directory.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    let root = PathBuf::from(&global.project_dir);
    let config = match &global.config {
        Some(path) => Config::load(Path::new(path)),
        None => Config::load_from_dir(&root),
    }
    .context("Failed to load configuration")?;
    Ok(Project { root, config })
}

/// Wikis a command applies to: the one named, or all of them in
/// configuration order (main wiki first).
pub(crate) fn selected_wikis<'a>(
    config: &'a Config,
    wiki: Option<&str>,
) -> Result<Vec<&'a WikiConfig>> {
    match wiki {
        Some(id) => match config.get_wiki(id) {
            Some(found) => Ok(vec![found]),
            None => bail!("Unknown wiki '{id}'"),
        },
        None => Ok(config.wikis.iter().collect()),
    }
}

/// Open the store of `wiki`; relative paths resolve against the project root.
pub(crate) fn open_store(root: &Path, wiki: &WikiConfig) -> Result<DuckDbBackend> {
    let store = if wiki.path == ":memory:" {
        DuckDbBackend::in_memory()
    } else {
        let path = root.join(&wiki.path);
        log::debug!("Opening store of wiki [{}] at {}", wiki.id, path.display());
        DuckDbBackend::from_path(&path)
    };
    store.with_context(|| format!("Failed to open the store of wiki '{}'", wiki.id))
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
