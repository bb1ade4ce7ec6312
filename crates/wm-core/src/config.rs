//! Configuration types and parsing for wikimig.yml

use crate::error::{CoreError, CoreResult};
use crate::names::{MigrationName, WikiId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main project configuration from wikimig.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Wikis whose stores are migrated. The first entry is the main wiki.
    pub wikis: Vec<WikiConfig>,

    /// Migration engine settings
    #[serde(default)]
    pub migration: MigrationConfig,

    /// Names of the engine-owned tables in each store
    #[serde(default)]
    pub store: StoreConfig,

    /// Annotation application settings consulted by the annotation migration
    #[serde(default)]
    pub annotations: AnnotationConfig,
}

/// A single wiki and the store backing it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WikiConfig {
    /// Wiki identifier
    pub id: WikiId,

    /// Database path (DuckDB file or `:memory:`)
    pub path: String,
}

/// Migration engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    /// Run pending migrations on startup. When disabled, an outdated store is
    /// a fatal error instead of being migrated.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Migrations that must never be planned
    #[serde(default)]
    pub ignored: Vec<MigrationName>,

    /// Upper bound on rows handled per batch by batch-oriented migrations
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Directory holding progress logs of resumable migrations
    #[serde(default = "default_progress_dir")]
    pub progress_dir: String,

    /// Author recorded on rendered change sets
    #[serde(default = "default_author")]
    pub author: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ignored: Vec::new(),
            batch_size: default_batch_size(),
            progress_dir: default_progress_dir(),
            author: default_author(),
        }
    }
}

/// Engine-owned table names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Table holding the single version record
    #[serde(default = "default_version_table")]
    pub version_table: String,

    /// Primary content table probed to detect legacy stores
    #[serde(default = "default_content_table")]
    pub content_table: String,

    /// Table recording applied change sets
    #[serde(default = "default_changelog_table")]
    pub changelog_table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            version_table: default_version_table(),
            content_table: default_content_table(),
            changelog_table: default_changelog_table(),
        }
    }
}

/// Annotation application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnnotationConfig {
    /// Class holding annotation objects
    #[serde(default = "default_annotation_class")]
    pub class: String,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            class: default_annotation_class(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    100
}

fn default_progress_dir() -> String {
    "target/progress".to_string()
}

fn default_author() -> String {
    "wikimig".to_string()
}

fn default_version_table() -> String {
    "xwikidbversion".to_string()
}

fn default_content_table() -> String {
    "xwikidoc".to_string()
}

fn default_changelog_table() -> String {
    "wm_changelog".to_string()
}

/// Default annotation class shipped with the annotation application.
pub const DEFAULT_ANNOTATION_CLASS: &str = "AnnotationCode.AnnotationClass";

fn default_annotation_class() -> String {
    DEFAULT_ANNOTATION_CLASS.to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    ///
    /// Looks for wikimig.yml or wikimig.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("wikimig.yml");
        let yaml_path = dir.join("wikimig.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: dir.join("wikimig.yml").display().to_string(),
            })
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }

        if self.wikis.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "At least one wiki must be configured".to_string(),
            });
        }

        for (i, wiki) in self.wikis.iter().enumerate() {
            if self.wikis[..i].iter().any(|w| w.id == wiki.id) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("Duplicate wiki id '{}'", wiki.id),
                });
            }
        }

        if self.migration.batch_size == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "migration.batch_size must be greater than zero".to_string(),
            });
        }

        let tables = [
            ("store.version_table", &self.store.version_table),
            ("store.content_table", &self.store.content_table),
            ("store.changelog_table", &self.store.changelog_table),
        ];
        for (key, table) in tables {
            if !is_plain_identifier(table) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("{key} '{table}' is not a plain SQL identifier"),
                });
            }
        }

        Ok(())
    }

    /// The main wiki (first configured entry)
    pub fn main_wiki(&self) -> Option<&WikiConfig> {
        self.wikis.first()
    }

    /// Find a wiki by id
    pub fn get_wiki(&self, id: &str) -> Option<&WikiConfig> {
        self.wikis.iter().find(|w| w.id == id)
    }

    /// Whether a migration is listed in `migration.ignored`
    pub fn is_ignored(&self, name: &str) -> bool {
        self.migration.ignored.iter().any(|n| n == name)
    }

    /// Progress directory resolved against the project root
    pub fn progress_dir_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.migration.progress_dir)
    }
}

/// Table names are interpolated into SQL, so only `[A-Za-z_][A-Za-z0-9_]*`
/// is accepted.
fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
