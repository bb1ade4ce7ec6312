//! The ordered, validated set of known migrations.

use crate::error::{MigrateError, MigrateResult};
use crate::migration::Migration;
use std::collections::{HashMap, HashSet};
use wm_core::VersionStamp;

/// Collects migrations and validates them into a [`Catalog`].
#[derive(Default)]
pub struct CatalogBuilder {
    entries: Vec<Box<dyn Migration>>,
    shared: HashMap<VersionStamp, String>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(self, migration: impl Migration + 'static) -> Self {
        self.register_boxed(Box::new(migration))
    }

    pub fn register_boxed(mut self, migration: Box<dyn Migration>) -> Self {
        self.entries.push(migration);
        self
    }

    /// Permit several migrations to target `version`.
    ///
    /// Entries sharing the version run in registration order.
    pub fn allow_shared_version(mut self, version: VersionStamp, reason: &str) -> Self {
        self.shared.insert(version, reason.to_string());
        self
    }

    pub fn build(mut self) -> MigrateResult<Catalog> {
        let mut names = HashSet::new();
        for entry in &self.entries {
            if entry.name().is_empty() {
                return Err(MigrateError::Planning(
                    "migration with an empty name".to_string(),
                ));
            }
            if !names.insert(entry.name().to_string()) {
                return Err(MigrateError::Planning(format!(
                    "migration '{}' is registered twice",
                    entry.name()
                )));
            }
        }

        // Stable: shared-version entries keep registration order
        self.entries.sort_by_key(|m| m.version());

        for pair in self.entries.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.version() == b.version() {
                match self.shared.get(&a.version()) {
                    Some(reason) => log::debug!(
                        "Version {} shared by {} and {}: {}",
                        a.version(),
                        a.name(),
                        b.name(),
                        reason
                    ),
                    None => {
                        return Err(MigrateError::DuplicateVersion {
                            version: a.version(),
                            first: a.name().to_string(),
                            second: b.name().to_string(),
                        })
                    }
                }
            }
        }

        Ok(Catalog {
            entries: self.entries,
        })
    }
}

/// Read-only, version-ordered migrations.
pub struct Catalog {
    entries: Vec<Box<dyn Migration>>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Migration> {
        self.entries.iter().map(|m| m.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest version in the catalog
    pub fn latest(&self) -> Option<VersionStamp> {
        self.entries.last().map(|m| m.version())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Migration> {
        self.iter().find(|m| m.name() == name)
    }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
