//! wm-wiki - Wiki store catalog for Wikimig
//!
//! This crate describes the wiki store: the baseline schema the generic sync
//! creates, the local uids row identifiers are derived from, and the built-in
//! migrations that bring older stores up to date.

pub mod baseline;
pub mod migrations;
pub mod reference;

pub use baseline::baseline_schema;
pub use migrations::builtin_catalog;

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use wm_core::{Config, WikiId};
    use wm_db::{Database, DialectProfile, Product, ProductVersion};
    use wm_migrate::MigrationContext;

    pub fn config(extra: &str) -> Config {
        let yaml = format!(
            "name: test\nwikis:\n  - id: xwiki\n    path: \":memory:\"\n{extra}"
        );
        serde_yaml::from_str(&yaml).unwrap()
    }

    pub fn profile(product: Product, major: u32, minor: u32, patch: u32) -> DialectProfile {
        DialectProfile::for_product(product, ProductVersion::new(major, minor, patch))
    }

    pub fn context<'a>(
        db: &'a dyn Database,
        config: &'a Config,
        profile: DialectProfile,
        progress_dir: &Path,
    ) -> MigrationContext<'a> {
        MigrationContext::new(
            db,
            Ok(profile),
            WikiId::new("xwiki"),
            true,
            config,
            progress_dir.to_path_buf(),
        )
    }
}
