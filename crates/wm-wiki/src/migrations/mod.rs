//! Built-in migrations of the wiki store.

mod annotations;
mod dynamic_row_format;
mod id_hash;
mod passwords;
mod widen_title;

pub use annotations::AnnotationsToComments;
pub use dynamic_row_format::DynamicRowFormat;
pub use id_hash::{order_conversions, IdHashConversion};
pub use passwords::{password_fields, PasswordRetype};
pub use widen_title::WidenTitle;

use wm_core::VersionStamp;
use wm_migrate::{Catalog, MigrateResult};

/// First stamp of the 14.x line; the 13.10.x backports live below it
const BRANCH_14_START: VersionStamp = VersionStamp::new(140000000);

/// Every migration shipped with the engine, validated and ordered.
pub fn builtin_catalog() -> MigrateResult<Catalog> {
    Catalog::builder()
        .register(IdHashConversion)
        .register(AnnotationsToComments)
        .register(DynamicRowFormat)
        .register(WidenTitle::new("R131007000WidenTitle", VersionStamp::new(131007000)))
        .register(
            WidenTitle::new("R140200010WidenTitle", VersionStamp::new(140200010))
                .skip_backported(VersionStamp::new(131007000), BRANCH_14_START),
        )
        .register(PasswordRetype)
        .build()
}

/// Whether `table` exists in the store
fn table_present(db: &dyn wm_db::Database, table: &str) -> MigrateResult<bool> {
    Ok(db.relation_exists(table)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_order() {
        let catalog = builtin_catalog().unwrap();
        let names: Vec<&str> = catalog.iter().map(|m| m.name()).collect();
        assert_eq!(
            names,
            vec![
                "R40000XWIKI6990",
                "R40001XWIKI7540",
                "R130200000DynamicRowFormat",
                "R131007000WidenTitle",
                "R140200010WidenTitle",
                "R180100000XWIKI23827",
            ]
        );
        assert_eq!(catalog.latest(), Some(VersionStamp::new(180100000)));
    }
}
