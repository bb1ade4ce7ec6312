//! Strongly-typed names for migrations and wikis.

use crate::newtype_string::define_newtype_string;

define_newtype_string! {
    /// Unique hint identifying a migration in the catalog, e.g. `R40000XWIKI6990`.
    pub struct MigrationName;
}

define_newtype_string! {
    /// Identifier of a wiki (one store per wiki).
    pub struct WikiId;
}
