//! Dialect detection against a live store.

use crate::dialect::DialectProfile;
use crate::error::{DbError, DialectProbeError};
use crate::traits::{run_isolated, Database};

impl From<DbError> for DialectProbeError {
    fn from(err: DbError) -> Self {
        DialectProbeError::Metadata(err)
    }
}

/// Determine the product and capabilities of the connected store.
///
/// Metadata is read on an isolated connection so a failure cannot disturb
/// work in progress on `db`.
pub fn probe(db: &dyn Database) -> Result<DialectProfile, DialectProbeError> {
    let info = run_isolated(db, |conn| conn.product_info().map_err(DialectProbeError::from))?;
    if info.name.trim().is_empty() {
        return Err(DialectProbeError::EmptyProductName);
    }

    let profile = DialectProfile::from_product_info(&info);
    log::debug!(
        "Detected {} {} (reported as '{}')",
        profile.product,
        profile.version,
        profile.version_string
    );
    Ok(profile)
}
