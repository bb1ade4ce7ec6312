//! Persistence of the store's version stamp.

use crate::error::{MigrateError, MigrateResult};
use wm_core::{StoreConfig, VersionStamp};
use wm_db::{Database, DbError, DialectProfile, Product, ProductVersion};
use wm_schema::{Change, ColumnSpec, DataType, DdlGenerator};

/// Column holding the stamp in the version table
pub const VERSION_COLUMN: &str = "xwv_version";

/// Reads and writes the single-row version record.
pub struct VersionStore {
    version_table: String,
    content_table: String,
    profile: DialectProfile,
}

impl VersionStore {
    pub fn new(store: &StoreConfig) -> Self {
        Self {
            version_table: store.version_table.clone(),
            content_table: store.content_table.clone(),
            profile: DialectProfile::for_product(Product::Other, ProductVersion::default()),
        }
    }

    /// Use `profile` for the DDL creating the version table
    pub fn with_profile(mut self, profile: &DialectProfile) -> Self {
        self.profile = profile.clone();
        self
    }

    /// Read the stamp on an isolated connection.
    ///
    /// Returns the recorded stamp, [`VersionStamp::LEGACY`] for a populated
    /// store without a record, or `None` for an empty store. Query failures
    /// count as "no stamp"; only failing to open the isolated connection is
    /// an error.
    pub fn read(&self, db: &dyn Database) -> MigrateResult<Option<VersionStamp>> {
        let conn = db.isolated().map_err(|e| {
            MigrateError::Planning(format!("cannot open a connection to read the version: {e}"))
        })?;
        let conn = conn.as_ref();

        match self.read_record(conn) {
            Ok(Some(stamp)) => return Ok(Some(stamp)),
            Ok(None) => {}
            Err(e) => log::debug!("No readable version record: {e}"),
        }

        match self.has_content(conn) {
            Ok(true) => {
                log::info!(
                    "Store has content in {} but no version record, treating it as legacy",
                    self.content_table
                );
                Ok(Some(VersionStamp::LEGACY))
            }
            Ok(false) => Ok(None),
            Err(e) => {
                log::debug!("Population probe failed, treating store as empty: {e}");
                Ok(None)
            }
        }
    }

    fn read_record(&self, conn: &dyn Database) -> MigrateResult<Option<VersionStamp>> {
        if !conn.relation_exists(&self.version_table)? {
            return Ok(None);
        }
        let value = conn.query_i64(
            &format!(
                "SELECT MAX({VERSION_COLUMN}) FROM {}",
                self.version_table
            ),
            &[],
        )?;
        match value {
            Some(v) => Ok(Some(VersionStamp::from_db(v)?)),
            None => Ok(None),
        }
    }

    fn has_content(&self, conn: &dyn Database) -> Result<bool, DbError> {
        if !conn.relation_exists(&self.content_table)? {
            return Ok(false);
        }
        let rows = conn.query_rows(
            &format!("SELECT 1 FROM {} LIMIT 1", self.content_table),
            &[],
        )?;
        Ok(!rows.is_empty())
    }

    /// Replace the record with `stamp` on `db`, inside the caller's
    /// transaction if one is open.
    pub fn write(&self, db: &dyn Database, stamp: VersionStamp) -> MigrateResult<()> {
        if !db.relation_exists(&self.version_table)? {
            let create = Change::CreateTable {
                table_name: self.version_table.clone(),
                columns: vec![ColumnSpec::new(VERSION_COLUMN, DataType::BigInt).not_null()],
            };
            for sql in DdlGenerator::new(&self.profile).render(&create)? {
                db.execute(&sql)?;
            }
        }

        db.execute(&format!("DELETE FROM {}", self.version_table))?;
        db.execute_params(
            &format!(
                "INSERT INTO {} ({VERSION_COLUMN}) VALUES (?)",
                self.version_table
            ),
            &[stamp.to_db()?.into()],
        )?;
        log::debug!("Version stamp set to {stamp}");
        Ok(())
    }
}

#[cfg(test)]
#[path = "version_store_test.rs"]
mod tests;
