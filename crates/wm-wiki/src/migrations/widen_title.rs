//! Widen `xwd_title` to the reference width.
//!
//! The same change ships twice: on the 13.10.x maintenance line and on 14.x.
//! A store upgraded through the backport already has the wide column, so the
//! 14.x copy skips stores whose startup version falls in the backport window.

use crate::baseline::{DOCUMENTS, REFERENCE_WIDTH};
use wm_core::VersionStamp;
use wm_db::{ColumnInfo, DbResult};
use wm_migrate::{Migration, MigrationContext};
use wm_schema::{Change, ChangeUnit, DataType, SchemaFragment};

const TITLE: &str = "xwd_title";

pub struct WidenTitle {
    name: &'static str,
    version: VersionStamp,
    backport: Option<(VersionStamp, VersionStamp)>,
}

impl WidenTitle {
    pub fn new(name: &'static str, version: VersionStamp) -> Self {
        Self {
            name,
            version,
            backport: None,
        }
    }

    /// Skip stores started at a version in `[start, end)`.
    pub fn skip_backported(mut self, start: VersionStamp, end: VersionStamp) -> Self {
        self.backport = Some((start, end));
        self
    }
}

/// Whether the probed title column is narrower than the reference width.
///
/// A store that does not report a length is left alone; a failed probe
/// widens anyway.
fn needs_widening(name: &str, probed: DbResult<Option<ColumnInfo>>) -> bool {
    match probed {
        Ok(Some(ColumnInfo {
            max_length: Some(length),
            ..
        })) => length < REFERENCE_WIDTH,
        Ok(_) => false,
        Err(e) => {
            log::warn!(
                "[{name}] Could not read the size of {DOCUMENTS}.{TITLE} ({e}), widening it"
            );
            true
        }
    }
}

impl Migration for WidenTitle {
    fn name(&self) -> &str {
        self.name
    }

    fn version(&self) -> VersionStamp {
        self.version
    }

    fn description(&self) -> &str {
        "Widen document titles to the reference width"
    }

    fn should_execute(&self, ctx: &MigrationContext<'_>, startup: VersionStamp) -> bool {
        if let Some((start, end)) = self.backport {
            if startup.in_window(start, end) {
                log::info!(
                    "[{}] Store started at {startup}, already widened by the {start} backport",
                    self.name
                );
                return false;
            }
        }
        needs_widening(self.name, ctx.db().column_info(DOCUMENTS, TITLE))
    }

    fn schema_fragment(&self, _ctx: &MigrationContext<'_>) -> Option<SchemaFragment> {
        Some(SchemaFragment::new().unit(ChangeUnit::new(vec![
            Change::ModifyDataType {
                table_name: DOCUMENTS.to_string(),
                column_name: TITLE.to_string(),
                new_data_type: DataType::Varchar(REFERENCE_WIDTH),
            },
        ])))
    }
}

#[cfg(test)]
#[path = "widen_title_test.rs"]
mod tests;
