//! R180100000XWIKI23827: password fields stored as plain string properties
//! are retyped as password properties.
//!
//! Classes are found through their stored XML definition. Objects are
//! processed in bounded batches and the progress log lets an interrupted run
//! resume where it stopped.

use crate::baseline::{DOCUMENTS, OBJECTS, PROPERTIES};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use wm_core::VersionStamp;
use wm_db::Database;
use wm_migrate::{
    run_batches, MigrateResult, Migration, MigrationContext, ProgressLog, TransactionMode,
};

const NAME: &str = "R180100000XWIKI23827";

const PASSWORD_CLASS_TYPE: &str = "com.xpn.xwiki.objects.classes.PasswordClass";
const STRING_PROPERTY: &str = "com.xpn.xwiki.objects.StringProperty";
const PASSWORD_PROPERTY: &str = "com.xpn.xwiki.objects.PasswordProperty";

static FIELD_RE: OnceLock<Regex> = OnceLock::new();

fn field_regex() -> &'static Regex {
    FIELD_RE.get_or_init(|| {
        Regex::new(r"<name>([^<]*)</name>|<classType>([^<]*)</classType>").expect("valid regex")
    })
}

/// Names of the password fields declared in a class XML definition.
///
/// Each field element carries its `<name>` before its `<classType>`, so a
/// password class type belongs to the closest name above it.
pub fn password_fields(class_xml: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut last_name: Option<&str> = None;
    for caps in field_regex().captures_iter(class_xml) {
        if let Some(name) = caps.get(1) {
            last_name = Some(name.as_str().trim());
        } else if let Some(class_type) = caps.get(2) {
            if class_type.as_str().trim() == PASSWORD_CLASS_TYPE {
                if let Some(name) = last_name.take() {
                    fields.push(name.to_string());
                }
            }
        }
    }
    fields
}

/// An object of a class declaring password fields
struct PasswordObject {
    class_name: String,
    id: i64,
}

fn password_classes(db: &dyn Database) -> MigrateResult<BTreeMap<String, Vec<String>>> {
    let rows = db.query_rows(
        &format!(
            "SELECT xwd_fullname, xwd_class_xml FROM {DOCUMENTS} \
             WHERE xwd_class_xml LIKE ? ORDER BY xwd_fullname"
        ),
        &[format!("%<classType>{PASSWORD_CLASS_TYPE}</classType>%").into()],
    )?;
    let mut classes = BTreeMap::new();
    for row in rows {
        let fields = password_fields(row.get_opt_str(1)?.unwrap_or(""));
        if !fields.is_empty() {
            classes.insert(row.get_str(0)?.to_string(), fields);
        }
    }
    Ok(classes)
}

fn password_objects(db: &dyn Database, class_name: &str) -> MigrateResult<Vec<PasswordObject>> {
    let rows = db.query_rows(
        &format!("SELECT xwo_id FROM {OBJECTS} WHERE xwo_classname = ? ORDER BY xwo_id"),
        &[class_name.into()],
    )?;
    rows.iter()
        .map(|r| -> MigrateResult<PasswordObject> {
            Ok(PasswordObject {
                class_name: class_name.to_string(),
                id: r.get_i64(0)?,
            })
        })
        .collect()
}

pub struct PasswordRetype;

impl Migration for PasswordRetype {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> VersionStamp {
        VersionStamp::new(180100000)
    }

    fn description(&self) -> &str {
        "Store password fields as password properties"
    }

    fn migrate(&self, ctx: &MigrationContext<'_>) -> MigrateResult<()> {
        let db = ctx.db();
        let classes = password_classes(db)?;
        if classes.is_empty() {
            log::info!("[{NAME}] No class declares a password field");
            return Ok(());
        }

        let mut objects = Vec::new();
        for class_name in classes.keys() {
            let found = password_objects(db, class_name)?;
            log::debug!("[{NAME}] {} object(s) of [{class_name}]", found.len());
            objects.extend(found);
        }
        log::info!(
            "[{NAME}] {} object(s) of {} class(es) to check",
            objects.len(),
            classes.len()
        );

        let update = format!(
            "UPDATE {PROPERTIES} SET xwp_classtype = ? \
             WHERE xwp_id = ? AND xwp_name = ? AND xwp_classtype = ?"
        );
        let mut progress = ProgressLog::open(ctx.progress_dir(), NAME)?;
        let processed = run_batches(
            db,
            &objects,
            ctx.config().migration.batch_size,
            &mut progress,
            |o| format!("{}:{}", o.class_name, o.id),
            |tx, batch| {
                for object in batch {
                    let Some(fields) = classes.get(&object.class_name) else {
                        continue;
                    };
                    for field in fields {
                        tx.execute_params(
                            &update,
                            &[
                                PASSWORD_PROPERTY.into(),
                                object.id.into(),
                                field.as_str().into(),
                                STRING_PROPERTY.into(),
                            ],
                        )?;
                    }
                }
                Ok(())
            },
        )?;
        log::info!("[{NAME}] Retyped the password fields of {processed} object(s)");
        progress.finish()
    }

    fn transaction_mode(&self) -> TransactionMode {
        TransactionMode::PerBatch
    }
}

#[cfg(test)]
#[path = "passwords_test.rs"]
mod tests;
