//! R40001XWIKI7540: annotations are merged into the document's comments.
//!
//! Annotation and comment objects of a document are renumbered together by
//! creation date and all become comments. Object ids embed the class and the
//! number, so every affected object and property row is read, deleted and
//! written back under its new id. Each document is one transaction.

use crate::baseline::{DATES, INTEGERS, LARGE_STRINGS, OBJECTS, PROPERTIES, STRINGS};
use crate::reference::object_id;
use std::collections::HashMap;
use wm_core::config::DEFAULT_ANNOTATION_CLASS;
use wm_core::VersionStamp;
use wm_db::{transaction, Database, Value};
use wm_migrate::{MigrateError, MigrateResult, Migration, MigrationContext};

const NAME: &str = "R40001XWIKI7540";

pub const COMMENT_CLASS: &str = "XWiki.XWikiComments";

const STRING_LIST_TYPE: &str = "com.xpn.xwiki.objects.StringListProperty";
const STRING_TYPE: &str = "com.xpn.xwiki.objects.StringProperty";
const LARGE_STRING_TYPE: &str = "com.xpn.xwiki.objects.LargeStringProperty";

/// A `(id, name, value)` table holding property values
struct ValueTable {
    table: &'static str,
    prefix: &'static str,
    timestamp: bool,
}

const VALUE_TABLES: &[ValueTable] = &[
    ValueTable {
        table: STRINGS,
        prefix: "xws",
        timestamp: false,
    },
    ValueTable {
        table: LARGE_STRINGS,
        prefix: "xwl",
        timestamp: false,
    },
    ValueTable {
        table: INTEGERS,
        prefix: "xwi",
        timestamp: false,
    },
    ValueTable {
        table: DATES,
        prefix: "xws",
        timestamp: true,
    },
];

const STRINGS_INDEX: usize = 0;
const LARGE_STRINGS_INDEX: usize = 1;

pub struct AnnotationsToComments;

/// An annotation or comment object as stored
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub id: i64,
    pub number: i64,
    pub class_name: String,
    pub guid: Option<String>,
}

/// Where a stored object ends up
#[derive(Debug, Clone, PartialEq)]
pub struct Renumbered {
    pub old_id: i64,
    pub new_id: i64,
    pub new_number: i64,
    pub guid: Option<String>,
}

/// Renumber `objects`, already sorted by date, as comments of `document`.
///
/// Returns the new objects and the old-to-new numbers of the objects that
/// were comments already, used to remap `replyto`.
pub fn renumber(document: &str, objects: &[StoredObject]) -> (Vec<Renumbered>, HashMap<i64, i64>) {
    let mut comment_numbers = HashMap::new();
    let renumbered = objects
        .iter()
        .zip(0_i64..)
        .map(|(object, number)| {
            if object.class_name == COMMENT_CLASS {
                comment_numbers.insert(object.number, number);
            }
            Renumbered {
                old_id: object.id,
                new_id: object_id(document, COMMENT_CLASS, number),
                new_number: number,
                guid: object.guid.clone(),
            }
        })
        .collect();
    (renumbered, comment_numbers)
}

/// Comments call the annotated text `comment`
fn migrated_name(name: &str) -> &str {
    if name == "annotation" {
        "comment"
    } else {
        name
    }
}

/// User lists become a plain string for `author`, a large string otherwise
fn migrated_class_type<'a>(name: &str, class_type: &'a str) -> &'a str {
    match (class_type, name) {
        (STRING_LIST_TYPE, "author") => STRING_TYPE,
        (STRING_LIST_TYPE, _) => LARGE_STRING_TYPE,
        (other, _) => other,
    }
}

/// First element of a `|`-separated list value, NULL when the list is empty
fn first_list_element(value: &Value) -> Value {
    match value {
        Value::Text(list) => match list.split('|').next() {
            Some(first) if !first.is_empty() => Value::Text(first.to_string()),
            _ => Value::Null,
        },
        other => other.clone(),
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Documents holding at least one annotation, ordered by name
fn documents_to_migrate(db: &dyn Database) -> MigrateResult<Vec<String>> {
    let rows = db.query_rows(
        &format!(
            "SELECT DISTINCT xwo_name FROM {OBJECTS} WHERE xwo_classname = ? ORDER BY xwo_name"
        ),
        &[DEFAULT_ANNOTATION_CLASS.into()],
    )?;
    rows.iter()
        .map(|r| -> MigrateResult<String> { Ok(r.get_str(0)?.to_string()) })
        .collect()
}

fn load_objects(db: &dyn Database, document: &str) -> MigrateResult<Vec<StoredObject>> {
    let rows = db.query_rows(
        &format!(
            "SELECT o.xwo_id, o.xwo_number, o.xwo_classname, o.xwo_guid FROM {OBJECTS} o \
             LEFT JOIN {DATES} d ON d.xws_id = o.xwo_id AND d.xws_name = 'date' \
             WHERE o.xwo_name = ? AND o.xwo_classname IN (?, ?) \
             ORDER BY d.xws_value, o.xwo_classname, o.xwo_number"
        ),
        &[
            document.into(),
            DEFAULT_ANNOTATION_CLASS.into(),
            COMMENT_CLASS.into(),
        ],
    )?;
    rows.iter()
        .map(|r| -> MigrateResult<StoredObject> {
            Ok(StoredObject {
                id: r.get_i64(0)?,
                number: r.get_opt_i64(1)?.unwrap_or(0),
                class_name: r.get_str(2)?.to_string(),
                guid: r.get_opt_str(3)?.map(String::from),
            })
        })
        .collect()
}

type PropertyRow = (i64, String, Value);

/// `(id, name, value)` rows of a `prefix`-named table for the given object ids
fn load_rows(
    db: &dyn Database,
    table: &str,
    prefix: &str,
    value_expr: &str,
    ids: &[Value],
) -> MigrateResult<Vec<PropertyRow>> {
    let rows = db.query_rows(
        &format!(
            "SELECT {prefix}_id, {prefix}_name, {value_expr} FROM {table} WHERE {prefix}_id IN ({})",
            placeholders(ids.len())
        ),
        ids,
    )?;
    rows.iter()
        .map(|r| -> MigrateResult<PropertyRow> {
            Ok((r.get_i64(0)?, r.get_str(1)?.to_string(), r.get(2)?.clone()))
        })
        .collect()
}

fn migrate_document(db: &dyn Database, document: &str) -> MigrateResult<()> {
    let objects = load_objects(db, document)?;
    if objects.is_empty() {
        return Ok(());
    }
    let (renumbered, comment_numbers) = renumber(document, &objects);
    let new_ids: HashMap<i64, i64> = renumbered.iter().map(|r| (r.old_id, r.new_id)).collect();
    let new_id = |old: &i64| -> MigrateResult<Value> {
        new_ids
            .get(old)
            .map(|id| Value::Int(*id))
            .ok_or_else(|| MigrateError::Transform(format!("{document}: no object {old}")))
    };
    let old_ids: Vec<Value> = objects.iter().map(|o| o.id.into()).collect();
    let id_list = placeholders(old_ids.len());

    // Read everything before deleting anything
    let properties = load_rows(db, PROPERTIES, "xwp", "xwp_classtype", &old_ids)?;
    let class_types: HashMap<(i64, String), String> = properties
        .iter()
        .filter_map(|(id, name, value)| match value {
            Value::Text(t) => Some(((*id, name.clone()), t.clone())),
            _ => None,
        })
        .collect();

    let mut values = Vec::with_capacity(VALUE_TABLES.len());
    for table in VALUE_TABLES {
        let p = table.prefix;
        let value_expr = if table.timestamp {
            format!("CAST({p}_value AS VARCHAR(64))")
        } else {
            format!("{p}_value")
        };
        values.push(load_rows(db, table.table, p, &value_expr, &old_ids)?);
    }

    for table in VALUE_TABLES {
        db.execute_params(
            &format!("DELETE FROM {} WHERE {}_id IN ({id_list})", table.table, table.prefix),
            &old_ids,
        )?;
    }
    db.execute_params(&format!("DELETE FROM {PROPERTIES} WHERE xwp_id IN ({id_list})"), &old_ids)?;
    db.execute_params(&format!("DELETE FROM {OBJECTS} WHERE xwo_id IN ({id_list})"), &old_ids)?;

    for object in &renumbered {
        db.execute_params(
            &format!(
                "INSERT INTO {OBJECTS} (xwo_id, xwo_number, xwo_name, xwo_classname, xwo_guid) \
                 VALUES (?, ?, ?, ?, ?)"
            ),
            &[
                object.new_id.into(),
                object.new_number.into(),
                document.into(),
                COMMENT_CLASS.into(),
                object.guid.clone().map_or(Value::Null, Value::Text),
            ],
        )?;
    }

    for (id, name, class_type) in &properties {
        let class_type = match class_type {
            Value::Text(t) => Value::Text(migrated_class_type(name, t).to_string()),
            other => other.clone(),
        };
        db.execute_params(
            &format!("INSERT INTO {PROPERTIES} (xwp_id, xwp_name, xwp_classtype) VALUES (?, ?, ?)"),
            &[new_id(id)?, migrated_name(name).into(), class_type],
        )?;
    }

    for (index, rows) in values.iter().enumerate() {
        for (id, name, value) in rows {
            let is_list = class_types
                .get(&(*id, name.clone()))
                .is_some_and(|t| t == STRING_LIST_TYPE);
            let (target, value) = if is_list && index == LARGE_STRINGS_INDEX {
                let target = if name == "author" {
                    STRINGS_INDEX
                } else {
                    LARGE_STRINGS_INDEX
                };
                (target, first_list_element(value))
            } else if name == "replyto" {
                (index, remap_reply(document, value, &comment_numbers))
            } else {
                (index, value.clone())
            };

            let Some(table) = VALUE_TABLES.get(target) else {
                continue;
            };
            let p = table.prefix;
            let placeholder = if table.timestamp {
                "CAST(? AS TIMESTAMP)"
            } else {
                "?"
            };
            db.execute_params(
                &format!(
                    "INSERT INTO {} ({p}_id, {p}_name, {p}_value) VALUES (?, ?, {placeholder})",
                    table.table
                ),
                &[new_id(id)?, migrated_name(name).into(), value],
            )?;
        }
    }
    Ok(())
}

fn remap_reply(document: &str, value: &Value, comment_numbers: &HashMap<i64, i64>) -> Value {
    match value {
        Value::Int(old) => match comment_numbers.get(old) {
            Some(new) => Value::Int(*new),
            None => {
                log::warn!("[{NAME}] {document}: reply to unknown comment {old} kept as is");
                value.clone()
            }
        },
        other => other.clone(),
    }
}

impl Migration for AnnotationsToComments {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> VersionStamp {
        VersionStamp::new(40001)
    }

    fn description(&self) -> &str {
        "Merge annotation objects into comment objects"
    }

    fn should_execute(&self, ctx: &MigrationContext<'_>, _startup: VersionStamp) -> bool {
        let class = &ctx.config().annotations.class;
        if class != DEFAULT_ANNOTATION_CLASS {
            log::warn!(
                "[{NAME}] Skipping wiki [{}] because it uses a custom annotation class ({class}); \
                 comments and annotations will remain separated",
                ctx.wiki()
            );
            return false;
        }
        true
    }

    fn migrate(&self, ctx: &MigrationContext<'_>) -> MigrateResult<()> {
        let db = ctx.db();
        let documents = documents_to_migrate(db)?;
        log::info!("[{NAME}] {} document(s) to migrate", documents.len());

        for document in &documents {
            log::info!("[{NAME}] Migrating document [{document}]");
            transaction(db, |tx| migrate_document(tx, document)).map_err(|e: MigrateError| {
                MigrateError::Transform(format!("failed to migrate document {document}: {e}"))
            })?;
        }
        Ok(())
    }

    fn transaction_mode(&self) -> wm_migrate::TransactionMode {
        wm_migrate::TransactionMode::PerBatch
    }
}

#[cfg(test)]
#[path = "annotations_test.rs"]
mod tests;
