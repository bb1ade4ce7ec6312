//! R40000XWIKI6990: document and object ids become stable hashes.

use super::table_present;
use crate::baseline::{
    ATTACHMENTS, DATES, DOCUMENTS, HISTORY, INTEGERS, LARGE_STRINGS, LINKS, OBJECTS, PROPERTIES,
    STRINGS,
};
use crate::reference::{document_id, object_id};
use std::collections::BTreeMap;
use wm_core::VersionStamp;
use wm_db::{transaction, Database, Product};
use wm_migrate::{MigrateError, MigrateResult, Migration, MigrationContext, TransactionMode};
use wm_schema::{
    Change, ChangeUnit, DataType, FailAction, Precondition, Preconditions, SchemaFragment,
};

const NAME: &str = "R40000XWIKI6990";

/// Columns holding a document id; the owning table comes last
const DOCUMENT_ID_COLUMNS: &[(&str, &str)] = &[
    (ATTACHMENTS, "xwa_doc_id"),
    (LINKS, "xwl_doc_id"),
    (HISTORY, "xwr_docid"),
    (DOCUMENTS, "xwd_id"),
];

/// Columns holding an object id; the owning table comes last
const OBJECT_ID_COLUMNS: &[(&str, &str)] = &[
    (PROPERTIES, "xwp_id"),
    (STRINGS, "xws_id"),
    (LARGE_STRINGS, "xwl_id"),
    (INTEGERS, "xwi_id"),
    (DATES, "xws_id"),
    (OBJECTS, "xwo_id"),
];

/// Identifier columns widened to BIGINT before conversion
const WIDENED_COLUMNS: &[(&str, &str)] = &[
    (OBJECTS, "xwo_id"),
    (PROPERTIES, "xwp_id"),
    (STRINGS, "xws_id"),
    (LARGE_STRINGS, "xwl_id"),
    (INTEGERS, "xwi_id"),
    (DATES, "xws_id"),
];

pub struct IdHashConversion;

/// Order `old -> new` id conversions so no update hits an id still in use.
///
/// An entry is ready once its target is no longer the source of a pending
/// entry. Entries left when a full pass makes no progress form a cycle.
pub fn order_conversions(map: &BTreeMap<i64, i64>) -> MigrateResult<Vec<(i64, i64)>> {
    let mut pending = map.clone();
    let mut ordered = Vec::with_capacity(map.len());

    while !pending.is_empty() {
        let ready: Vec<(i64, i64)> = pending
            .iter()
            .filter(|(_, new)| !pending.contains_key(*new))
            .map(|(old, new)| (*old, *new))
            .collect();
        if ready.is_empty() {
            let ids: Vec<String> = pending.keys().map(i64::to_string).collect();
            return Err(MigrateError::Transform(format!(
                "unresolved circular reference between ids {}",
                ids.join(", ")
            )));
        }
        for (old, new) in ready {
            pending.remove(&old);
            ordered.push((old, new));
        }
    }
    Ok(ordered)
}

fn document_conversions(db: &dyn Database) -> MigrateResult<BTreeMap<i64, i64>> {
    let mut map = BTreeMap::new();
    for row in db.query_rows(
        &format!("SELECT xwd_id, xwd_fullname, xwd_language FROM {DOCUMENTS}"),
        &[],
    )? {
        let old = row.get_i64(0)?;
        let new = document_id(row.get_str(1)?, row.get_opt_str(2)?.unwrap_or(""));
        if old != new {
            map.insert(old, new);
        }
    }
    Ok(map)
}

fn object_conversions(db: &dyn Database) -> MigrateResult<BTreeMap<i64, i64>> {
    let mut map = BTreeMap::new();
    for row in db.query_rows(
        &format!("SELECT xwo_id, xwo_name, xwo_classname, xwo_number FROM {OBJECTS}"),
        &[],
    )? {
        let old = row.get_i64(0)?;
        let new = object_id(row.get_str(1)?, row.get_str(2)?, row.get_i64(3)?);
        if old != new {
            map.insert(old, new);
        }
    }
    Ok(map)
}

/// Apply `map` to every present column, one transaction per id.
fn convert(
    db: &dyn Database,
    kind: &str,
    map: &BTreeMap<i64, i64>,
    columns: &[(&str, &str)],
) -> MigrateResult<()> {
    if map.is_empty() {
        log::info!("[{NAME}] No {kind} ids to convert, skipping");
        return Ok(());
    }

    let mut present = Vec::new();
    for (table, column) in columns {
        if table_present(db, table)? {
            present.push(format!("UPDATE {table} SET {column} = ? WHERE {column} = ?"));
        }
    }
    let ordered = order_conversions(map)?;
    log::info!(
        "[{NAME}] Converting {} {kind} id(s) in {} table(s)",
        ordered.len(),
        present.len()
    );

    for (old, new) in ordered {
        transaction(db, |tx| {
            for sql in &present {
                tx.execute_params(sql, &[new.into(), old.into()])?;
            }
            Ok::<_, MigrateError>(())
        })?;
    }
    log::info!("[{NAME}] All {kind} ids converted");
    Ok(())
}

impl Migration for IdHashConversion {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> VersionStamp {
        VersionStamp::new(40000)
    }

    fn description(&self) -> &str {
        "Convert document and object ids to the stable hash of their local uid"
    }

    fn schema_fragment(&self, _ctx: &MigrationContext<'_>) -> Option<SchemaFragment> {
        let mut fragment = SchemaFragment::new();
        for (table, column) in WIDENED_COLUMNS {
            let preconditions = Preconditions::new(
                FailAction::MarkRan,
                vec![
                    Precondition::TableExists {
                        table_name: table.to_string(),
                    },
                    Precondition::Not(vec![Precondition::Dbms {
                        products: vec![Product::Oracle],
                    }]),
                    Precondition::Not(vec![Precondition::ColumnType {
                        table_name: table.to_string(),
                        column_name: column.to_string(),
                        data_type: DataType::BigInt,
                    }]),
                ],
            );
            fragment = fragment.unit(
                ChangeUnit::new(vec![Change::ModifyDataType {
                    table_name: table.to_string(),
                    column_name: column.to_string(),
                    new_data_type: DataType::BigInt,
                }])
                .with_comment(format!(
                    "Upgrade identifier [{column}] from table [{table}] to BIGINT type"
                ))
                .with_preconditions(preconditions),
            );
        }
        Some(fragment)
    }

    fn migrate(&self, ctx: &MigrationContext<'_>) -> MigrateResult<()> {
        let db = ctx.db();
        let documents = document_conversions(db)?;
        log::info!("[{NAME}] Retrieved {} document id(s) to convert", documents.len());
        let objects = object_conversions(db)?;
        log::info!("[{NAME}] Retrieved {} object id(s) to convert", objects.len());

        convert(db, "document", &documents, DOCUMENT_ID_COLUMNS)?;
        convert(db, "object", &objects, OBJECT_ID_COLUMNS)
    }

    fn transaction_mode(&self) -> TransactionMode {
        TransactionMode::PerBatch
    }
}

#[cfg(test)]
#[path = "id_hash_test.rs"]
mod tests;
