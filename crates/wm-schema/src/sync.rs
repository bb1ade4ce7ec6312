//! Generic, non-destructive schema synchronization.
//!
//! Brings a store up to a declared [`SchemaModel`] by creating missing
//! tables, columns and indexes. Nothing is dropped, renamed or retyped; that
//! is the job of migration fragments.

use crate::changelog::{Change, ColumnSpec};
use crate::error::SchemaResult;
use crate::generator::DdlGenerator;
use wm_db::{Database, DialectProfile};

/// Declared index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDef {
    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        }
    }
}

/// Declared table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub indexes: Vec<IndexDef>,
}

impl TableDef {
    pub fn new(name: &str, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            indexes: Vec::new(),
        }
    }

    pub fn index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// The full declared schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaModel {
    pub tables: Vec<TableDef>,
}

impl SchemaModel {
    pub fn new(tables: Vec<TableDef>) -> Self {
        Self { tables }
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

/// What a sync pass created
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub tables_created: Vec<String>,
    /// `table.column`
    pub columns_added: Vec<String>,
    pub indexes_created: Vec<String>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.tables_created.is_empty()
            && self.columns_added.is_empty()
            && self.indexes_created.is_empty()
    }
}

pub struct SchemaSync<'a> {
    generator: DdlGenerator<'a>,
}

impl<'a> SchemaSync<'a> {
    pub fn new(profile: &'a DialectProfile) -> Self {
        Self {
            generator: DdlGenerator::new(profile),
        }
    }

    fn run(&self, db: &dyn Database, change: &Change) -> SchemaResult<()> {
        for sql in self.generator.render(change)? {
            log::debug!("[sync] {sql}");
            db.execute_batch(&sql)?;
        }
        Ok(())
    }

    /// Create whatever `model` declares that the store lacks.
    pub fn sync(&self, db: &dyn Database, model: &SchemaModel) -> SchemaResult<SyncReport> {
        let mut report = SyncReport::default();

        for table in &model.tables {
            if !db.relation_exists(&table.name)? {
                self.run(
                    db,
                    &Change::CreateTable {
                        table_name: table.name.clone(),
                        columns: table.columns.clone(),
                    },
                )?;
                report.tables_created.push(table.name.clone());
            } else {
                for column in &table.columns {
                    if db.column_info(&table.name, &column.name)?.is_some() {
                        continue;
                    }
                    // Existing rows have no value for the new column
                    let mut added = column.clone();
                    added.nullable = true;
                    added.primary_key = false;
                    self.run(
                        db,
                        &Change::AddColumn {
                            table_name: table.name.clone(),
                            columns: vec![added],
                        },
                    )?;
                    report
                        .columns_added
                        .push(format!("{}.{}", table.name, column.name));
                }
            }

            for index in &table.indexes {
                if db.index_exists(&table.name, &index.name)? {
                    continue;
                }
                self.run(
                    db,
                    &Change::CreateIndex {
                        table_name: table.name.clone(),
                        index_name: index.name.clone(),
                        columns: index.columns.clone(),
                        unique: index.unique,
                    },
                )?;
                report.indexes_created.push(index.name.clone());
            }
        }

        if !report.is_noop() {
            log::info!(
                "Schema sync: {} table(s) created, {} column(s) added, {} index(es) created",
                report.tables_created.len(),
                report.columns_added.len(),
                report.indexes_created.len()
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
