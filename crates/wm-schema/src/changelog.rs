//! Changelog model: change sets, preconditions and changes.
//!
//! The YAML form follows the familiar `databaseChangeLog` layout so rendered
//! changelogs can be read by people who know that format.

use crate::error::{SchemaError, SchemaResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use wm_db::Product;

/// Portable column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    BigInt,
    Integer,
    SmallInt,
    Boolean,
    Varchar(u32),
    /// Unbounded character data
    Text,
    Timestamp,
    Double,
    Blob,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::BigInt => f.write_str("BIGINT"),
            DataType::Integer => f.write_str("INTEGER"),
            DataType::SmallInt => f.write_str("SMALLINT"),
            DataType::Boolean => f.write_str("BOOLEAN"),
            DataType::Varchar(n) => write!(f, "VARCHAR({n})"),
            DataType::Text => f.write_str("TEXT"),
            DataType::Timestamp => f.write_str("TIMESTAMP"),
            DataType::Double => f.write_str("DOUBLE"),
            DataType::Blob => f.write_str("BLOB"),
        }
    }
}

impl FromStr for DataType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if let Some(rest) = upper.strip_prefix("VARCHAR(") {
            let len = rest
                .strip_suffix(')')
                .and_then(|n| n.trim().parse::<u32>().ok())
                .ok_or_else(|| SchemaError::InvalidDataType(s.to_string()))?;
            return Ok(DataType::Varchar(len));
        }
        match upper.as_str() {
            "BIGINT" => Ok(DataType::BigInt),
            "INTEGER" | "INT" => Ok(DataType::Integer),
            "SMALLINT" => Ok(DataType::SmallInt),
            "BOOLEAN" | "BOOL" => Ok(DataType::Boolean),
            "TEXT" | "CLOB" => Ok(DataType::Text),
            "TIMESTAMP" | "DATETIME" => Ok(DataType::Timestamp),
            "DOUBLE" => Ok(DataType::Double),
            "BLOB" => Ok(DataType::Blob),
            _ => Err(SchemaError::InvalidDataType(s.to_string())),
        }
    }
}

impl TryFrom<String> for DataType {
    type Error = SchemaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DataType> for String {
    fn from(dt: DataType) -> Self {
        dt.to_string()
    }
}

/// A column in `createTable` / `addColumn`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary_key: bool,
}

impl ColumnSpec {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            nullable: true,
            primary_key: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark as (part of) the primary key; implies NOT NULL
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }
}

fn default_true() -> bool {
    true
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// What to do when a precondition fails or cannot be evaluated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailAction {
    /// Abort applying the fragment
    #[default]
    Halt,
    /// Skip the change set without recording it; it is evaluated again next time
    Continue,
    /// Skip the change set and record it as ran
    MarkRan,
    /// Log a warning and apply the change set anyway
    Warn,
}

/// A single precondition check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Precondition {
    /// Connected product is one of the listed products
    Dbms {
        #[serde(rename = "type")]
        products: Vec<Product>,
    },
    #[serde(rename_all = "camelCase")]
    TableExists { table_name: String },
    #[serde(rename_all = "camelCase")]
    ColumnExists {
        table_name: String,
        column_name: String,
    },
    /// Column exists and has the given type
    #[serde(rename_all = "camelCase")]
    ColumnType {
        table_name: String,
        column_name: String,
        #[serde(rename = "type")]
        data_type: DataType,
    },
    #[serde(rename_all = "camelCase")]
    IndexExists {
        table_name: String,
        index_name: String,
    },
    #[serde(rename_all = "camelCase")]
    ForeignKeyExists {
        table_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        foreign_key_name: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    PrimaryKeyExists {
        table_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        primary_key_name: Option<String>,
    },
    /// Integer result of a query equals `expected_result`
    #[serde(rename_all = "camelCase")]
    SqlCheck { sql: String, expected_result: i64 },
    /// None of the nested conditions hold
    Not(Vec<Precondition>),
    And(Vec<Precondition>),
    Or(Vec<Precondition>),
}

/// Preconditions of a change set; all conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Preconditions {
    #[serde(default)]
    pub on_fail: FailAction,
    #[serde(default)]
    pub on_error: FailAction,
    pub conditions: Vec<Precondition>,
}

impl Preconditions {
    pub fn new(on_fail: FailAction, conditions: Vec<Precondition>) -> Self {
        Self {
            on_fail,
            on_error: FailAction::Halt,
            conditions,
        }
    }

    pub fn on_error(mut self, action: FailAction) -> Self {
        self.on_error = action;
        self
    }
}

/// One schema change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Change {
    #[serde(rename_all = "camelCase")]
    AddColumn {
        table_name: String,
        columns: Vec<ColumnSpec>,
    },
    #[serde(rename_all = "camelCase")]
    DropColumn {
        table_name: String,
        column_name: String,
    },
    #[serde(rename_all = "camelCase")]
    RenameColumn {
        table_name: String,
        old_column_name: String,
        new_column_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column_data_type: Option<DataType>,
    },
    #[serde(rename_all = "camelCase")]
    ModifyDataType {
        table_name: String,
        column_name: String,
        new_data_type: DataType,
    },
    #[serde(rename_all = "camelCase")]
    CreateTable {
        table_name: String,
        columns: Vec<ColumnSpec>,
    },
    #[serde(rename_all = "camelCase")]
    DropTable {
        table_name: String,
        #[serde(default, skip_serializing_if = "is_false")]
        cascade_constraints: bool,
    },
    #[serde(rename_all = "camelCase")]
    RenameTable {
        old_table_name: String,
        new_table_name: String,
    },
    #[serde(rename_all = "camelCase")]
    CreateIndex {
        table_name: String,
        index_name: String,
        columns: Vec<String>,
        #[serde(default, skip_serializing_if = "is_false")]
        unique: bool,
    },
    #[serde(rename_all = "camelCase")]
    DropIndex {
        table_name: String,
        index_name: String,
    },
    #[serde(rename_all = "camelCase")]
    AddForeignKeyConstraint {
        constraint_name: String,
        base_table_name: String,
        base_column_names: Vec<String>,
        referenced_table_name: String,
        referenced_column_names: Vec<String>,
        #[serde(default, skip_serializing_if = "is_false")]
        on_delete_cascade: bool,
        #[serde(default, skip_serializing_if = "is_false")]
        on_update_cascade: bool,
    },
    #[serde(rename_all = "camelCase")]
    DropForeignKeyConstraint {
        base_table_name: String,
        constraint_name: String,
    },
    #[serde(rename_all = "camelCase")]
    AddPrimaryKey {
        table_name: String,
        column_names: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        constraint_name: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    DropPrimaryKey {
        table_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        constraint_name: Option<String>,
    },
    /// Raw native SQL, optionally restricted to some products
    Sql {
        sql: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        dbms: Vec<Product>,
    },
}

impl Change {
    /// Change kind as spelled in the changelog
    pub fn kind(&self) -> &'static str {
        match self {
            Change::AddColumn { .. } => "addColumn",
            Change::DropColumn { .. } => "dropColumn",
            Change::RenameColumn { .. } => "renameColumn",
            Change::ModifyDataType { .. } => "modifyDataType",
            Change::CreateTable { .. } => "createTable",
            Change::DropTable { .. } => "dropTable",
            Change::RenameTable { .. } => "renameTable",
            Change::CreateIndex { .. } => "createIndex",
            Change::DropIndex { .. } => "dropIndex",
            Change::AddForeignKeyConstraint { .. } => "addForeignKeyConstraint",
            Change::DropForeignKeyConstraint { .. } => "dropForeignKeyConstraint",
            Change::AddPrimaryKey { .. } => "addPrimaryKey",
            Change::DropPrimaryKey { .. } => "dropPrimaryKey",
            Change::Sql { .. } => "sql",
        }
    }

    /// Raw SQL change for every product
    pub fn sql(sql: impl Into<String>) -> Self {
        Change::Sql {
            sql: sql.into(),
            dbms: Vec::new(),
        }
    }
}

/// A change set as it appears in a changelog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangeSet {
    pub id: String,
    pub author: String,
    /// Fragment the change set was rendered from; failures are isolated per
    /// fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<Preconditions>,
    pub changes: Vec<Change>,
}

impl ChangeSet {
    /// Checksum over everything that affects what the change set does
    pub fn checksum(&self) -> SchemaResult<String> {
        let payload = serde_json::to_string(&(&self.preconditions, &self.changes))?;
        Ok(wm_core::compute_checksum(&payload))
    }

    /// Fragment key used for failure isolation
    pub fn fragment(&self) -> &str {
        self.context.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeSetEntry {
    change_set: ChangeSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ChangelogDocument {
    #[serde(rename = "databaseChangeLog")]
    entries: Vec<ChangeSetEntry>,
}

/// An ordered list of change sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changelog {
    pub change_sets: Vec<ChangeSet>,
}

impl Changelog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change_set: ChangeSet) {
        self.change_sets.push(change_set);
    }

    pub fn is_empty(&self) -> bool {
        self.change_sets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.change_sets.len()
    }

    /// Append another changelog after this one
    pub fn extend(&mut self, other: Changelog) {
        self.change_sets.extend(other.change_sets);
    }

    pub fn to_yaml(&self) -> SchemaResult<String> {
        let doc = ChangelogDocument {
            entries: self
                .change_sets
                .iter()
                .cloned()
                .map(|change_set| ChangeSetEntry { change_set })
                .collect(),
        };
        Ok(serde_yaml::to_string(&doc)?)
    }

    pub fn from_yaml(yaml: &str) -> SchemaResult<Self> {
        let doc: ChangelogDocument = serde_yaml::from_str(yaml)?;
        Ok(Self {
            change_sets: doc.entries.into_iter().map(|e| e.change_set).collect(),
        })
    }
}

/// A change set before it is given an id and author
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeUnit {
    pub comment: Option<String>,
    pub preconditions: Option<Preconditions>,
    pub changes: Vec<Change>,
}

impl ChangeUnit {
    pub fn new(changes: Vec<Change>) -> Self {
        Self {
            comment: None,
            preconditions: None,
            changes,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_preconditions(mut self, preconditions: Preconditions) -> Self {
        self.preconditions = Some(preconditions);
        self
    }

    /// Turn into a change set owned by `fragment`
    pub fn into_change_set(self, id: String, author: &str, fragment: &str) -> ChangeSet {
        ChangeSet {
            id,
            author: author.to_string(),
            context: Some(fragment.to_string()),
            comment: self.comment,
            preconditions: self.preconditions,
            changes: self.changes,
        }
    }
}

/// A migration's change script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaFragment {
    pub units: Vec<ChangeUnit>,
}

impl SchemaFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fragment with a single raw SQL unit
    pub fn sql(sql: impl Into<String>) -> Self {
        Self::new().unit(ChangeUnit::new(vec![Change::sql(sql)]))
    }

    pub fn unit(mut self, unit: ChangeUnit) -> Self {
        self.units.push(unit);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Raw SQL carried by the fragment, in order
    pub fn raw_sql(&self) -> impl Iterator<Item = &str> {
        self.units
            .iter()
            .flat_map(|u| u.changes.iter())
            .filter_map(|c| match c {
                Change::Sql { sql, .. } => Some(sql.as_str()),
                _ => None,
            })
    }
}

#[cfg(test)]
#[path = "changelog_test.rs"]
mod tests;
