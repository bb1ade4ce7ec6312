//! Database trait definition

use crate::dialect::ProductInfo;
use crate::error::{DbError, DbResult};
use crate::value::{Row, Value};

/// Column metadata as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Store-reported type name, upper-cased (e.g. `BIGINT`, `VARCHAR`)
    pub data_type: String,
    /// Declared maximum character length, when the store tracks one
    pub max_length: Option<u32>,
    pub nullable: bool,
}

/// Kinds of table constraints the metadata probes understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey,
    ForeignKey,
    Unique,
}

impl ConstraintKind {
    /// Constraint type as spelled by `information_schema`.
    pub fn as_sql(self) -> &'static str {
        match self {
            ConstraintKind::PrimaryKey => "PRIMARY KEY",
            ConstraintKind::ForeignKey => "FOREIGN KEY",
            ConstraintKind::Unique => "UNIQUE",
        }
    }
}

/// Storage access abstraction for Wikimig
///
/// The trait is object safe; the engine works against `&dyn Database`.
/// Statements outside an explicit [`begin`](Database::begin) autocommit.
pub trait Database: Send + Sync {
    /// Execute SQL that modifies data, returns affected rows
    fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute a parameterized statement, returns affected rows
    fn execute_params(&self, sql: &str, params: &[Value]) -> DbResult<usize>;

    /// Execute multiple SQL statements
    fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run a query and collect every row
    fn query_rows(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>>;

    /// Execute query returning row count
    fn query_count(&self, sql: &str) -> DbResult<usize>;

    /// First column of the first row as an integer, `None` when no row or NULL
    fn query_i64(&self, sql: &str, params: &[Value]) -> DbResult<Option<i64>>;

    /// Check if a table or view exists
    fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Metadata of a column, `None` if the table or column does not exist
    fn column_info(&self, table: &str, column: &str) -> DbResult<Option<ColumnInfo>>;

    /// Check if a named index exists on a table
    fn index_exists(&self, table: &str, index: &str) -> DbResult<bool>;

    /// Check if a constraint exists on a table, optionally by name
    fn constraint_exists(
        &self,
        table: &str,
        kind: ConstraintKind,
        name: Option<&str>,
    ) -> DbResult<bool>;

    /// Product metadata used by dialect probing
    fn product_info(&self) -> DbResult<ProductInfo>;

    fn begin(&self) -> DbResult<()>;

    fn commit(&self) -> DbResult<()>;

    fn rollback(&self) -> DbResult<()>;

    /// Open a second connection to the same store.
    ///
    /// Work on the returned handle does not see, and is not rolled back
    /// with, the caller's open transaction.
    fn isolated(&self) -> DbResult<Box<dyn Database>>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

/// Execute `body` within a `BEGIN` / `COMMIT` transaction, rolling back on
/// error.
pub fn transaction<T, E, F>(db: &dyn Database, body: F) -> Result<T, E>
where
    F: FnOnce(&dyn Database) -> Result<T, E>,
    E: From<DbError>,
{
    db.begin()?;

    let result = body(db);

    match &result {
        Ok(_) => {
            if let Err(commit_err) = db.commit() {
                let _ = db.rollback();
                return Err(E::from(DbError::TransactionError(format!(
                    "COMMIT failed: {commit_err}"
                ))));
            }
        }
        Err(_) => {
            if let Err(rollback_err) = db.rollback() {
                log::warn!("ROLLBACK failed after error: {rollback_err}");
            }
        }
    }
    result
}

/// Run `body` against an isolated connection to the same store.
///
/// Each statement autocommits on the isolated connection, so a failing probe
/// query neither poisons the caller's transaction nor the next probe.
pub fn run_isolated<T, E, F>(db: &dyn Database, body: F) -> Result<T, E>
where
    F: FnOnce(&dyn Database) -> Result<T, E>,
    E: From<DbError>,
{
    let conn = db.isolated()?;
    body(conn.as_ref())
}
