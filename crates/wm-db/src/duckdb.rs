//! DuckDB database backend implementation

use crate::dialect::ProductInfo;
use crate::error::{DbError, DbResult};
use crate::traits::{ColumnInfo, ConstraintKind, Database};
use crate::value::{Row, Value};
use duckdb::types::Value as DuckValue;
use duckdb::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    fn count_where(&self, sql: &str, params: &[Value]) -> DbResult<bool> {
        Ok(self.query_i64(sql, params)?.unwrap_or(0) > 0)
    }
}

fn to_duck(value: &Value) -> DuckValue {
    match value {
        Value::Null => DuckValue::Null,
        Value::Int(n) => DuckValue::BigInt(*n),
        Value::Float(x) => DuckValue::Double(*x),
        Value::Text(s) => DuckValue::Text(s.clone()),
        Value::Bool(b) => DuckValue::Boolean(*b),
    }
}

fn from_duck(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(n) => Value::Int(i64::from(n)),
        DuckValue::SmallInt(n) => Value::Int(i64::from(n)),
        DuckValue::Int(n) => Value::Int(i64::from(n)),
        DuckValue::BigInt(n) => Value::Int(n),
        DuckValue::UTinyInt(n) => Value::Int(i64::from(n)),
        DuckValue::USmallInt(n) => Value::Int(i64::from(n)),
        DuckValue::UInt(n) => Value::Int(i64::from(n)),
        DuckValue::UBigInt(n) => match i64::try_from(n) {
            Ok(n) => Value::Int(n),
            Err(_) => Value::Text(n.to_string()),
        },
        DuckValue::HugeInt(n) => match i64::try_from(n) {
            Ok(n) => Value::Int(n),
            Err(_) => Value::Text(n.to_string()),
        },
        DuckValue::Float(x) => Value::Float(f64::from(x)),
        DuckValue::Double(x) => Value::Float(x),
        DuckValue::Text(s) => Value::Text(s),
        other => Value::Text(format!("{other:?}")),
    }
}

fn split_qualified(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => ("main", name),
    }
}

impl Database for DuckDbBackend {
    fn execute(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock()?;
        conn.execute(sql, [])
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
    }

    fn execute_params(&self, sql: &str, params: &[Value]) -> DbResult<usize> {
        let conn = self.lock()?;
        conn.execute(sql, duckdb::params_from_iter(params.iter().map(to_duck)))
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
    }

    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    fn query_rows(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(DbError::from)?;
        let mut rows = stmt
            .query(duckdb::params_from_iter(params.iter().map(to_duck)))
            .map_err(DbError::from)?;
        let column_count = rows.as_ref().map_or(0, |s| s.column_count());

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(DbError::from)? {
            let mut cells = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let cell: DuckValue = row.get(i).map_err(DbError::from)?;
                cells.push(from_duck(cell));
            }
            out.push(Row(cells));
        }
        Ok(out)
    }

    fn query_count(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM ({})", sql), [], |row| {
                row.get(0)
            })
            .map_err(DbError::from)?;
        Ok(count.max(0) as usize)
    }

    fn query_i64(&self, sql: &str, params: &[Value]) -> DbResult<Option<i64>> {
        let rows = self.query_rows(sql, params)?;
        match rows.first() {
            Some(row) => row.get_opt_i64(0),
            None => Ok(None),
        }
    }

    fn relation_exists(&self, name: &str) -> DbResult<bool> {
        let (schema, table) = split_qualified(name);
        self.count_where(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = ? AND lower(table_name) = lower(?)",
            &[schema.into(), table.into()],
        )
    }

    fn column_info(&self, table: &str, column: &str) -> DbResult<Option<ColumnInfo>> {
        let (schema, table) = split_qualified(table);
        let rows = self.query_rows(
            "SELECT data_type, character_maximum_length, is_nullable \
             FROM information_schema.columns \
             WHERE table_schema = ? AND lower(table_name) = lower(?) \
             AND lower(column_name) = lower(?)",
            &[schema.into(), table.into(), column.into()],
        )?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let max_length = row
            .get_opt_i64(1)?
            .and_then(|n| u32::try_from(n).ok());
        Ok(Some(ColumnInfo {
            data_type: row.get_str(0)?.to_ascii_uppercase(),
            max_length,
            nullable: row.get_str(2)?.eq_ignore_ascii_case("YES"),
        }))
    }

    fn index_exists(&self, table: &str, index: &str) -> DbResult<bool> {
        let (_, table) = split_qualified(table);
        self.count_where(
            "SELECT COUNT(*) FROM duckdb_indexes() \
             WHERE lower(table_name) = lower(?) AND lower(index_name) = lower(?)",
            &[table.into(), index.into()],
        )
    }

    fn constraint_exists(
        &self,
        table: &str,
        kind: ConstraintKind,
        name: Option<&str>,
    ) -> DbResult<bool> {
        let (schema, table) = split_qualified(table);
        match name {
            Some(name) => self.count_where(
                "SELECT COUNT(*) FROM information_schema.table_constraints \
                 WHERE table_schema = ? AND lower(table_name) = lower(?) \
                 AND constraint_type = ? AND lower(constraint_name) = lower(?)",
                &[schema.into(), table.into(), kind.as_sql().into(), name.into()],
            ),
            None => self.count_where(
                "SELECT COUNT(*) FROM information_schema.table_constraints \
                 WHERE table_schema = ? AND lower(table_name) = lower(?) \
                 AND constraint_type = ?",
                &[schema.into(), table.into(), kind.as_sql().into()],
            ),
        }
    }

    fn product_info(&self) -> DbResult<ProductInfo> {
        let rows = self.query_rows("SELECT version()", &[])?;
        let version = match rows.first() {
            Some(row) => row.get_str(0)?.to_string(),
            None => String::new(),
        };
        Ok(ProductInfo {
            name: "DuckDB".to_string(),
            version,
            catalog_naming: false,
        })
    }

    fn begin(&self) -> DbResult<()> {
        self.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))
    }

    fn commit(&self) -> DbResult<()> {
        self.execute_batch("COMMIT")
            .map_err(|e| DbError::TransactionError(format!("COMMIT failed: {e}")))
    }

    fn rollback(&self) -> DbResult<()> {
        self.execute_batch("ROLLBACK")
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {e}")))
    }

    fn isolated(&self) -> DbResult<Box<dyn Database>> {
        let conn = self.lock()?;
        let clone = conn
            .try_clone()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Box::new(Self::from_connection(clone)))
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
