//! Row values exchanged with a store.

use crate::error::{DbError, DbResult};
use std::fmt;

/// A single SQL value, used for query parameters and result cells.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bool(_) => "boolean",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row(pub Vec<Value>);

impl Row {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw cell access.
    pub fn get(&self, index: usize) -> DbResult<&Value> {
        self.0.get(index).ok_or_else(|| DbError::TypeMismatch {
            index,
            expected: "present",
            found: format!("row of {} columns", self.0.len()),
        })
    }

    pub fn get_i64(&self, index: usize) -> DbResult<i64> {
        match self.get(index)? {
            Value::Int(n) => Ok(*n),
            other => Err(mismatch(index, "integer", other)),
        }
    }

    pub fn get_opt_i64(&self, index: usize) -> DbResult<Option<i64>> {
        match self.get(index)? {
            Value::Null => Ok(None),
            Value::Int(n) => Ok(Some(*n)),
            other => Err(mismatch(index, "integer", other)),
        }
    }

    pub fn get_str(&self, index: usize) -> DbResult<&str> {
        match self.get(index)? {
            Value::Text(s) => Ok(s),
            other => Err(mismatch(index, "text", other)),
        }
    }

    pub fn get_opt_str(&self, index: usize) -> DbResult<Option<&str>> {
        match self.get(index)? {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s)),
            other => Err(mismatch(index, "text", other)),
        }
    }
}

fn mismatch(index: usize, expected: &'static str, found: &Value) -> DbError {
    DbError::TypeMismatch {
        index,
        expected,
        found: found.type_name().to_string(),
    }
}
