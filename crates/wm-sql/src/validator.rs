//! Validation of raw SQL carried by schema fragments.
//!
//! Fragments may contain vendor DDL the parser does not model (row formats,
//! storage clauses). Such statements are accepted unverified; everything
//! else must parse.

use crate::dialect::SqlDialect;
use crate::error::{SqlError, SqlResult};
use sqlparser::tokenizer::{Token, Tokenizer};

/// Leading keywords of statements that may legitimately use vendor syntax
const VENDOR_DDL_KEYWORDS: &[&str] = &["ALTER", "CREATE", "DROP", "RENAME", "SET", "EXEC", "BEGIN"];

/// How a single statement fared
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementCheck {
    /// Parsed cleanly
    Parsed,
    /// Vendor DDL the parser rejected; passed through as written
    Unverified { reason: String },
}

/// Outcome of validating one raw SQL block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlValidation {
    /// Statement text paired with its check result, in source order
    pub statements: Vec<(String, StatementCheck)>,
}

impl SqlValidation {
    pub fn unverified_count(&self) -> usize {
        self.statements
            .iter()
            .filter(|(_, c)| matches!(c, StatementCheck::Unverified { .. }))
            .count()
    }
}

/// Split `sql` into statements on top-level semicolons.
///
/// Semicolons inside string literals, quoted identifiers and comments do not
/// split. Blank statements are dropped.
pub fn split_statements(dialect: &dyn SqlDialect, sql: &str) -> SqlResult<Vec<String>> {
    let tokens = Tokenizer::new(dialect.parser_dialect(), sql)
        .tokenize()
        .map_err(|e| SqlError::TokenizeError(e.to_string()))?;

    let mut statements = Vec::new();
    let mut current = String::new();
    for token in tokens {
        match token {
            Token::SemiColon => push_statement(&mut statements, &mut current),
            Token::EOF => {}
            other => current.push_str(&other.to_string()),
        }
    }
    push_statement(&mut statements, &mut current);
    Ok(statements)
}

fn push_statement(out: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    current.clear();
}

/// Validate a raw SQL block against `dialect`.
///
/// Tokenizer failures, empty input and parse failures of statements other
/// than DDL are hard errors.
pub fn validate_sql(dialect: &dyn SqlDialect, sql: &str) -> SqlResult<SqlValidation> {
    let statements = split_statements(dialect, sql)?;
    if statements.is_empty() {
        return Err(SqlError::EmptySql);
    }

    let mut checked = Vec::with_capacity(statements.len());
    for stmt in statements {
        let check = match dialect.parse(&stmt) {
            Ok(_) => StatementCheck::Parsed,
            Err(err) if is_vendor_ddl(&stmt) => {
                log::debug!(
                    "Accepting {} statement the parser rejected: {}",
                    dialect.name(),
                    err
                );
                StatementCheck::Unverified {
                    reason: err.to_string(),
                }
            }
            Err(err) => return Err(err),
        };
        checked.push((stmt, check));
    }

    Ok(SqlValidation {
        statements: checked,
    })
}

fn is_vendor_ddl(stmt: &str) -> bool {
    let Some(first) = stmt.split_whitespace().next() else {
        return false;
    };
    VENDOR_DDL_KEYWORDS
        .iter()
        .any(|kw| first.eq_ignore_ascii_case(kw))
}

#[cfg(test)]
#[path = "validator_test.rs"]
mod tests;
