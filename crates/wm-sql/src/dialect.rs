//! SQL dialect abstraction

use sqlparser::ast::Statement;
use sqlparser::dialect::{
    Dialect, DuckDbDialect as SqlParserDuckDb, GenericDialect as SqlParserGeneric,
    MsSqlDialect as SqlParserMsSql, MySqlDialect as SqlParserMySql,
    PostgreSqlDialect as SqlParserPostgres,
};
use sqlparser::parser::Parser;
use wm_db::Product;

use crate::error::{SqlError, SqlResult};

/// Trait for SQL dialect implementations
pub trait SqlDialect: Send + Sync {
    /// Get the underlying sqlparser dialect
    fn parser_dialect(&self) -> &dyn Dialect;

    /// Parse SQL into AST statements
    fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        Parser::parse_sql(self.parser_dialect(), sql).map_err(|e| {
            let msg = e.to_string();
            let (line, column) = parse_location_from_error(&msg);
            SqlError::ParseError {
                message: msg,
                line,
                column,
            }
        })
    }

    /// Quote an identifier for this dialect
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Get the dialect name
    fn name(&self) -> &'static str;
}

/// Parse line and column from sqlparser error message.
///
/// `ParserError` carries no structured location, so "Line: N, Column: M" is
/// extracted from the message text.
fn parse_location_from_error(msg: &str) -> (usize, usize) {
    let Some(line_idx) = msg.find("Line: ") else {
        return (0, 0);
    };
    let line_start = line_idx + 6;
    let Some(comma_idx) = msg[line_start..].find(',') else {
        return (0, 0);
    };
    let Ok(line) = msg[line_start..line_start + comma_idx]
        .trim()
        .parse::<usize>()
    else {
        return (0, 0);
    };
    let Some(col_idx) = msg.find("Column: ") else {
        return (0, 0);
    };
    let col_start = col_idx + 8;
    let col_end = msg[col_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| col_start + i)
        .unwrap_or(msg.len());
    let Ok(column) = msg[col_start..col_end].trim().parse::<usize>() else {
        return (0, 0);
    };
    (line, column)
}

/// Declares a `SqlDialect` wrapper around a sqlparser dialect.
macro_rules! define_dialect {
    ($(#[$meta:meta])* $name:ident, $inner:ident, $label:literal $(, quote = $quote:expr)?) => {
        $(#[$meta])*
        pub struct $name {
            dialect: $inner,
        }

        impl $name {
            #[doc = concat!("Create a new ", $label, " dialect")]
            pub fn new() -> Self {
                Self {
                    dialect: $inner {},
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl SqlDialect for $name {
            fn parser_dialect(&self) -> &dyn Dialect {
                &self.dialect
            }

            $(
                fn quote_ident(&self, ident: &str) -> String {
                    let quote: fn(&str) -> String = $quote;
                    quote(ident)
                }
            )?

            fn name(&self) -> &'static str {
                $label
            }
        }
    };
}

define_dialect!(
    /// MySQL and MariaDB SQL dialect
    MySqlDialect,
    SqlParserMySql,
    "mysql",
    quote = |ident| format!("`{}`", ident.replace('`', "``"))
);

define_dialect!(
    /// PostgreSQL SQL dialect
    PostgreSqlDialect,
    SqlParserPostgres,
    "postgresql"
);

define_dialect!(
    /// Microsoft SQL Server dialect
    MsSqlDialect,
    SqlParserMsSql,
    "mssql",
    quote = |ident| format!("[{}]", ident.replace(']', "]]"))
);

define_dialect!(
    /// DuckDB SQL dialect
    DuckDbDialect,
    SqlParserDuckDb,
    "duckdb"
);

define_dialect!(
    /// ANSI-leaning dialect used for Oracle, HSQLDB and unknown products
    GenericDialect,
    SqlParserGeneric,
    "generic"
);

/// Pick the parser dialect for a store product
pub fn for_product(product: Product) -> Box<dyn SqlDialect> {
    match product {
        Product::MySql | Product::MariaDb => Box::new(MySqlDialect::new()),
        Product::PostgreSql => Box::new(PostgreSqlDialect::new()),
        Product::SqlServer => Box::new(MsSqlDialect::new()),
        Product::DuckDb => Box::new(DuckDbDialect::new()),
        Product::Oracle | Product::HsqlDb | Product::Other => Box::new(GenericDialect::new()),
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
