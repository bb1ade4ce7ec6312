//! Per-product DDL generation for changelog changes.

use crate::changelog::{Change, ColumnSpec, DataType};
use crate::error::{SchemaError, SchemaResult};
use wm_db::{ColumnInfo, DialectProfile, Product};

/// Renders [`Change`]s into native statements for one product.
pub struct DdlGenerator<'a> {
    profile: &'a DialectProfile,
}

impl<'a> DdlGenerator<'a> {
    pub fn new(profile: &'a DialectProfile) -> Self {
        Self { profile }
    }

    fn product(&self) -> Product {
        self.profile.product
    }

    /// Native spelling of a portable type
    pub fn type_name(&self, data_type: DataType) -> String {
        let product = self.product();
        match data_type {
            DataType::BigInt => match product {
                Product::Oracle => "NUMBER(19,0)".to_string(),
                _ => "BIGINT".to_string(),
            },
            DataType::Integer => match product {
                Product::Oracle => "NUMBER(10,0)".to_string(),
                _ => "INTEGER".to_string(),
            },
            DataType::SmallInt => match product {
                Product::Oracle => "NUMBER(5,0)".to_string(),
                _ => "SMALLINT".to_string(),
            },
            DataType::Boolean => match product {
                Product::MySql | Product::MariaDb | Product::SqlServer => "BIT".to_string(),
                Product::Oracle => "NUMBER(1,0)".to_string(),
                _ => "BOOLEAN".to_string(),
            },
            DataType::Varchar(n) => match product {
                Product::Oracle => format!("VARCHAR2({n} CHAR)"),
                Product::SqlServer => format!("NVARCHAR({n})"),
                _ => format!("VARCHAR({n})"),
            },
            DataType::Text => match product {
                Product::MySql | Product::MariaDb => "LONGTEXT".to_string(),
                Product::Oracle | Product::Other => "CLOB".to_string(),
                Product::PostgreSql => "TEXT".to_string(),
                Product::SqlServer => "NVARCHAR(MAX)".to_string(),
                Product::HsqlDb => "LONGVARCHAR".to_string(),
                Product::DuckDb => "VARCHAR".to_string(),
            },
            DataType::Timestamp => match product {
                Product::MySql | Product::MariaDb => "DATETIME".to_string(),
                Product::SqlServer => "DATETIME2".to_string(),
                _ => "TIMESTAMP".to_string(),
            },
            DataType::Double => match product {
                Product::PostgreSql | Product::Oracle => "DOUBLE PRECISION".to_string(),
                Product::SqlServer => "FLOAT".to_string(),
                _ => "DOUBLE".to_string(),
            },
            DataType::Blob => match product {
                Product::MySql | Product::MariaDb => "LONGBLOB".to_string(),
                Product::PostgreSql => "BYTEA".to_string(),
                Product::SqlServer => "VARBINARY(MAX)".to_string(),
                _ => "BLOB".to_string(),
            },
        }
    }

    fn column_def(&self, column: &ColumnSpec) -> String {
        let mut def = format!("{} {}", column.name, self.type_name(column.data_type));
        if !column.nullable {
            def.push_str(" NOT NULL");
        }
        def
    }

    fn unsupported(&self, change: &Change) -> SchemaError {
        SchemaError::Unsupported {
            change: change.kind().to_string(),
            product: self.product().to_string(),
        }
    }

    /// Native statements for `change`, in execution order.
    ///
    /// `Sql` changes restricted to other products render to nothing.
    pub fn render(&self, change: &Change) -> SchemaResult<Vec<String>> {
        let product = self.product();
        let caps = &self.profile.capabilities;

        let statements = match change {
            Change::CreateTable {
                table_name,
                columns,
            } => {
                let mut defs: Vec<String> = columns.iter().map(|c| self.column_def(c)).collect();
                let pk: Vec<&str> = columns
                    .iter()
                    .filter(|c| c.primary_key)
                    .map(|c| c.name.as_str())
                    .collect();
                if !pk.is_empty() {
                    defs.push(format!("PRIMARY KEY ({})", pk.join(", ")));
                }
                vec![format!("CREATE TABLE {} ({})", table_name, defs.join(", "))]
            }
            Change::DropTable {
                table_name,
                cascade_constraints,
            } => {
                let suffix = match (cascade_constraints, product) {
                    (true, Product::Oracle) => " CASCADE CONSTRAINTS",
                    (true, Product::PostgreSql | Product::HsqlDb | Product::DuckDb) => " CASCADE",
                    _ => "",
                };
                vec![format!("DROP TABLE {table_name}{suffix}")]
            }
            Change::RenameTable {
                old_table_name,
                new_table_name,
            } => match product {
                Product::SqlServer => {
                    vec![format!("EXEC sp_rename '{old_table_name}', '{new_table_name}'")]
                }
                Product::MySql | Product::MariaDb => {
                    vec![format!("RENAME TABLE {old_table_name} TO {new_table_name}")]
                }
                _ => vec![format!(
                    "ALTER TABLE {old_table_name} RENAME TO {new_table_name}"
                )],
            },
            Change::AddColumn {
                table_name,
                columns,
            } => columns
                .iter()
                .map(|c| {
                    let def = self.column_def(c);
                    match product {
                        Product::Oracle => format!("ALTER TABLE {table_name} ADD ({def})"),
                        Product::SqlServer => format!("ALTER TABLE {table_name} ADD {def}"),
                        _ => format!("ALTER TABLE {table_name} ADD COLUMN {def}"),
                    }
                })
                .collect(),
            Change::DropColumn {
                table_name,
                column_name,
            } => vec![format!("ALTER TABLE {table_name} DROP COLUMN {column_name}")],
            Change::RenameColumn {
                table_name,
                old_column_name,
                new_column_name,
                column_data_type,
            } => match (product, column_data_type) {
                (Product::SqlServer, _) => vec![format!(
                    "EXEC sp_rename '{table_name}.{old_column_name}', '{new_column_name}', 'COLUMN'"
                )],
                (Product::MySql | Product::MariaDb, Some(dt)) => vec![format!(
                    "ALTER TABLE {table_name} CHANGE {old_column_name} {new_column_name} {}",
                    self.type_name(*dt)
                )],
                _ => vec![format!(
                    "ALTER TABLE {table_name} RENAME COLUMN {old_column_name} TO {new_column_name}"
                )],
            },
            Change::ModifyDataType {
                table_name,
                column_name,
                new_data_type,
            } => {
                let ty = self.type_name(*new_data_type);
                vec![match product {
                    Product::MySql | Product::MariaDb => {
                        format!("ALTER TABLE {table_name} MODIFY {column_name} {ty}")
                    }
                    Product::Oracle => {
                        format!("ALTER TABLE {table_name} MODIFY ({column_name} {ty})")
                    }
                    Product::SqlServer => {
                        format!("ALTER TABLE {table_name} ALTER COLUMN {column_name} {ty}")
                    }
                    Product::HsqlDb => format!(
                        "ALTER TABLE {table_name} ALTER COLUMN {column_name} SET DATA TYPE {ty}"
                    ),
                    Product::PostgreSql | Product::DuckDb | Product::Other => {
                        format!("ALTER TABLE {table_name} ALTER COLUMN {column_name} TYPE {ty}")
                    }
                }]
            }
            Change::CreateIndex {
                table_name,
                index_name,
                columns,
                unique,
            } => {
                let unique = if *unique { "UNIQUE " } else { "" };
                vec![format!(
                    "CREATE {unique}INDEX {index_name} ON {table_name} ({})",
                    columns.join(", ")
                )]
            }
            Change::DropIndex {
                table_name,
                index_name,
            } => match product {
                Product::MySql | Product::MariaDb | Product::SqlServer => {
                    vec![format!("DROP INDEX {index_name} ON {table_name}")]
                }
                _ => vec![format!("DROP INDEX {index_name}")],
            },
            Change::AddForeignKeyConstraint {
                constraint_name,
                base_table_name,
                base_column_names,
                referenced_table_name,
                referenced_column_names,
                on_delete_cascade,
                on_update_cascade,
            } => {
                if !caps.supports_alter_foreign_key {
                    return Err(self.unsupported(change));
                }
                let mut sql = format!(
                    "ALTER TABLE {base_table_name} ADD CONSTRAINT {constraint_name} FOREIGN KEY ({}) REFERENCES {referenced_table_name} ({})",
                    base_column_names.join(", "),
                    referenced_column_names.join(", ")
                );
                if *on_delete_cascade {
                    sql.push_str(" ON DELETE CASCADE");
                }
                if *on_update_cascade {
                    if caps.supports_cascade_update {
                        sql.push_str(" ON UPDATE CASCADE");
                    } else {
                        log::debug!(
                            "{} has no ON UPDATE CASCADE, dropping it from {constraint_name}",
                            product
                        );
                    }
                }
                vec![sql]
            }
            Change::DropForeignKeyConstraint {
                base_table_name,
                constraint_name,
            } => {
                if !caps.supports_alter_foreign_key {
                    return Err(self.unsupported(change));
                }
                match product {
                    Product::MySql | Product::MariaDb => vec![format!(
                        "ALTER TABLE {base_table_name} DROP FOREIGN KEY {constraint_name}"
                    )],
                    _ => vec![format!(
                        "ALTER TABLE {base_table_name} DROP CONSTRAINT {constraint_name}"
                    )],
                }
            }
            Change::AddPrimaryKey {
                table_name,
                column_names,
                constraint_name,
            } => {
                if !caps.supports_alter_primary_key {
                    return Err(self.unsupported(change));
                }
                let named = constraint_name
                    .as_deref()
                    .map(|n| format!("CONSTRAINT {n} "))
                    .unwrap_or_default();
                vec![format!(
                    "ALTER TABLE {table_name} ADD {named}PRIMARY KEY ({})",
                    column_names.join(", ")
                )]
            }
            Change::DropPrimaryKey {
                table_name,
                constraint_name,
            } => {
                if !caps.supports_alter_primary_key {
                    return Err(self.unsupported(change));
                }
                match (product, constraint_name) {
                    (Product::MySql | Product::MariaDb, _) => {
                        vec![format!("ALTER TABLE {table_name} DROP PRIMARY KEY")]
                    }
                    (_, Some(name)) => {
                        vec![format!("ALTER TABLE {table_name} DROP CONSTRAINT {name}")]
                    }
                    (Product::PostgreSql, None) => {
                        vec![format!("ALTER TABLE {table_name} DROP CONSTRAINT {table_name}_pkey")]
                    }
                    (Product::Oracle | Product::HsqlDb, None) => {
                        vec![format!("ALTER TABLE {table_name} DROP PRIMARY KEY")]
                    }
                    (_, None) => return Err(self.unsupported(change)),
                }
            }
            Change::Sql { sql, dbms } => {
                if !dbms.is_empty() && !dbms.contains(&product) {
                    Vec::new()
                } else {
                    vec![sql.clone()]
                }
            }
        };
        Ok(statements)
    }

    /// Whether a live column has the given portable type.
    ///
    /// Stores that do not track a character length match any declared
    /// `VARCHAR` length.
    pub fn column_matches(&self, info: &ColumnInfo, expected: DataType) -> bool {
        let base = info
            .data_type
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_uppercase();
        match expected {
            DataType::BigInt => match base.as_str() {
                "BIGINT" | "INT8" => true,
                "NUMBER" | "NUMERIC" | "DECIMAL" => info.data_type.contains("19"),
                _ => false,
            },
            DataType::Integer => matches!(base.as_str(), "INTEGER" | "INT" | "INT4"),
            DataType::SmallInt => matches!(base.as_str(), "SMALLINT" | "INT2"),
            DataType::Boolean => matches!(base.as_str(), "BOOLEAN" | "BOOL" | "BIT"),
            DataType::Varchar(n) => {
                matches!(
                    base.as_str(),
                    "VARCHAR" | "VARCHAR2" | "NVARCHAR" | "CHARACTER VARYING"
                ) && info.max_length.map_or(true, |len| len == n)
            }
            DataType::Text => matches!(
                base.as_str(),
                "TEXT" | "LONGTEXT" | "CLOB" | "LONGVARCHAR" | "MEDIUMTEXT"
            ) || (self.product() == Product::DuckDb && base == "VARCHAR"),
            DataType::Timestamp => {
                matches!(base.as_str(), "TIMESTAMP" | "DATETIME" | "DATETIME2")
            }
            DataType::Double => matches!(
                base.as_str(),
                "DOUBLE" | "DOUBLE PRECISION" | "FLOAT" | "FLOAT8"
            ),
            DataType::Blob => matches!(base.as_str(), "BLOB" | "LONGBLOB" | "BYTEA" | "VARBINARY"),
        }
    }
}

#[cfg(test)]
#[path = "generator_test.rs"]
mod tests;
