//! Database products and their capability table.
//!
//! Migrations consult [`Capabilities`] rather than comparing product names,
//! so supporting a new product means adding one row to
//! [`Capabilities::for_product`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw product metadata reported by a store connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInfo {
    /// Product name, e.g. `MySQL`, `PostgreSQL`, `DuckDB`
    pub name: String,
    /// Unparsed product version string
    pub version: String,
    /// Whether the store addresses wikis as catalogs rather than schemas
    pub catalog_naming: bool,
}

/// Relational products the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    MySql,
    MariaDb,
    Oracle,
    PostgreSql,
    #[serde(rename = "mssql")]
    SqlServer,
    HsqlDb,
    DuckDb,
    Other,
}

impl Product {
    /// Identify the product from reported metadata.
    ///
    /// MariaDB servers commonly report themselves as MySQL and only reveal
    /// the fork in the version string (`5.5.5-10.6.12-MariaDB`).
    pub fn identify(name: &str, version: &str) -> Product {
        let name = name.to_ascii_lowercase();
        if name.contains("mariadb") || version.to_ascii_lowercase().contains("mariadb") {
            Product::MariaDb
        } else if name.contains("mysql") {
            Product::MySql
        } else if name.contains("oracle") {
            Product::Oracle
        } else if name.contains("postgres") {
            Product::PostgreSql
        } else if name.contains("microsoft sql server") || name == "mssql" || name == "sqlserver"
        {
            Product::SqlServer
        } else if name.contains("hsql") {
            Product::HsqlDb
        } else if name.contains("duckdb") {
            Product::DuckDb
        } else {
            Product::Other
        }
    }

    /// Short name used in changelog `dbms` filters
    pub fn as_str(self) -> &'static str {
        match self {
            Product::MySql => "mysql",
            Product::MariaDb => "mariadb",
            Product::Oracle => "oracle",
            Product::PostgreSql => "postgresql",
            Product::SqlServer => "mssql",
            Product::HsqlDb => "hsqldb",
            Product::DuckDb => "duckdb",
            Product::Other => "other",
        }
    }

    /// MySQL and its forks share most DDL quirks.
    pub fn is_mysql_family(self) -> bool {
        matches!(self, Product::MySql | Product::MariaDb)
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Product {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(Product::MySql),
            "mariadb" => Ok(Product::MariaDb),
            "oracle" => Ok(Product::Oracle),
            "postgresql" | "postgres" => Ok(Product::PostgreSql),
            "mssql" | "sqlserver" => Ok(Product::SqlServer),
            "hsqldb" => Ok(Product::HsqlDb),
            "duckdb" => Ok(Product::DuckDb),
            "other" => Ok(Product::Other),
            other => Err(format!("unknown database product '{other}'")),
        }
    }
}

/// Parsed `major.minor.patch` of a product version string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ProductVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Extract the first dotted number from a free-form version string.
    ///
    /// For MariaDB's `5.5.5-` compatibility prefix the real version follows
    /// the dash. Missing components default to zero.
    pub fn parse(raw: &str) -> ProductVersion {
        let text = match raw.strip_prefix("5.5.5-") {
            Some(rest) if raw.to_ascii_lowercase().contains("mariadb") => rest,
            _ => raw,
        };

        let Some(start) = text.find(|c: char| c.is_ascii_digit()) else {
            return ProductVersion::default();
        };
        let numeric: String = text[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        let mut parts = numeric
            .split('.')
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<u32>().unwrap_or(0));
        ProductVersion {
            major: parts.next().unwrap_or(0),
            minor: parts.next().unwrap_or(0),
            patch: parts.next().unwrap_or(0),
        }
    }
}

impl fmt::Display for ProductVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Identifier quoting convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// `"name"`
    DoubleQuote,
    /// `` `name` ``
    Backtick,
    /// `[name]`
    Bracket,
}

/// What a product can do, as far as migrations are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// `ON UPDATE CASCADE` on foreign keys
    pub supports_cascade_update: bool,
    /// Longest identifier the product accepts
    pub max_identifier_length: usize,
    /// Tables must be switched to `ROW_FORMAT=DYNAMIC` to hold long indexed
    /// columns
    pub requires_dynamic_row_format: bool,
    /// DDL participates in transactions and can be rolled back
    pub transactional_ddl: bool,
    /// Foreign keys can be added/dropped with `ALTER TABLE`
    pub supports_alter_foreign_key: bool,
    /// Primary keys can be added/dropped with `ALTER TABLE`
    pub supports_alter_primary_key: bool,
    pub quote_style: QuoteStyle,
}

impl Capabilities {
    /// The capability table.
    pub fn for_product(product: Product, version: ProductVersion) -> Capabilities {
        match product {
            Product::MySql => Capabilities {
                supports_cascade_update: true,
                max_identifier_length: 64,
                // DYNAMIC became the default row format in 5.7.9
                requires_dynamic_row_format: version < ProductVersion::new(5, 7, 9),
                transactional_ddl: false,
                supports_alter_foreign_key: true,
                supports_alter_primary_key: true,
                quote_style: QuoteStyle::Backtick,
            },
            Product::MariaDb => Capabilities {
                supports_cascade_update: true,
                max_identifier_length: 64,
                requires_dynamic_row_format: version < ProductVersion::new(10, 2, 2),
                transactional_ddl: false,
                supports_alter_foreign_key: true,
                supports_alter_primary_key: true,
                quote_style: QuoteStyle::Backtick,
            },
            Product::Oracle => Capabilities {
                supports_cascade_update: false,
                max_identifier_length: if version >= ProductVersion::new(12, 2, 0) {
                    128
                } else {
                    30
                },
                requires_dynamic_row_format: false,
                transactional_ddl: false,
                supports_alter_foreign_key: true,
                supports_alter_primary_key: true,
                quote_style: QuoteStyle::DoubleQuote,
            },
            Product::PostgreSql => Capabilities {
                supports_cascade_update: true,
                max_identifier_length: 63,
                requires_dynamic_row_format: false,
                transactional_ddl: true,
                supports_alter_foreign_key: true,
                supports_alter_primary_key: true,
                quote_style: QuoteStyle::DoubleQuote,
            },
            Product::SqlServer => Capabilities {
                supports_cascade_update: true,
                max_identifier_length: 128,
                requires_dynamic_row_format: false,
                transactional_ddl: true,
                supports_alter_foreign_key: true,
                supports_alter_primary_key: true,
                quote_style: QuoteStyle::Bracket,
            },
            Product::HsqlDb => Capabilities {
                supports_cascade_update: true,
                max_identifier_length: 128,
                requires_dynamic_row_format: false,
                transactional_ddl: false,
                supports_alter_foreign_key: true,
                supports_alter_primary_key: true,
                quote_style: QuoteStyle::DoubleQuote,
            },
            Product::DuckDb => Capabilities {
                supports_cascade_update: false,
                max_identifier_length: 255,
                requires_dynamic_row_format: false,
                transactional_ddl: true,
                supports_alter_foreign_key: false,
                supports_alter_primary_key: false,
                quote_style: QuoteStyle::DoubleQuote,
            },
            Product::Other => Capabilities {
                supports_cascade_update: false,
                max_identifier_length: 30,
                requires_dynamic_row_format: false,
                transactional_ddl: false,
                supports_alter_foreign_key: true,
                supports_alter_primary_key: true,
                quote_style: QuoteStyle::DoubleQuote,
            },
        }
    }
}

/// Read-only snapshot of the connected store's product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectProfile {
    pub product: Product,
    pub version: ProductVersion,
    /// Version string exactly as reported
    pub version_string: String,
    pub catalog_naming: bool,
    pub capabilities: Capabilities,
}

impl DialectProfile {
    /// Build a profile from reported product metadata.
    pub fn from_product_info(info: &ProductInfo) -> DialectProfile {
        let product = Product::identify(&info.name, &info.version);
        let version = ProductVersion::parse(&info.version);
        DialectProfile {
            product,
            version,
            version_string: info.version.clone(),
            catalog_naming: info.catalog_naming,
            capabilities: Capabilities::for_product(product, version),
        }
    }

    /// Profile for a known product and version.
    pub fn for_product(product: Product, version: ProductVersion) -> DialectProfile {
        DialectProfile {
            product,
            version,
            version_string: version.to_string(),
            catalog_naming: product.is_mysql_family(),
            capabilities: Capabilities::for_product(product, version),
        }
    }

    /// Whether the product is one of `products`
    pub fn is_any(&self, products: &[Product]) -> bool {
        products.contains(&self.product)
    }

    /// Quote an identifier for this product
    pub fn quote_ident(&self, ident: &str) -> String {
        match self.capabilities.quote_style {
            QuoteStyle::DoubleQuote => format!("\"{}\"", ident.replace('"', "\"\"")),
            QuoteStyle::Backtick => format!("`{}`", ident.replace('`', "``")),
            QuoteStyle::Bracket => format!("[{}]", ident.replace(']', "]]")),
        }
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
