//! Baseline wiki schema created by the generic sync.

use wm_schema::{ColumnSpec, DataType, IndexDef, SchemaModel, TableDef};

/// Width of reference columns (full names, class names, titles)
pub const REFERENCE_WIDTH: u32 = 768;

pub const DOCUMENTS: &str = "xwikidoc";
pub const OBJECTS: &str = "xwikiobjects";
pub const PROPERTIES: &str = "xwikiproperties";
pub const STRINGS: &str = "xwikistrings";
pub const LARGE_STRINGS: &str = "xwikilargestrings";
pub const INTEGERS: &str = "xwikiintegers";
pub const DATES: &str = "xwikidates";
pub const ATTACHMENTS: &str = "xwikiattachment";
pub const LINKS: &str = "xwikilinks";
pub const HISTORY: &str = "xwikircs";

fn reference(name: &str) -> ColumnSpec {
    ColumnSpec::new(name, DataType::Varchar(REFERENCE_WIDTH))
}

fn id(name: &str) -> ColumnSpec {
    ColumnSpec::new(name, DataType::BigInt).not_null()
}

/// Property value table: `(id, name, value)` keyed by object id and name
fn property_table(table: &str, prefix: &str, value: DataType) -> TableDef {
    TableDef::new(
        table,
        vec![
            id(&format!("{prefix}_id")).primary_key(),
            reference(&format!("{prefix}_name")).primary_key(),
            ColumnSpec::new(&format!("{prefix}_value"), value),
        ],
    )
}

/// The schema of an up-to-date wiki store.
pub fn baseline_schema() -> SchemaModel {
    SchemaModel::new(vec![
        TableDef::new(
            DOCUMENTS,
            vec![
                id("xwd_id").primary_key(),
                reference("xwd_fullname").not_null(),
                reference("xwd_name").not_null(),
                reference("xwd_web").not_null(),
                reference("xwd_title"),
                ColumnSpec::new("xwd_language", DataType::Varchar(5)),
                ColumnSpec::new("xwd_default_language", DataType::Varchar(5)),
                ColumnSpec::new("xwd_translation", DataType::Integer),
                ColumnSpec::new("xwd_date", DataType::Timestamp),
                ColumnSpec::new("xwd_creation_date", DataType::Timestamp),
                ColumnSpec::new("xwd_author", DataType::Varchar(255)),
                ColumnSpec::new("xwd_creator", DataType::Varchar(255)),
                ColumnSpec::new("xwd_version", DataType::Varchar(255)),
                ColumnSpec::new("xwd_content", DataType::Text),
                ColumnSpec::new("xwd_class_xml", DataType::Text),
                ColumnSpec::new("xwd_hidden", DataType::Boolean),
            ],
        )
        .index(IndexDef::new("xwd_fullname_idx", &["xwd_fullname"])),
        TableDef::new(
            OBJECTS,
            vec![
                id("xwo_id").primary_key(),
                ColumnSpec::new("xwo_number", DataType::Integer),
                reference("xwo_name").not_null(),
                reference("xwo_classname").not_null(),
                ColumnSpec::new("xwo_guid", DataType::Varchar(255)),
            ],
        )
        .index(IndexDef::new("xwo_name_idx", &["xwo_name"])),
        TableDef::new(
            PROPERTIES,
            vec![
                id("xwp_id").primary_key(),
                reference("xwp_name").primary_key(),
                ColumnSpec::new("xwp_classtype", DataType::Varchar(255)),
            ],
        ),
        property_table(STRINGS, "xws", DataType::Varchar(REFERENCE_WIDTH)),
        property_table(LARGE_STRINGS, "xwl", DataType::Text),
        property_table(INTEGERS, "xwi", DataType::Integer),
        property_table(DATES, "xws", DataType::Timestamp),
        TableDef::new(
            ATTACHMENTS,
            vec![
                id("xwa_id").primary_key(),
                id("xwa_doc_id"),
                reference("xwa_filename").not_null(),
                ColumnSpec::new("xwa_size", DataType::BigInt),
                ColumnSpec::new("xwa_date", DataType::Timestamp),
                ColumnSpec::new("xwa_author", DataType::Varchar(255)),
                ColumnSpec::new("xwa_version", DataType::Varchar(255)),
            ],
        )
        .index(IndexDef::new("xwa_doc_id_idx", &["xwa_doc_id"])),
        TableDef::new(
            LINKS,
            vec![
                id("xwl_doc_id").primary_key(),
                reference("xwl_link").not_null().primary_key(),
                reference("xwl_fullname"),
            ],
        ),
        TableDef::new(
            HISTORY,
            vec![
                id("xwr_docid").primary_key(),
                ColumnSpec::new("xwr_version1", DataType::Integer)
                    .not_null()
                    .primary_key(),
                ColumnSpec::new("xwr_version2", DataType::Integer)
                    .not_null()
                    .primary_key(),
                ColumnSpec::new("xwr_date", DataType::Timestamp),
                ColumnSpec::new("xwr_comment", DataType::Varchar(1023)),
                ColumnSpec::new("xwr_author", DataType::Varchar(255)),
            ],
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use wm_db::{Database, DialectProfile, DuckDbBackend, Product, ProductVersion};
    use wm_schema::SchemaSync;

    #[test]
    fn test_baseline_creates_on_empty_store() {
        let db = DuckDbBackend::in_memory().unwrap();
        let profile = DialectProfile::for_product(Product::DuckDb, ProductVersion::new(1, 1, 0));
        let report = SchemaSync::new(&profile)
            .sync(&db, &baseline_schema())
            .unwrap();

        assert_eq!(report.tables_created.len(), 10);
        assert!(db.index_exists(DOCUMENTS, "xwd_fullname_idx").unwrap());
        let title = db.column_info(DOCUMENTS, "xwd_title").unwrap().unwrap();
        assert_eq!(title.data_type, "VARCHAR");

        let again = SchemaSync::new(&profile)
            .sync(&db, &baseline_schema())
            .unwrap();
        assert!(again.is_noop());
    }

    #[test]
    fn test_property_tables_share_layout() {
        let schema = baseline_schema();
        for table in [STRINGS, LARGE_STRINGS, INTEGERS, DATES] {
            assert_eq!(schema.table(table).unwrap().columns.len(), 3, "{table}");
        }
    }
}
