//! R130200000DynamicRowFormat: older MySQL and MariaDB tables move to the
//! DYNAMIC row format so long indexed columns fit.

use crate::baseline::baseline_schema;
use wm_core::VersionStamp;
use wm_db::Product;
use wm_migrate::{Migration, MigrationContext};
use wm_schema::{Change, ChangeUnit, FailAction, Precondition, Preconditions, SchemaFragment};

const NAME: &str = "R130200000DynamicRowFormat";

const MYSQL_FAMILY: &[Product] = &[Product::MySql, Product::MariaDb];

pub struct DynamicRowFormat;

impl Migration for DynamicRowFormat {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> VersionStamp {
        VersionStamp::new(130200000)
    }

    fn description(&self) -> &str {
        "Switch store tables to the DYNAMIC row format"
    }

    fn should_execute(&self, ctx: &MigrationContext<'_>, _startup: VersionStamp) -> bool {
        ctx.product_is(NAME, MYSQL_FAMILY)
            && ctx.capability(NAME, |c| c.requires_dynamic_row_format)
    }

    fn pre_schema_fragment(&self, _ctx: &MigrationContext<'_>) -> Option<SchemaFragment> {
        let fragment = baseline_schema()
            .tables
            .iter()
            .fold(SchemaFragment::new(), |fragment, table| {
                fragment.unit(
                    ChangeUnit::new(vec![Change::Sql {
                        sql: format!("ALTER TABLE {} ROW_FORMAT=DYNAMIC", table.name),
                        dbms: MYSQL_FAMILY.to_vec(),
                    }])
                    .with_preconditions(Preconditions::new(
                        FailAction::MarkRan,
                        vec![Precondition::TableExists {
                            table_name: table.name.clone(),
                        }],
                    )),
                )
            });
        Some(fragment)
    }
}
