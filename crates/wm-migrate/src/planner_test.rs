use super::*;
use crate::catalog::Catalog;
use crate::test_support::config;
use std::path::PathBuf;
use wm_core::{Config, WikiId};
use wm_db::{Database, DialectProfile, DuckDbBackend, Product, ProductVersion};

/// Migration gated on the startup stamp, with optional fragments
struct Gated {
    name: &'static str,
    version: u64,
    only_below: Option<u64>,
    main_only: bool,
    pre: Option<&'static str>,
    schema: Option<&'static str>,
}

impl Gated {
    fn new(name: &'static str, version: u64) -> Self {
        Self {
            name,
            version,
            only_below: None,
            main_only: false,
            pre: None,
            schema: None,
        }
    }
}

impl Migration for Gated {
    fn name(&self) -> &str {
        self.name
    }

    fn version(&self) -> VersionStamp {
        VersionStamp::new(self.version)
    }

    fn description(&self) -> &str {
        "gated fixture"
    }

    fn should_execute(&self, ctx: &MigrationContext<'_>, startup: VersionStamp) -> bool {
        if self.main_only && !ctx.is_main_wiki() {
            return false;
        }
        self.only_below.map_or(true, |limit| startup.get() < limit)
    }

    fn pre_schema_fragment(&self, _ctx: &MigrationContext<'_>) -> Option<SchemaFragment> {
        self.pre.map(SchemaFragment::sql)
    }

    fn schema_fragment(&self, _ctx: &MigrationContext<'_>) -> Option<SchemaFragment> {
        self.schema.map(SchemaFragment::sql)
    }
}

fn ctx<'a>(db: &'a dyn Database, config: &'a Config) -> MigrationContext<'a> {
    wiki_ctx(db, config, "xwiki", true)
}

fn wiki_ctx<'a>(
    db: &'a dyn Database,
    config: &'a Config,
    wiki: &str,
    is_main: bool,
) -> MigrationContext<'a> {
    MigrationContext::new(
        db,
        Ok(DialectProfile::for_product(
            Product::DuckDb,
            ProductVersion::new(1, 1, 0),
        )),
        WikiId::new(wiki),
        is_main,
        config,
        PathBuf::from("target/progress"),
    )
}

fn catalog() -> Catalog {
    let mut m20 = Gated::new("M20", 20);
    m20.only_below = Some(15);
    Catalog::builder()
        .register(Gated::new("M10", 10))
        .register(m20)
        .register(Gated::new("M30", 30))
        .build()
        .unwrap()
}

#[test]
fn test_plan_from_legacy() {
    let db = DuckDbBackend::in_memory().unwrap();
    let config = config("");
    let catalog = catalog();
    let plan = plan(&catalog, VersionStamp::LEGACY, &ctx(&db, &config));
    assert_eq!(plan.names(), vec!["M10", "M20", "M30"]);
    assert_eq!(plan.startup(), VersionStamp::LEGACY);
}

#[test]
fn test_plan_skips_applied_and_gated() {
    let db = DuckDbBackend::in_memory().unwrap();
    let config = config("");
    let catalog = catalog();
    let plan = plan(&catalog, VersionStamp::new(15), &ctx(&db, &config));
    assert_eq!(plan.names(), vec!["M30"]);
    assert_eq!(plan.versions(), vec![VersionStamp::new(30)]);
}

#[test]
fn test_plan_gate_on_startup_stamp() {
    let db = DuckDbBackend::in_memory().unwrap();
    let config = config("");
    let catalog = catalog();
    let ctx = ctx(&db, &config);

    let from_five = plan(&catalog, VersionStamp::new(5), &ctx);
    assert_eq!(from_five.names(), vec!["M10", "M20", "M30"]);

    let from_sixteen = plan(&catalog, VersionStamp::new(16), &ctx);
    assert_eq!(from_sixteen.names(), vec!["M30"]);
}

#[test]
fn test_plan_main_wiki_only_migration() {
    let db = DuckDbBackend::in_memory().unwrap();
    let config = config("");
    let mut main_only = Gated::new("M20", 20);
    main_only.main_only = true;
    let catalog = Catalog::builder()
        .register(Gated::new("M10", 10))
        .register(main_only)
        .build()
        .unwrap();

    let main = plan(&catalog, VersionStamp::LEGACY, &wiki_ctx(&db, &config, "xwiki", true));
    assert_eq!(main.names(), vec!["M10", "M20"]);

    let sub = plan(&catalog, VersionStamp::LEGACY, &wiki_ctx(&db, &config, "sub", false));
    assert_eq!(sub.names(), vec!["M10"]);
}

#[test]
fn test_plan_empty_when_current() {
    let db = DuckDbBackend::in_memory().unwrap();
    let config = config("");
    let catalog = catalog();
    assert!(plan(&catalog, VersionStamp::new(30), &ctx(&db, &config)).is_empty());
}

#[test]
fn test_plan_honors_ignored_list() {
    let db = DuckDbBackend::in_memory().unwrap();
    let config = config("migration:\n  ignored: [M10]\n");
    let catalog = catalog();
    let plan = plan(&catalog, VersionStamp::LEGACY, &ctx(&db, &config));
    assert_eq!(plan.names(), vec!["M20", "M30"]);
}

#[test]
fn test_render_ids_and_fragment_context() {
    let db = DuckDbBackend::in_memory().unwrap();
    let config = config("migration:\n  author: tester\n");
    let mut a = Gated::new("A", 10);
    a.pre = Some("CREATE TABLE a_pre (id BIGINT)");
    a.schema = Some("CREATE TABLE a_post (id BIGINT)");
    let mut b = Gated::new("B", 20);
    b.pre = Some("CREATE TABLE b_pre (id BIGINT)");
    let catalog = Catalog::builder().register(b).register(a).build().unwrap();

    let ctx = ctx(&db, &config);
    let plan = plan(&catalog, VersionStamp::LEGACY, &ctx);
    let pre = render_pre_schema(&plan, &ctx).unwrap();
    let post = render_schema(&plan, &ctx).unwrap();

    let pre_ids: Vec<&str> = pre.change_sets.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(pre_ids, vec!["A-pre-000", "B-pre-000"]);
    assert_eq!(pre.change_sets[0].author, "tester");
    assert_eq!(pre.change_sets[1].fragment(), "B");

    assert_eq!(post.len(), 1);
    assert_eq!(post.change_sets[0].id, "A-000");
}

#[test]
fn test_render_rejects_unparseable_dml() {
    let db = DuckDbBackend::in_memory().unwrap();
    let config = config("");
    let mut broken = Gated::new("Broken", 10);
    broken.schema = Some("UPDATE xwikidoc SET = 1");
    let catalog = Catalog::builder().register(broken).build().unwrap();

    let ctx = ctx(&db, &config);
    let plan = plan(&catalog, VersionStamp::LEGACY, &ctx);
    let err = render_schema(&plan, &ctx).unwrap_err();
    assert!(matches!(err, MigrateError::InvalidFragmentSql { ref name, .. } if name == "Broken"));
}

#[test]
fn test_render_skips_sql_for_other_products() {
    let db = DuckDbBackend::in_memory().unwrap();
    let config = config("");
    struct MySqlOnly;
    impl Migration for MySqlOnly {
        fn name(&self) -> &str {
            "MySqlOnly"
        }
        fn version(&self) -> VersionStamp {
            VersionStamp::new(5)
        }
        fn description(&self) -> &str {
            "mysql only"
        }
        fn schema_fragment(&self, _ctx: &MigrationContext<'_>) -> Option<SchemaFragment> {
            Some(SchemaFragment::new().unit(wm_schema::ChangeUnit::new(vec![Change::Sql {
                sql: "this is not sql at all (".to_string(),
                dbms: vec![Product::MySql],
            }])))
        }
    }
    let catalog = Catalog::builder().register(MySqlOnly).build().unwrap();

    let ctx = ctx(&db, &config);
    let plan = plan(&catalog, VersionStamp::LEGACY, &ctx);
    assert_eq!(render_schema(&plan, &ctx).unwrap().len(), 1);
}
