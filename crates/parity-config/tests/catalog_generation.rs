// crates/parity-config/tests/catalog_generation.rs
// ============================================================================
// Module: Catalog Generation Tests
// Description: Generated `[[queries]]` catalogs from table lists.
// Purpose: Ensure generated catalogs load and validate as written.
// Dependencies: parity-config, parity-core
// ============================================================================
//! ## Overview
//! Generates catalogs, renders them to TOML, and loads them back behind an
//! executor section.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use parity_config::ConfigError;
use parity_config::DEFAULT_SAMPLE_ROWS;
use parity_config::ParityConfig;
use parity_config::TableSpec;
use parity_config::generate_catalog;
use parity_config::render_catalog;
use parity_core::ComparisonStrategy;
use parity_core::QueryCategory;

const EXECUTOR: &str = r#"
[executor]
kind = "sqlite"
source = "data/source.db"
target = "data/target.db"
"#;

fn tables(specs: &[&str]) -> Vec<TableSpec> {
    specs.iter().map(|spec| spec.parse().unwrap()).collect()
}

#[test]
fn generated_catalog_loads_as_a_config() {
    let queries = generate_catalog(&tables(&["orders:id", "main.customers"]), 500).unwrap();
    let ids: Vec<&str> = queries.iter().map(|query| query.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "orders_schema",
            "orders_row_count",
            "orders_content",
            "main_customers_schema",
            "main_customers_row_count",
        ]
    );

    let document = format!("{EXECUTOR}\n{}", render_catalog(&queries).unwrap());
    let config = ParityConfig::from_toml_str(&document).unwrap();
    assert_eq!(config.queries, queries);

    let content = &config.queries[2];
    assert_eq!(content.category, QueryCategory::Content);
    assert_eq!(content.strategy, ComparisonStrategy::RowDiff);
    assert_eq!(content.key_columns, vec!["id".to_string()]);
    assert_eq!(content.sql, "SELECT * FROM \"orders\" ORDER BY \"id\" LIMIT 500");
    assert!(!content.required_for_migration);

    let schema = &config.queries[3];
    assert_eq!(schema.category, QueryCategory::Schema);
    assert!(schema.sql.contains("pragma_table_info('customers', 'main')"));
    assert_eq!(config.queries[4].sql, "SELECT COUNT(*) AS row_count FROM \"main\".\"customers\"");
}

#[test]
fn generation_rejects_unusable_table_lists() {
    assert!(matches!(generate_catalog(&[], DEFAULT_SAMPLE_ROWS), Err(ConfigError::Invalid(_))));
    let duplicated = generate_catalog(&tables(&["orders", "ORDERS:id"]), DEFAULT_SAMPLE_ROWS);
    match duplicated {
        Err(ConfigError::Invalid(message)) => assert!(message.contains("listed twice")),
        other => panic!("expected duplicate table error, got {other:?}"),
    }
    assert!(generate_catalog(&tables(&["orders"]), 0).is_err());
    assert!("orders;--".parse::<TableSpec>().is_err());
}
