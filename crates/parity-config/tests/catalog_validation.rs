// crates/parity-config/tests/catalog_validation.rs
// ============================================================================
// Module: Catalog Validation Tests
// Description: Section and query catalog validation for parity.toml.
// Purpose: Ensure invalid catalogs fail before any engine is built.
// Dependencies: parity-config, parity-core
// ============================================================================
//! ## Overview
//! Builds configuration documents from fragments and checks the violations
//! each one reports.

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

use std::path::PathBuf;

use parity_config::ConfigError;
use parity_config::LogSinkKind;
use parity_config::ParityConfig;
use parity_core::ComparisonStrategy;
use parity_core::Priority;
use parity_core::QueryId;

const EXECUTOR: &str = r#"
[executor]
kind = "sqlite"
source = "data/source.db"
target = "data/target.db"
"#;

fn document(sections: &str, queries: &str) -> String {
    format!("{sections}\n{EXECUTOR}\n{queries}")
}

fn query(id: &str, extra: &str) -> String {
    format!(
        "[[queries]]\nid = \"{id}\"\ncategory = \"content\"\nsql = \"SELECT * FROM {id}\"\n\
         strategy = \"exact_match\"\n{extra}\n"
    )
}

fn invalid_message(content: &str) -> String {
    match ParityConfig::from_toml_str(content) {
        Err(ConfigError::Invalid(message)) => message,
        other => panic!("expected invalid config, got {other:?}"),
    }
}

#[test]
fn full_document_converts_into_engine_inputs() {
    let content = document(
        r#"
[engine]
max_commit_attempts = 5
backoff_base_ms = 10
backoff_max_ms = 40
sample_differences_limit = 25
holder = "ci-runner"

[store]
path = "state/parity.db"
journal_mode = "delete"
lock_ttl_ms = 400000
max_versions = 4

[output]
dir = "out"
artifacts = false

[logging]
sink = "file"
path = "out/audit.jsonl"
"#,
        &format!(
            "{}{}",
            query("schema", "priority = \"critical\""),
            r#"[[queries]]
id = "orders_rows"
name = "Orders row diff"
category = "data_content"
sql = "WITH o AS (SELECT * FROM orders) SELECT * FROM o"
strategy = "reladiff"
key_columns = ["order_id"]
ignore_columns = ["loaded_at"]
sample_size = 500
full_validation = false
timeout_ms = 2000
max_attempts = 2
dependencies = ["schema"]
required_for_migration = false
"#
        ),
    );
    let config = ParityConfig::from_toml_str(&content).unwrap();

    let engine = config.engine_config();
    assert_eq!(engine.max_commit_attempts, 5);
    assert_eq!(engine.retry.base_delay_ms, 10);
    assert_eq!(engine.retry.max_delay_ms, 40);
    assert_eq!(engine.lock_ttl_ms, 400_000);
    assert_eq!(engine.sample_differences_limit, 25);
    assert_eq!(engine.holder, "ci-runner");

    let store = config.store_config();
    assert_eq!(store.path, PathBuf::from("state/parity.db"));
    assert_eq!(store.max_versions, Some(4));
    assert_eq!(config.output.ledger_dir(), PathBuf::from("out/ledger"));
    assert!(!config.output.artifacts);
    assert_eq!(config.logging.sink, LogSinkKind::File);

    let definitions = config.to_definitions();
    assert_eq!(definitions[0].priority, Priority::Critical);
    let rows = &definitions[1];
    assert_eq!(rows.name, "Orders row diff");
    assert_eq!(rows.strategy, ComparisonStrategy::RowDiff);
    assert_eq!(rows.params.key_columns, vec!["order_id".to_string()]);
    assert_eq!(rows.params.sample_size, Some(500));
    assert!(!rows.params.full_validation);
    assert_eq!(rows.dependencies, vec![QueryId::new("schema")]);
    assert!(!rows.required_for_migration);
}

#[test]
fn empty_catalog_is_rejected() {
    assert!(invalid_message(&document("", "")).contains("at least one query"));
}

#[test]
fn duplicate_ids_are_rejected() {
    let content = document("", &format!("{}{}", query("a", ""), query("a", "")));
    assert!(invalid_message(&content).contains("duplicate query id: a"));
}

#[test]
fn unknown_dependencies_are_rejected() {
    let content = document("", &query("a", "dependencies = [\"ghost\"]"));
    assert!(invalid_message(&content).contains("unknown query ghost"));
}

#[test]
fn dependency_cycles_are_rejected() {
    let content = document(
        "",
        &format!("{}{}", query("a", "dependencies = [\"b\"]"), query("b", "dependencies = [\"a\"]")),
    );
    assert!(invalid_message(&content).contains("cycle"));
}

#[test]
fn mutating_sql_is_rejected() {
    let content = document(
        "",
        "[[queries]]\nid = \"wipe\"\ncategory = \"content\"\nsql = \"DELETE FROM orders\"\n\
         strategy = \"exact_match\"\n",
    );
    assert!(invalid_message(&content).contains("must start with SELECT or WITH"));
}

#[test]
fn row_diff_requires_key_columns() {
    let content = document("", &query("rows", "").replace("exact_match", "row_diff"));
    assert!(invalid_message(&content).contains("requires at least one key column"));
}

#[test]
fn negative_tolerance_is_rejected() {
    let content = document("", &query("a", "tolerance = -0.5"));
    assert!(invalid_message(&content).contains("tolerance"));
}

#[test]
fn zero_timeouts_and_attempts_are_rejected() {
    assert!(invalid_message(&document("", &query("a", "timeout_ms = 0"))).contains("timeout"));
    assert!(invalid_message(&document("", &query("a", "max_attempts = 0"))).contains("attempts"));
}

#[test]
fn malformed_query_ids_are_rejected() {
    assert!(invalid_message(&document("", &query("has space", ""))).contains("id must be"));
}

#[test]
fn inverted_backoff_bounds_are_rejected() {
    let content =
        document("[engine]\nbackoff_base_ms = 500\nbackoff_max_ms = 100\n", &query("a", ""));
    assert!(invalid_message(&content).contains("backoff_base_ms"));
}

#[test]
fn file_logging_requires_a_path() {
    let content = document("[logging]\nsink = \"file\"\n", &query("a", ""));
    assert!(invalid_message(&content).contains("logging.path is required"));
}

#[test]
fn zero_retention_is_rejected() {
    let content = document("[store]\nmax_versions = 0\n", &query("a", ""));
    assert!(invalid_message(&content).contains("store.max_versions"));
}

#[test]
fn lease_shorter_than_an_attempt_is_rejected() {
    let content = document(
        "[engine]\nbackoff_max_ms = 1000\n[store]\nlock_ttl_ms = 5000\n",
        &format!("{}{}", query("quick", "timeout_ms = 2000"), query("slow", "timeout_ms = 4000")),
    );
    let message = invalid_message(&content);
    assert!(message.contains("store.lock_ttl_ms (5000)"));
    assert!(message.contains("query slow"));
    assert!(!message.contains("query quick"));
}

#[test]
fn every_violation_is_reported_at_once() {
    let content = document(
        "[engine]\nmax_commit_attempts = 0\n[store]\nmax_versions = 0\n",
        &format!("{}{}", query("a", "tolerance = -1.0"), query("a", "")),
    );
    let Err(ConfigError::Violations(messages)) = ParityConfig::from_toml_str(&content) else {
        panic!("expected every violation to be collected");
    };
    assert_eq!(messages.len(), 4, "{messages:?}");
    assert!(messages[0].contains("engine.max_commit_attempts"));
    assert!(messages[1].contains("store.max_versions"));
    assert!(messages.iter().any(|message| message.contains("tolerance")));
    assert!(messages.iter().any(|message| message.contains("duplicate query id: a")));
    let rendered = ConfigError::Violations(messages).to_string();
    assert!(rendered.starts_with("invalid config (4 problems):"));
}
