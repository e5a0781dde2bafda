// crates/parity-providers/tests/sqlite_executor.rs
// ============================================================================
// Module: SQLite Executor Tests
// Description: Materialization, streaming and error classification for SQLite sources.
// Purpose: Ensure SQLite failures map onto the engine's retry classes.
// Dependencies: parity-providers, parity-core, rusqlite, tempfile, tokio
// ============================================================================
//! ## Overview
//! Creates throwaway source and target databases and materializes queries
//! through [`SqliteQueryExecutor`].

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

use std::path::Path;

use parity_core::ColumnType;
use parity_core::ComparisonStrategy;
use parity_core::DatasetError;
use parity_core::ExecutorErrorKind;
use parity_core::QueryCategory;
use parity_core::QueryDefinition;
use parity_core::QueryExecutor;
use parity_core::RowOrder;
use parity_core::TargetSide;
use parity_core::compare_datasets;
use parity_providers::SqliteExecutorConfig;
use parity_providers::SqliteQueryExecutor;
use serde_json::json;
use tempfile::TempDir;

fn seed(path: &Path, rows: &[(i64, &str, f64)]) {
    let connection = rusqlite::Connection::open(path).unwrap();
    connection
        .execute_batch("CREATE TABLE orders (id INTEGER PRIMARY KEY, region TEXT, total REAL);")
        .unwrap();
    for (id, region, total) in rows {
        connection
            .execute(
                "INSERT INTO orders (id, region, total) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, region, total],
            )
            .unwrap();
    }
}

fn query(sql: &str) -> QueryDefinition {
    QueryDefinition::new("orders", QueryCategory::Content, ComparisonStrategy::ExactMatch, sql)
}

fn executor(temp: &TempDir) -> SqliteQueryExecutor {
    let source = temp.path().join("source.db");
    let target = temp.path().join("target.db");
    seed(&source, &[(1, "eu", 10.5), (2, "us", 20.0)]);
    seed(&target, &[(1, "eu", 10.5)]);
    SqliteQueryExecutor::new(SqliteExecutorConfig::new(source, target))
}

#[tokio::test]
async fn materializes_each_side_from_its_own_database() {
    let temp = TempDir::new().unwrap();
    let executor = executor(&temp);
    let query = query("SELECT id, region, total FROM orders ORDER BY id");

    let source = executor.materialize(&query, TargetSide::Source).await.unwrap();
    let target = executor.materialize(&query, TargetSide::Target).await.unwrap();
    assert_eq!(source.row_count(), 2);
    assert_eq!(target.row_count(), 1);

    let names: Vec<&str> = source.columns().iter().map(|column| column.name.as_str()).collect();
    assert_eq!(names, vec!["id", "region", "total"]);
    assert_eq!(source.columns()[0].data_type, ColumnType::Integer);
    assert_eq!(source.columns()[2].data_type, ColumnType::Decimal);

    let mut stream = source.rows(&RowOrder::Natural).unwrap();
    assert_eq!(stream.next_row().unwrap(), Some(vec![json!(1), json!("eu"), json!(10.5)]));
}

#[tokio::test]
async fn malformed_sql_is_a_query_error() {
    let temp = TempDir::new().unwrap();
    let err = executor(&temp)
        .materialize(&query("SELECT nope FROM missing_table"), TargetSide::Target)
        .await
        .err().unwrap();
    assert_eq!(err.kind, ExecutorErrorKind::Query);
    assert_eq!(err.side, Some(TargetSide::Target));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn mutating_statements_are_rejected() {
    let temp = TempDir::new().unwrap();
    let err = executor(&temp)
        .materialize(&query("DELETE FROM orders"), TargetSide::Source)
        .await
        .err().unwrap();
    assert_eq!(err.kind, ExecutorErrorKind::Query);
    assert!(err.message.contains("not read-only"));
}

#[tokio::test]
async fn missing_database_is_a_connection_error() {
    let temp = TempDir::new().unwrap();
    let config =
        SqliteExecutorConfig::new(temp.path().join("absent.db"), temp.path().join("absent.db"));
    let err = SqliteQueryExecutor::new(config)
        .materialize(&query("SELECT 1"), TargetSide::Source)
        .await
        .err().unwrap();
    assert_eq!(err.kind, ExecutorErrorKind::Connection);
    assert!(err.is_retryable());
}

fn seed_unordered(path: &Path, rows: &[(i64, &str)]) {
    let connection = rusqlite::Connection::open(path).unwrap();
    connection.execute_batch("CREATE TABLE events (id INTEGER, label TEXT);").unwrap();
    for (id, label) in rows {
        connection
            .execute("INSERT INTO events (id, label) VALUES (?1, ?2)", rusqlite::params![id, label])
            .unwrap();
    }
}

#[tokio::test]
async fn results_above_the_buffer_limit_are_streamed_in_key_order() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source.db");
    let target = temp.path().join("target.db");
    seed_unordered(&source, &[(5, "e"), (3, "c"), (1, "a"), (4, "d"), (2, "b")]);
    seed_unordered(&target, &[(2, "b"), (5, "e"), (1, "a"), (3, "x"), (4, "d")]);
    let mut config = SqliteExecutorConfig::new(source, target);
    config.max_buffered_rows = 2;
    let executor = SqliteQueryExecutor::new(config);
    let mut definition = QueryDefinition::new(
        "events",
        QueryCategory::Content,
        ComparisonStrategy::RowDiff,
        "SELECT id, label FROM events;",
    );
    definition.params.key_columns = vec!["id".to_string()];

    let source = executor.materialize(&definition, TargetSide::Source).await.unwrap();
    let target = executor.materialize(&definition, TargetSide::Target).await.unwrap();
    assert_eq!(source.row_count(), 5);
    assert_eq!(target.row_count(), 5);
    assert_eq!(source.columns()[0].data_type, ColumnType::Integer);

    let mut stream = source.rows(&RowOrder::ByKey(vec!["id".to_string()])).unwrap();
    let mut ids = Vec::new();
    while let Some(row) = stream.next_row().unwrap() {
        ids.push(row[0].clone());
    }
    assert_eq!(ids, vec![json!(1), json!(2), json!(3), json!(4), json!(5)]);

    let result = compare_datasets(&definition, source.as_ref(), target.as_ref(), 10).unwrap();
    assert!(!result.matched);
    assert_eq!(result.matching, 4);
    assert_eq!(result.differing, 1);
    assert_eq!(result.source_only, 0);
    assert_eq!(result.target_only, 0);
}

#[tokio::test]
async fn streamed_result_rejects_an_unknown_key() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source.db");
    seed_unordered(&source, &[(1, "a"), (2, "b"), (3, "c")]);
    let mut config = SqliteExecutorConfig::new(source.clone(), source);
    config.max_buffered_rows = 1;
    let dataset = SqliteQueryExecutor::new(config)
        .materialize(&query("SELECT id, label FROM events"), TargetSide::Source)
        .await
        .unwrap();
    assert_eq!(dataset.row_count(), 3);
    let err = dataset.rows(&RowOrder::ByKey(vec!["missing".to_string()])).err().unwrap();
    assert_eq!(err, DatasetError::UnknownColumn("missing".to_string()));

    let mut stream = dataset.rows(&RowOrder::Natural).unwrap();
    assert!(stream.next_row().unwrap().is_some());
    drop(stream);
}

#[tokio::test]
async fn exclusively_locked_database_is_transient() {
    let temp = TempDir::new().unwrap();
    let executor = executor(&temp);
    let holder = rusqlite::Connection::open(temp.path().join("source.db")).unwrap();
    holder.execute_batch("BEGIN EXCLUSIVE;").unwrap();

    let mut config = executor.config().clone();
    config.busy_timeout_ms = 10;
    let err = SqliteQueryExecutor::new(config)
        .materialize(&query("SELECT * FROM orders"), TargetSide::Source)
        .await
        .err().unwrap();
    assert_eq!(err.kind, ExecutorErrorKind::Connection);
    holder.execute_batch("ROLLBACK;").unwrap();
}
