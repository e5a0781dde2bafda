// crates/parity-core/tests/comparator.rs
// ============================================================================
// Module: Comparator Tests
// Description: Behavior of exact, tolerance, and row-diff comparison.
// Purpose: Validate counters, tolerance edges, sampling bounds, and schema drift.
// Dependencies: parity-core, serde_json
// ============================================================================
//! ## Overview
//! Exercises [`compare_datasets`] directly with small literal tables and with
//! generated datasets that count how many rows the comparator reads.

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

mod common;

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use common::CountingDataset;
use common::table;
use parity_core::ComparatorError;
use parity_core::ComparisonStrategy;
use parity_core::QueryCategory;
use parity_core::QueryDefinition;
use parity_core::compare_datasets;
use serde_json::Value;
use serde_json::json;

const LIMIT: usize = 10;

fn query(strategy: ComparisonStrategy) -> QueryDefinition {
    QueryDefinition::new("q", QueryCategory::Content, strategy, "SELECT 1")
}

fn row_diff(keys: &[&str]) -> QueryDefinition {
    let mut query = query(ComparisonStrategy::RowDiff);
    query.params.key_columns = keys.iter().map(ToString::to_string).collect();
    query
}

// ============================================================================
// SECTION: Exact Match
// ============================================================================

#[test]
fn exact_match_detects_changed_values() {
    let source = table(json!([{"region": "eu", "total": 10}, {"region": "us", "total": 20}]));
    let target = table(json!([{"region": "eu", "total": 10}, {"region": "us", "total": 21}]));
    let result =
        compare_datasets(&query(ComparisonStrategy::ExactMatch), &source, &target, LIMIT).unwrap();

    assert!(!result.matched);
    assert_eq!(result.matching, 1);
    assert_eq!(result.differing, 1);
    assert_eq!(result.discrepancy_count, 1);
    assert!((result.match_percentage - 50.0).abs() < f64::EPSILON);
    let sample = &result.sample_differences[0];
    assert_eq!(sample.row_key, "#1");
    assert_eq!(sample.column, "total");
    assert_eq!(sample.target_value, json!(21));
    assert_eq!(result.per_column_stats["total"].count, 1);
    assert!((result.per_column_stats["total"].max_abs_diff - 1.0).abs() < f64::EPSILON);
}

#[test]
fn exact_match_counts_surplus_rows() {
    let source = table(json!([{"n": 1}, {"n": 2}, {"n": 3}]));
    let target = table(json!([{"n": 1}]));
    let result =
        compare_datasets(&query(ComparisonStrategy::ExactMatch), &source, &target, LIMIT).unwrap();

    assert!(!result.matched);
    assert_eq!(result.source_only, 2);
    assert_eq!(result.discrepancy_count, 2);
    assert!(result.notes.iter().any(|note| note.starts_with("Row count mismatch")));
}

#[test]
fn integer_and_decimal_renderings_of_one_value_match() {
    let source = table(json!([{"amount": 100}]));
    let target = table(json!([{"amount": 100.0}]));
    let result =
        compare_datasets(&query(ComparisonStrategy::ExactMatch), &source, &target, LIMIT).unwrap();
    assert!(result.matched);
}

#[test]
fn empty_datasets_match_completely() {
    let source = table(json!([]));
    let target = table(json!([]));
    let result =
        compare_datasets(&query(ComparisonStrategy::ExactMatch), &source, &target, LIMIT).unwrap();
    assert!(result.matched);
    assert_eq!(result.total_compared, 0);
    assert!((result.match_percentage - 100.0).abs() < f64::EPSILON);
}

#[test]
fn missing_columns_are_discrepancies() {
    let source = table(json!([{"id": 1, "legacy": "x", "total": 5}]));
    let target = table(json!([{"id": 1, "total": 5}]));
    let result =
        compare_datasets(&query(ComparisonStrategy::ExactMatch), &source, &target, LIMIT).unwrap();
    assert!(!result.matched);
    assert_eq!(result.differing, 0);
    assert_eq!(result.discrepancy_count, 1);
    assert!(result.notes.iter().any(|note| note.contains("legacy")));
}

// ============================================================================
// SECTION: Tolerance
// ============================================================================

#[test]
fn tolerance_accepts_differences_within_bound() {
    let source = table(json!([{"revenue": 100.00}]));
    let target = table(json!([{"revenue": 100.004}]));
    let mut loose = query(ComparisonStrategy::Tolerance);
    loose.params.tolerance = 0.01;
    let result = compare_datasets(&loose, &source, &target, LIMIT).unwrap();
    assert!(result.matched);
    assert_eq!(result.matching, 1);

    let mut strict = query(ComparisonStrategy::Tolerance);
    strict.params.tolerance = 0.001;
    let result = compare_datasets(&strict, &source, &target, LIMIT).unwrap();
    assert!(!result.matched);
    assert_eq!(result.differing, 1);
    let stats = &result.per_column_stats["revenue"];
    assert!((stats.max_abs_diff - 0.004).abs() < 1e-12);
}

#[test]
fn tolerance_boundary_is_inclusive() {
    let source = table(json!([{"v": 1.5}]));
    let target = table(json!([{"v": 1.75}]));
    let mut query = query(ComparisonStrategy::Tolerance);
    query.params.tolerance = 0.25;
    assert!(compare_datasets(&query, &source, &target, LIMIT).unwrap().matched);
}

#[test]
fn tolerance_does_not_relax_text_columns() {
    let source = table(json!([{"label": "a", "v": 1}]));
    let target = table(json!([{"label": "b", "v": 1}]));
    let mut query = query(ComparisonStrategy::Tolerance);
    query.params.tolerance = 1_000.0;
    let result = compare_datasets(&query, &source, &target, LIMIT).unwrap();
    assert!(!result.matched);
}

// ============================================================================
// SECTION: Row Diff
// ============================================================================

#[test]
fn row_diff_classifies_rows_by_key() {
    let source = table(json!([
        {"id": 1, "v": "a"}, {"id": 2, "v": "b"}, {"id": 3, "v": "c"},
        {"id": 4, "v": "d"}, {"id": 5, "v": "e"}
    ]));
    let target = table(json!([
        {"id": 6, "v": "f"}, {"id": 5, "v": "e"}, {"id": 4, "v": "d"},
        {"id": 2, "v": "B"}, {"id": 1, "v": "a"}
    ]));
    let result = compare_datasets(&row_diff(&["id"]), &source, &target, LIMIT).unwrap();

    assert!(!result.matched);
    assert!(!result.provisional);
    assert_eq!(result.matching, 3);
    assert_eq!(result.differing, 1);
    assert_eq!(result.source_only, 1);
    assert_eq!(result.target_only, 1);
    assert_eq!(result.total_compared, 6);
    assert_eq!(result.discrepancy_count, 3);
    let keys: Vec<&str> =
        result.sample_differences.iter().map(|sample| sample.row_key.as_str()).collect();
    assert_eq!(keys, vec!["2", "3", "6"]);
    assert_eq!(result.sample_differences[1].source_value, json!({"id": 3, "v": "c"}));
}

#[test]
fn ignored_columns_are_informational() {
    let source = table(json!([{"id": 1, "loaded_at": "monday", "v": 1}]));
    let target = table(json!([{"id": 1, "loaded_at": "tuesday", "v": 1}]));
    let mut query = row_diff(&["id"]);
    query.params.ignore_columns = vec!["loaded_at".to_string()];
    let result = compare_datasets(&query, &source, &target, LIMIT).unwrap();

    assert!(result.matched);
    assert_eq!(result.sample_differences.len(), 1);
    assert!(result.sample_differences[0].informational);
}

#[test]
fn sample_differences_are_capped() {
    let source = table(json!([{"id": 1, "v": 1}, {"id": 2, "v": 2}, {"id": 3, "v": 3}]));
    let target = table(json!([{"id": 1, "v": 0}, {"id": 2, "v": 0}, {"id": 3, "v": 0}]));
    let result = compare_datasets(&row_diff(&["id"]), &source, &target, 2).unwrap();
    assert_eq!(result.differing, 3);
    assert_eq!(result.sample_differences.len(), 2);
}

#[test]
fn row_diff_without_keys_is_rejected() {
    let data = table(json!([{"id": 1}]));
    let err = compare_datasets(&row_diff(&[]), &data, &data, LIMIT).unwrap_err();
    assert_eq!(err, ComparatorError::MissingKeyColumns);
}

#[test]
fn unknown_key_column_names_the_side() {
    let source = table(json!([{"id": 1}]));
    let target = table(json!([{"key": 1}]));
    let err = compare_datasets(&row_diff(&["id"]), &source, &target, LIMIT).unwrap_err();
    assert!(matches!(err, ComparatorError::UnknownKeyColumn { side: "target", .. }));
}

// ============================================================================
// SECTION: Sampling
// ============================================================================

fn identity(index: u64) -> Value {
    Value::from(index * 2)
}

fn drift_at_forty_thousand(index: u64) -> Value {
    if index == 40_000 { Value::from(-1) } else { Value::from(index * 2) }
}

fn drift_at_ten(index: u64) -> Value {
    if index == 10 { Value::from(-1) } else { Value::from(index * 2) }
}

#[test]
fn sampled_row_diff_reads_only_the_sample() {
    let read = Arc::new(AtomicU64::new(0));
    let source = CountingDataset::new(1_000_000, identity, read.clone());
    let target = CountingDataset::new(1_000_000, identity, read.clone());
    let mut query = row_diff(&["id"]);
    query.params.sample_size = Some(1_000);
    query.params.full_validation = false;
    let result = compare_datasets(&query, &source, &target, LIMIT).unwrap();

    assert!(result.matched);
    assert!(result.provisional);
    assert_eq!(result.total_compared, 1_000);
    assert!(result.source_rows_read <= 1_001);
    assert!(result.target_rows_read <= 1_001);
    assert!(read.load(Ordering::SeqCst) <= 2_002);
}

#[test]
fn sampled_mismatch_is_reported_as_provisional_failure() {
    let read = Arc::new(AtomicU64::new(0));
    let source = CountingDataset::new(1_000_000, identity, read.clone());
    let target = CountingDataset::new(1_000_000, drift_at_ten, read);
    let mut query = row_diff(&["id"]);
    query.params.sample_size = Some(100);
    query.params.full_validation = false;
    let result = compare_datasets(&query, &source, &target, LIMIT).unwrap();

    assert!(!result.matched);
    assert!(result.provisional);
    assert_eq!(result.differing, 1);
}

#[test]
fn full_validation_ignores_the_sample_size() {
    let read = Arc::new(AtomicU64::new(0));
    let source = CountingDataset::new(50_000, identity, read.clone());
    let target = CountingDataset::new(50_000, drift_at_forty_thousand, read);
    let mut query = row_diff(&["id"]);
    query.params.sample_size = Some(1_000);
    query.params.full_validation = true;
    let result = compare_datasets(&query, &source, &target, LIMIT).unwrap();

    assert!(!result.matched);
    assert!(!result.provisional);
    assert_eq!(result.total_compared, 50_000);
    assert_eq!(result.differing, 1);
    assert_eq!(result.sample_differences[0].row_key, "40000");
}

#[test]
fn sample_covering_the_whole_dataset_is_definitive() {
    let read = Arc::new(AtomicU64::new(0));
    let source = CountingDataset::new(20, identity, read.clone());
    let target = CountingDataset::new(20, identity, read);
    let mut query = row_diff(&["id"]);
    query.params.sample_size = Some(1_000);
    query.params.full_validation = false;
    let result = compare_datasets(&query, &source, &target, LIMIT).unwrap();
    assert!(result.matched);
    assert!(!result.provisional);
}
