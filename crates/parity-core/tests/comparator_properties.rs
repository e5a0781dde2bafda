// crates/parity-core/tests/comparator_properties.rs
// ============================================================================
// Module: Comparator Property Tests
// Description: Property-based checks for comparator invariants.
// Purpose: Ensure identical inputs always match and tolerance is symmetric.
// Dependencies: parity-core, proptest
// ============================================================================
//! ## Overview
//! Generates small keyed tables and checks invariants that must hold for
//! every input rather than for hand-picked fixtures.

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

use parity_core::ColumnSchema;
use parity_core::ColumnType;
use parity_core::ComparisonStrategy;
use parity_core::MaterializedDataset;
use parity_core::QueryCategory;
use parity_core::QueryDefinition;
use parity_core::compare_datasets;
use proptest::prelude::*;
use serde_json::Value;

fn dataset(rows: &[(i64, i64)]) -> MaterializedDataset {
    let columns =
        vec![ColumnSchema::new("id", ColumnType::Integer), ColumnSchema::new("cents", ColumnType::Integer)];
    let rows = rows.iter().map(|(id, cents)| vec![Value::from(*id), Value::from(*cents)]).collect();
    MaterializedDataset::new(columns, rows).unwrap()
}

fn query(strategy: ComparisonStrategy, keyed: bool) -> QueryDefinition {
    let mut query = QueryDefinition::new("prop", QueryCategory::Content, strategy, "SELECT 1");
    if keyed {
        query.params.key_columns = vec!["id".to_string()];
    }
    query
}

fn strategy() -> impl Strategy<Value = ComparisonStrategy> {
    prop_oneof![
        Just(ComparisonStrategy::ExactMatch),
        Just(ComparisonStrategy::Tolerance),
        Just(ComparisonStrategy::RowDiff),
    ]
}

proptest! {
    #[test]
    fn identical_datasets_always_match(
        rows in prop::collection::vec((-50_i64 .. 50, -1_000_i64 .. 1_000), 0 .. 40),
        strategy in strategy(),
    ) {
        let keyed = strategy == ComparisonStrategy::RowDiff;
        let data = dataset(&rows);
        let result = compare_datasets(&query(strategy, keyed), &data, &data, 10).unwrap();
        prop_assert!(result.matched);
        prop_assert_eq!(result.discrepancy_count, 0);
        prop_assert_eq!(result.total_compared, rows.len() as u64);
    }

    #[test]
    fn tolerance_is_symmetric(
        left in prop::collection::vec(-10_000_i64 .. 10_000, 1 .. 20),
        right in prop::collection::vec(-10_000_i64 .. 10_000, 1 .. 20),
        tolerance in 0_u32 .. 500,
    ) {
        let source: Vec<(i64, i64)> = left.iter().enumerate().map(|(i, v)| (i as i64, *v)).collect();
        let target: Vec<(i64, i64)> = right.iter().enumerate().map(|(i, v)| (i as i64, *v)).collect();
        let source = dataset(&source);
        let target = dataset(&target);
        let mut definition = query(ComparisonStrategy::Tolerance, true);
        definition.params.tolerance = f64::from(tolerance);
        let forward = compare_datasets(&definition, &source, &target, 10).unwrap();
        let backward = compare_datasets(&definition, &target, &source, 10).unwrap();
        prop_assert_eq!(forward.matched, backward.matched);
        prop_assert_eq!(forward.differing, backward.differing);
        prop_assert_eq!(forward.source_only, backward.target_only);
        prop_assert_eq!(forward.discrepancy_count, backward.discrepancy_count);
    }
}
