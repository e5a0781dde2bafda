// crates/parity-core/tests/plan.rs
// ============================================================================
// Module: Plan Builder Tests
// Description: Ordering, subset selection, and catalog validation.
// Purpose: Ensure plans are deterministic and respect dependencies.
// Dependencies: parity-core
// ============================================================================
//! ## Overview
//! Covers [`ExecutionPlan`] construction over valid and invalid catalogs.

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

use common::exact;
use common::exact_after;
use parity_core::ComparisonStrategy;
use parity_core::DefinitionError;
use parity_core::ExecutionPlan;
use parity_core::PlanError;
use parity_core::Priority;
use parity_core::QueryId;

fn ids(plan: &ExecutionPlan) -> Vec<&str> {
    plan.order.iter().map(QueryId::as_str).collect()
}

#[test]
fn independent_queries_follow_priority_then_declaration() {
    let mut low = exact("low");
    low.priority = Priority::Low;
    let mut critical = exact("critical");
    critical.priority = Priority::Critical;
    let catalog = vec![low, exact("medium_1"), critical, exact("medium_2")];
    let plan = ExecutionPlan::build(&catalog, None).unwrap();
    assert_eq!(ids(&plan), vec!["critical", "medium_1", "medium_2", "low"]);
}

#[test]
fn dependencies_run_before_dependents_regardless_of_priority() {
    let mut urgent = exact_after("urgent", &["base"]);
    urgent.priority = Priority::Critical;
    let mut base = exact("base");
    base.priority = Priority::Low;
    let plan = ExecutionPlan::build(&[urgent, base], None).unwrap();
    assert_eq!(ids(&plan), vec!["base", "urgent"]);
}

#[test]
fn subset_adds_transitive_dependencies() {
    let catalog = vec![
        exact("schema"),
        exact_after("volume", &["schema"]),
        exact_after("content", &["volume"]),
        exact("unrelated"),
    ];
    let plan = ExecutionPlan::build(&catalog, Some(&[QueryId::new("content")])).unwrap();
    assert_eq!(ids(&plan), vec!["schema", "volume", "content"]);
    let added: Vec<&str> = plan.added_dependencies.iter().map(QueryId::as_str).collect();
    assert_eq!(added, vec!["schema", "volume"]);
}

#[test]
fn unknown_subset_query_is_rejected() {
    let err = ExecutionPlan::build(&[exact("a")], Some(&[QueryId::new("missing")])).unwrap_err();
    assert_eq!(err, PlanError::UnknownQuery("missing".to_string()));
}

#[test]
fn cycles_are_rejected_with_members() {
    let catalog = vec![exact_after("a", &["c"]), exact_after("b", &["a"]), exact_after("c", &["b"])];
    let err = ExecutionPlan::build(&catalog, None).unwrap_err();
    assert_eq!(err, PlanError::Cycle(vec!["a".to_string(), "b".to_string(), "c".to_string()]));
}

#[test]
fn unknown_dependency_is_rejected() {
    let err = ExecutionPlan::build(&[exact_after("a", &["ghost"])], None).unwrap_err();
    assert!(matches!(err, PlanError::UnknownDependency { ref dependency, .. } if dependency == "ghost"));
}

#[test]
fn duplicate_ids_are_rejected() {
    let err = ExecutionPlan::build(&[exact("a"), exact("a")], None).unwrap_err();
    assert_eq!(err, PlanError::DuplicateQuery("a".to_string()));
}

#[test]
fn empty_catalog_is_rejected() {
    assert_eq!(ExecutionPlan::build(&[], None).unwrap_err(), PlanError::EmptyCatalog);
}

#[test]
fn row_diff_without_keys_fails_validation() {
    let mut query = exact("keyed");
    query.strategy = ComparisonStrategy::RowDiff;
    let err = ExecutionPlan::build(&[query], None).unwrap_err();
    assert!(matches!(err, PlanError::InvalidDefinition(DefinitionError::MissingKeyColumns(_))));
}

#[test]
fn reseed_orders_selection_without_adding_dependencies() {
    let catalog = vec![exact("a"), exact_after("b", &["a"]), exact_after("c", &["b"])];
    let plan = ExecutionPlan::reseed(&catalog, &[QueryId::new("c"), QueryId::new("b")]).unwrap();
    assert_eq!(ids(&plan), vec!["b", "c"]);
}

#[test]
fn reseed_rejects_queries_missing_from_the_catalog() {
    let err = ExecutionPlan::reseed(&[exact("a")], &[QueryId::new("gone")]).unwrap_err();
    assert!(matches!(err, PlanError::Corrupt(_)));
}
