// crates/parity-report/tests/common/mod.rs
// ============================================================================
// Module: Report Test Fixtures
// Description: Builders for run headers and outcomes used by sink tests.
// Purpose: Keep sink tests focused on sink behavior.
// Dependencies: parity-core, serde_json
// ============================================================================

#![allow(dead_code, reason = "Test-only helpers; not every test file uses every fixture.")]

use std::collections::BTreeMap;

use parity_core::ColumnStats;
use parity_core::ComparisonResult;
use parity_core::ComparisonStrategy;
use parity_core::ExecutionId;
use parity_core::ExecutionRun;
use parity_core::FailureKind;
use parity_core::OutcomeError;
use parity_core::OutcomeStatus;
use parity_core::QueryCategory;
use parity_core::QueryDefinition;
use parity_core::QueryId;
use parity_core::QueryOutcome;
use parity_core::RunStatus;
use parity_core::SampleDifference;
use parity_core::Timestamp;
use serde_json::json;

/// Builds an exact-match query definition.
pub fn query(id: &str) -> QueryDefinition {
    QueryDefinition::new(id, QueryCategory::Content, ComparisonStrategy::ExactMatch, "SELECT 1")
}

/// Builds a successful outcome.
pub fn success(id: &str) -> QueryOutcome {
    let mut outcome = QueryOutcome::pending(QueryId::new(id));
    outcome.begin_attempt(1, Timestamp::Logical(10));
    outcome.source_rows = Some(3);
    outcome.target_rows = Some(3);
    outcome.result = Some(ComparisonResult {
        matched: true,
        total_compared: 3,
        matching: 3,
        source_rows_read: 3,
        target_rows_read: 3,
        match_percentage: 100.0,
        ..ComparisonResult::default()
    });
    outcome.finish(OutcomeStatus::Success, None, Timestamp::Logical(14));
    outcome
}

/// Builds a data-mismatch outcome with one differing row and one missing row.
pub fn mismatch(id: &str) -> QueryOutcome {
    let mut outcome = QueryOutcome::pending(QueryId::new(id));
    outcome.begin_attempt(1, Timestamp::Logical(20));
    outcome.source_rows = Some(3);
    outcome.target_rows = Some(2);
    let mut per_column_stats = BTreeMap::new();
    per_column_stats.insert(
        "amount".to_string(),
        ColumnStats {
            count: 1,
            avg_abs_diff: 0.5,
            max_abs_diff: 0.5,
        },
    );
    outcome.result = Some(ComparisonResult {
        matched: false,
        total_compared: 2,
        matching: 1,
        differing: 1,
        source_only: 1,
        source_rows_read: 3,
        target_rows_read: 2,
        discrepancy_count: 2,
        match_percentage: 50.0,
        per_column_stats,
        sample_differences: vec![SampleDifference {
            row_key: "id=2".to_string(),
            column: "amount".to_string(),
            source_value: json!(10.0),
            target_value: json!(10.5),
            informational: false,
        }],
        notes: vec!["Row count mismatch: source has 3 rows, target has 2".to_string()],
        ..ComparisonResult::default()
    });
    outcome.finish(
        OutcomeStatus::Failed,
        Some(OutcomeError {
            kind: FailureKind::DataMismatch,
            message: "2 discrepancies".to_string(),
        }),
        Timestamp::Logical(25),
    );
    outcome
}

/// Builds a skipped outcome.
pub fn skipped(id: &str, upstream: &str) -> QueryOutcome {
    let mut outcome = QueryOutcome::pending(QueryId::new(id));
    outcome.finish(
        OutcomeStatus::Skipped,
        Some(OutcomeError {
            kind: FailureKind::Dependency,
            message: format!("dependency {upstream} did not succeed"),
        }),
        Timestamp::Logical(30),
    );
    outcome
}

/// Collects outcomes into a map.
pub fn outcome_map(outcomes: Vec<QueryOutcome>) -> BTreeMap<QueryId, QueryOutcome> {
    outcomes.into_iter().map(|outcome| (outcome.query_id.clone(), outcome)).collect()
}

/// Builds a finished run header over the given plan.
pub fn finished_run(execution_id: &str, plan: &[&str], status: RunStatus) -> ExecutionRun {
    let mut run = ExecutionRun::new(
        ExecutionId::new(execution_id),
        plan.iter().map(|id| QueryId::new(*id)).collect(),
        Timestamp::Logical(1),
    );
    run.cursor = plan.len();
    run.status = status;
    run.updated_at = Timestamp::Logical(40);
    run
}
