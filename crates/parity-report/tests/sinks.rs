// crates/parity-report/tests/sinks.rs
// ============================================================================
// Module: Report Sink Tests
// Description: Tests for summary, artifact, channel, and composite sinks.
// Purpose: Validate sink output documents and delivery semantics.
// Dependencies: parity-report, parity-core, serde_json, tempfile, tokio
// ============================================================================

//! ## Overview
//! Exercises the file-writing sinks against a temporary output root and the
//! in-memory sinks against channel receivers.

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

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use std::sync::Mutex;

use parity_core::ArtifactSink;
use parity_core::ExecutionId;
use parity_core::ExecutionRun;
use parity_core::OutcomeStatus;
use parity_core::QueryId;
use parity_core::QueryOutcome;
use parity_core::ReportSink;
use parity_core::RunStatus;
use parity_core::SinkError;
use parity_core::hashing::DEFAULT_HASH_ALGORITHM;
use parity_core::hashing::hash_bytes;
use parity_report::ChannelSink;
use parity_report::CompositeSink;
use parity_report::FileArtifactSink;
use parity_report::QueryReport;
use parity_report::ReportEvent;
use parity_report::RunSummaryReport;
use parity_report::SummaryFileSink;
use parity_report::recommendations;
use tempfile::TempDir;

use crate::common::finished_run;
use crate::common::mismatch;
use crate::common::outcome_map;
use crate::common::query;
use crate::common::skipped;
use crate::common::success;

// ============================================================================
// SECTION: Summary Sink
// ============================================================================

/// Tests the summary file lists queries in plan order and flags blockers.
#[test]
fn summary_file_reports_blocking_failures() {
    let temp = TempDir::new().unwrap();
    let mut required = query("b");
    required.required_for_migration = true;
    let catalog = vec![query("a"), required, query("c")];
    let sink = SummaryFileSink::new(temp.path()).with_catalog(&catalog);

    let execution_id = ExecutionId::new("run-7");
    let run = finished_run("run-7", &["c", "a", "b"], RunStatus::CompletedWithFailures);
    let outcomes = outcome_map(vec![success("a"), mismatch("b"), skipped("c", "b")]);
    sink.on_query_completed(&execution_id, &success("a")).unwrap();
    assert!(!sink.summary_path(&execution_id).exists());
    sink.on_run_completed(&execution_id, &run, &outcomes).unwrap();

    let path = temp.path().join("summary").join("run-7.json");
    let report: RunSummaryReport = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    let order: Vec<&str> = report.queries.iter().map(|line| line.query_id.as_str()).collect();
    assert_eq!(order, vec!["c", "a", "b"]);
    assert_eq!(report.status, RunStatus::CompletedWithFailures);
    assert_eq!(report.summary.succeeded, 1);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.skipped, 1);
    assert!(!report.migration_ready);
    assert_eq!(report.blocking_failures, vec!["b".to_string()]);
}

/// Tests a run with no required queries is migration ready despite failures.
#[test]
fn summary_without_required_queries_is_ready() {
    let run = finished_run("run-8", &["a", "b"], RunStatus::CompletedWithFailures);
    let outcomes = outcome_map(vec![success("a"), mismatch("b")]);
    let report = RunSummaryReport::build(&run, &outcomes, &std::collections::BTreeSet::new());
    assert!(report.migration_ready);
    assert_eq!(report.queries[1].match_percentage, Some(50.0));
    assert_eq!(report.queries[1].attempts, 1);
}

// ============================================================================
// SECTION: Artifact Sink
// ============================================================================

/// Tests per-query reports land under the execution directory with a hash.
#[test]
fn artifact_sink_writes_hashed_report() {
    let temp = TempDir::new().unwrap();
    let sink = FileArtifactSink::new(temp.path());
    let execution_id = ExecutionId::new("run-3");
    let definition = query("b");

    let artifact = sink.export(&execution_id, &definition, &mismatch("b")).unwrap();
    let path = temp.path().join("reports").join("run-3").join("b.json");
    assert_eq!(artifact.uri, path.display().to_string());
    let bytes = fs::read(&path).unwrap();
    assert_eq!(artifact.content_hash, Some(hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes)));

    let report: QueryReport = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(report.query.strategy, "exact_match");
    assert_eq!(report.validation_result.status, OutcomeStatus::Failed);
    assert_eq!(report.validation_result.overall_match, Some(false));
    assert_eq!(report.data_summary.source_rows, Some(3));
    assert_eq!(report.sample_differences.len(), 1);
    assert!(report.recommendations.iter().any(|line| line.contains("Row count mismatch")));
}

/// Tests recommendations cover missing rows, differing columns, and errors.
#[test]
fn recommendations_follow_outcome_details() {
    let lines = recommendations(&mismatch("b"));
    assert!(lines.iter().any(|line| line.starts_with("Comparison failed (data_mismatch)")));
    assert!(lines.iter().any(|line| line.contains("present only in source")));
    assert!(lines.iter().any(|line| line.contains("review columns: amount")));
    assert!(!lines.iter().any(|line| line.contains("present only in target")));

    assert!(recommendations(&success("a")).is_empty());

    let skipped_lines = recommendations(&skipped("c", "b"));
    assert_eq!(skipped_lines.len(), 1);
    assert!(skipped_lines[0].contains("dependency b did not succeed"));
}

/// Tests the sampled flag produces a follow-up recommendation.
#[test]
fn provisional_results_recommend_full_validation() {
    let mut outcome = mismatch("b");
    if let Some(result) = outcome.result.as_mut() {
        result.provisional = true;
    }
    let lines = recommendations(&outcome);
    assert!(lines.iter().any(|line| line.contains("full validation")));
}

// ============================================================================
// SECTION: Channel Sink
// ============================================================================

/// Tests channel delivery of query and run events.
#[tokio::test]
async fn channel_sink_forwards_events() {
    let (tx, mut rx) = tokio::sync::mpsc::channel::<ReportEvent>(4);
    let sink = ChannelSink::new(tx);
    let execution_id = ExecutionId::new("run-4");
    let outcomes = outcome_map(vec![success("a")]);

    sink.on_query_completed(&execution_id, &success("a")).unwrap();
    sink.on_run_completed(
        &execution_id,
        &finished_run("run-4", &["a"], RunStatus::Completed),
        &outcomes,
    )
    .unwrap();

    match rx.recv().await.unwrap() {
        ReportEvent::QueryCompleted {
            execution_id,
            outcome,
        } => {
            assert_eq!(execution_id.as_str(), "run-4");
            assert_eq!(outcome.query_id, QueryId::new("a"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
    match rx.recv().await.unwrap() {
        ReportEvent::RunCompleted {
            summary,
            run,
            ..
        } => {
            assert_eq!(summary.succeeded, 1);
            assert_eq!(run.status, RunStatus::Completed);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

/// Tests a full channel reports the sink as unavailable.
#[test]
fn channel_sink_full_is_unavailable() {
    let (tx, _rx) = tokio::sync::mpsc::channel::<ReportEvent>(1);
    let sink = ChannelSink::new(tx);
    let execution_id = ExecutionId::new("run-5");
    sink.on_query_completed(&execution_id, &success("a")).unwrap();
    let err = sink.on_query_completed(&execution_id, &success("b")).unwrap_err();
    assert!(matches!(err, SinkError::Unavailable(_)), "{err}");
}

/// Tests a closed channel reports the sink as unavailable.
#[test]
fn channel_sink_closed_is_unavailable() {
    let (tx, rx) = tokio::sync::mpsc::channel::<ReportEvent>(1);
    drop(rx);
    let sink = ChannelSink::new(tx);
    let err = sink.on_query_completed(&ExecutionId::new("run-6"), &success("a")).unwrap_err();
    assert!(matches!(err, SinkError::Unavailable(_)), "{err}");
}

// ============================================================================
// SECTION: Composite Sink
// ============================================================================

/// Sink recording query ids and optionally failing.
struct Recording {
    /// Query ids seen.
    seen: Mutex<Vec<String>>,
    /// Whether every callback fails.
    fail: bool,
}

impl Recording {
    /// Creates a recording sink.
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            fail,
        })
    }

    /// Returns the recorded ids.
    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    /// Returns the configured callback result.
    fn result(&self) -> Result<(), SinkError> {
        if self.fail { Err(SinkError::Io("disk full".to_string())) } else { Ok(()) }
    }
}

impl ReportSink for Recording {
    fn on_query_completed(
        &self,
        _execution_id: &ExecutionId,
        outcome: &QueryOutcome,
    ) -> Result<(), SinkError> {
        self.seen.lock().unwrap().push(outcome.query_id.to_string());
        self.result()
    }

    fn on_run_completed(
        &self,
        execution_id: &ExecutionId,
        _run: &ExecutionRun,
        _outcomes: &BTreeMap<QueryId, QueryOutcome>,
    ) -> Result<(), SinkError> {
        self.seen.lock().unwrap().push(format!("run:{execution_id}"));
        self.result()
    }
}

/// Tests every sink is called even when an earlier one fails.
#[test]
fn composite_delivers_to_all_and_returns_first_error() {
    let failing = Recording::new(true);
    let healthy = Recording::new(false);
    let composite = CompositeSink::new().with_sink(failing.clone()).with_sink(healthy.clone());
    assert_eq!(composite.len(), 2);

    let execution_id = ExecutionId::new("run-9");
    let err = composite.on_query_completed(&execution_id, &success("a")).unwrap_err();
    assert!(matches!(err, SinkError::Io(_)));
    composite
        .on_run_completed(
            &execution_id,
            &finished_run("run-9", &["a"], RunStatus::Completed),
            &outcome_map(vec![success("a")]),
        )
        .unwrap_err();

    assert_eq!(failing.seen(), vec!["a".to_string(), "run:run-9".to_string()]);
    assert_eq!(healthy.seen(), vec!["a".to_string(), "run:run-9".to_string()]);
}

/// Tests an empty composite accepts everything.
#[test]
fn empty_composite_is_ok() {
    let composite = CompositeSink::new();
    assert!(composite.is_empty());
    composite.on_query_completed(&ExecutionId::new("run-10"), &success("a")).unwrap();
}
