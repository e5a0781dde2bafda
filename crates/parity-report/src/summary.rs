// crates/parity-report/src/summary.rs
// ============================================================================
// Module: Run Summary Sink
// Description: Writes a JSON summary file when a run completes.
// Purpose: Give operators a single document describing a finished run.
// Dependencies: parity-core, serde, serde_json
// ============================================================================

//! ## Overview
//! [`SummaryFileSink`] writes `<output>/summary/<execution_id>.json` on run
//! completion. The summary lists every query's status and headline numbers
//! and flags whether any query marked as required for migration failed.
//! Files are written to a temporary name and renamed into place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;

use parity_core::ExecutionId;
use parity_core::ExecutionRun;
use parity_core::FailureKind;
use parity_core::OutcomeStatus;
use parity_core::QueryDefinition;
use parity_core::QueryId;
use parity_core::QueryOutcome;
use parity_core::ReportSink;
use parity_core::RunStatus;
use parity_core::RunSummary;
use parity_core::SinkError;
use parity_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Per-query line in a run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySummaryLine {
    /// Query identifier.
    pub query_id: String,
    /// Final outcome status.
    pub status: OutcomeStatus,
    /// Attempts used.
    pub attempts: u32,
    /// Elapsed ticks of the last attempt.
    pub duration_ms: Option<u64>,
    /// Failure classification, if any.
    pub error_kind: Option<FailureKind>,
    /// Match percentage when a comparison ran.
    pub match_percentage: Option<f64>,
    /// True when the comparison used a sample only.
    pub provisional: bool,
}

/// Run summary document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummaryReport {
    /// Execution identifier.
    pub execution_id: String,
    /// Final run status.
    pub status: RunStatus,
    /// Run creation time.
    pub created_at: Timestamp,
    /// Time of the last committed transition.
    pub updated_at: Timestamp,
    /// Engine passes over the run.
    pub pass: u32,
    /// Aggregate counts.
    pub summary: RunSummary,
    /// True when no migration-blocking query failed or was skipped.
    pub migration_ready: bool,
    /// Migration-blocking queries that did not succeed.
    pub blocking_failures: Vec<String>,
    /// Per-query lines in plan order.
    pub queries: Vec<QuerySummaryLine>,
}

impl RunSummaryReport {
    /// Builds a summary report from a run header and its outcomes.
    ///
    /// `required` lists the queries whose failure blocks migration.
    #[must_use]
    pub fn build(
        run: &ExecutionRun,
        outcomes: &BTreeMap<QueryId, QueryOutcome>,
        required: &BTreeSet<QueryId>,
    ) -> Self {
        let mut ordered: Vec<&QueryOutcome> =
            run.plan.iter().filter_map(|id| outcomes.get(id)).collect();
        ordered.extend(outcomes.values().filter(|outcome| !run.plan.contains(&outcome.query_id)));
        let queries: Vec<QuerySummaryLine> = ordered
            .into_iter()
            .map(|outcome| QuerySummaryLine {
                query_id: outcome.query_id.to_string(),
                status: outcome.status,
                attempts: outcome.attempts,
                duration_ms: outcome.duration_ms,
                error_kind: outcome.error.as_ref().map(|error| error.kind),
                match_percentage: outcome.result.as_ref().map(|result| result.match_percentage),
                provisional: outcome.result.as_ref().is_some_and(|result| result.provisional),
            })
            .collect();
        let blocking_failures: Vec<String> = outcomes
            .values()
            .filter(|outcome| {
                required.contains(&outcome.query_id) && outcome.status != OutcomeStatus::Success
            })
            .map(|outcome| outcome.query_id.to_string())
            .collect();
        Self {
            execution_id: run.execution_id.to_string(),
            status: run.status,
            created_at: run.created_at,
            updated_at: run.updated_at,
            pass: run.pass,
            summary: RunSummary::from_outcomes(outcomes),
            migration_ready: blocking_failures.is_empty(),
            blocking_failures,
            queries,
        }
    }
}

// ============================================================================
// SECTION: Sink
// ============================================================================

/// Report sink writing one summary file per completed run.
pub struct SummaryFileSink {
    /// Output root directory.
    root: PathBuf,
    /// Queries whose failure blocks migration.
    required: BTreeSet<QueryId>,
}

impl SummaryFileSink {
    /// Creates a summary sink under an output root.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            required: BTreeSet::new(),
        }
    }

    /// Records which catalog queries block migration on failure.
    #[must_use]
    pub fn with_catalog(mut self, catalog: &[QueryDefinition]) -> Self {
        self.required = catalog
            .iter()
            .filter(|query| query.required_for_migration)
            .map(|query| query.id.clone())
            .collect();
        self
    }

    /// Returns the summary path for an execution.
    #[must_use]
    pub fn summary_path(&self, execution_id: &ExecutionId) -> PathBuf {
        self.root.join("summary").join(format!("{execution_id}.json"))
    }
}

impl ReportSink for SummaryFileSink {
    fn on_query_completed(
        &self,
        _execution_id: &ExecutionId,
        _outcome: &QueryOutcome,
    ) -> Result<(), SinkError> {
        Ok(())
    }

    fn on_run_completed(
        &self,
        execution_id: &ExecutionId,
        run: &ExecutionRun,
        outcomes: &BTreeMap<QueryId, QueryOutcome>,
    ) -> Result<(), SinkError> {
        let report = RunSummaryReport::build(run, outcomes, &self.required);
        let bytes = serde_json::to_vec_pretty(&report)
            .map_err(|err| SinkError::Serialization(err.to_string()))?;
        write_atomic(&self.summary_path(execution_id), &bytes)
            .map_err(|err| SinkError::Io(err.to_string()))
    }
}

// ============================================================================
// SECTION: File Helpers
// ============================================================================

/// Writes a file through a temporary sibling and a rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);
    std::fs::write(&temp, bytes)?;
    std::fs::rename(&temp, path)
}
