// crates/parity-core/src/core/outcome.rs
// ============================================================================
// Module: Parity Query Outcomes
// Description: Durable per-query outcome records and comparison results.
// Purpose: Capture the latest attempt of each query for checkpoints and reports.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`QueryOutcome`] exists for every query in a run from the moment the plan
//! is built. Its status moves `PENDING -> RUNNING -> {SUCCESS | FAILED}` or
//! `PENDING -> SKIPPED`; a new attempt overwrites status and timestamps but
//! the record itself is never removed.
//!
//! Invariants:
//! - `SUCCESS` and `FAILED` are only written after comparison (or a terminal
//!   executor failure) and are only observable once durably committed.
//! - Outcomes reference exported artifacts by handle, never by payload.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::HashDigest;
use crate::core::identifiers::QueryId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Status
// ============================================================================

/// Lifecycle status of a query within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    /// Not yet reached.
    Pending,
    /// Attempt in progress (never trusted across restarts).
    Running,
    /// Comparison matched and was committed.
    Success,
    /// Execution or comparison failed and was committed.
    Failed,
    /// A dependency can never succeed in this run.
    Skipped,
}

impl OutcomeStatus {
    /// Returns true when the status will not change again this pass.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Skipped)
    }

    /// Returns the stable label for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified failure kind recorded on failed or skipped outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network or connection failure (retryable).
    Connection,
    /// Materialization exceeded its timeout (retryable).
    Timeout,
    /// Authentication or authorization failure.
    Permission,
    /// Malformed query or invalid query configuration.
    Query,
    /// Datasets did not match.
    DataMismatch,
    /// Comparator could not evaluate the datasets.
    Comparison,
    /// An upstream dependency did not succeed.
    Dependency,
}

impl FailureKind {
    /// Returns true when the engine may retry the failed attempt.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Connection | Self::Timeout)
    }

    /// Returns the stable label for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Timeout => "timeout",
            Self::Permission => "permission",
            Self::Query => "query",
            Self::DataMismatch => "data_mismatch",
            Self::Comparison => "comparison",
            Self::Dependency => "dependency",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error classification and message recorded on an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeError {
    /// Failure classification.
    pub kind: FailureKind,
    /// Human-readable message.
    pub message: String,
}

// ============================================================================
// SECTION: Comparison Results
// ============================================================================

/// Per-column numeric difference statistics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnStats {
    /// Number of differing values observed in the column.
    pub count: u64,
    /// Mean absolute difference across numeric differences.
    pub avg_abs_diff: f64,
    /// Maximum absolute difference across numeric differences.
    pub max_abs_diff: f64,
}

/// A single reported value difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDifference {
    /// Key (or ordinal) identifying the row.
    pub row_key: String,
    /// Column name.
    pub column: String,
    /// Source-side value (null when the row is target-only).
    pub source_value: Value,
    /// Target-side value (null when the row is source-only).
    pub target_value: Value,
    /// True for ignored columns; informational differences never count.
    #[serde(default)]
    pub informational: bool,
}

/// Structured result produced by a comparator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// True when the datasets agree under the declared strategy.
    pub matched: bool,
    /// True when the result was derived from a sample only.
    #[serde(default)]
    pub provisional: bool,
    /// Number of rows (or keys) compared.
    pub total_compared: u64,
    /// Rows with identical compared values.
    pub matching: u64,
    /// Rows present on both sides with differing values.
    pub differing: u64,
    /// Rows present only in the source.
    pub source_only: u64,
    /// Rows present only in the target.
    pub target_only: u64,
    /// Source rows read while comparing.
    pub source_rows_read: u64,
    /// Target rows read while comparing.
    pub target_rows_read: u64,
    /// Total counted discrepancies.
    pub discrepancy_count: u64,
    /// Percentage of compared rows that matched.
    pub match_percentage: f64,
    /// Per-column numeric difference statistics.
    #[serde(default)]
    pub per_column_stats: BTreeMap<String, ColumnStats>,
    /// Bounded, ordered sample of differences.
    #[serde(default)]
    pub sample_differences: Vec<SampleDifference>,
    /// Recommendations derived from the comparison.
    #[serde(default)]
    pub notes: Vec<String>,
}

// ============================================================================
// SECTION: Outcome Record
// ============================================================================

/// Opaque handle to an exported artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Artifact location (path or URI).
    pub uri: String,
    /// Content hash of the exported artifact when available.
    #[serde(default)]
    pub content_hash: Option<HashDigest>,
}

/// Phase timings for one attempt (milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionTimings {
    /// Source materialization time.
    pub source_ms: u64,
    /// Target materialization time.
    pub target_ms: u64,
    /// Comparison time.
    pub comparison_ms: u64,
}

/// Durable record of a query's latest attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// Query identifier.
    pub query_id: QueryId,
    /// Lifecycle status.
    pub status: OutcomeStatus,
    /// Attempts made during the latest pass over this query.
    pub attempts: u32,
    /// Start of the latest attempt.
    pub started_at: Option<Timestamp>,
    /// End of the latest attempt.
    pub ended_at: Option<Timestamp>,
    /// Elapsed ticks between start and end.
    pub duration_ms: Option<u64>,
    /// Phase timings for the latest attempt.
    #[serde(default)]
    pub timings: Option<ExecutionTimings>,
    /// Source row count reported by the executor.
    #[serde(default)]
    pub source_rows: Option<u64>,
    /// Target row count reported by the executor.
    #[serde(default)]
    pub target_rows: Option<u64>,
    /// Comparator result when comparison ran.
    pub result: Option<ComparisonResult>,
    /// Error classification when failed or skipped.
    pub error: Option<OutcomeError>,
    /// Exported artifact handles.
    #[serde(default)]
    pub artifacts: Vec<ArtifactRef>,
}

impl QueryOutcome {
    /// Creates a pending outcome for a planned query.
    #[must_use]
    pub const fn pending(query_id: QueryId) -> Self {
        Self {
            query_id,
            status: OutcomeStatus::Pending,
            attempts: 0,
            started_at: None,
            ended_at: None,
            duration_ms: None,
            timings: None,
            source_rows: None,
            target_rows: None,
            result: None,
            error: None,
            artifacts: Vec::new(),
        }
    }

    /// Clears attempt state and returns the outcome to `PENDING`.
    pub fn reset(&mut self) {
        *self = Self::pending(self.query_id.clone());
    }

    /// Marks the outcome as a new running attempt.
    pub fn begin_attempt(&mut self, attempt: u32, now: Timestamp) {
        self.status = OutcomeStatus::Running;
        self.attempts = attempt;
        self.started_at = Some(now);
        self.ended_at = None;
        self.duration_ms = None;
        self.timings = None;
        self.result = None;
        self.error = None;
    }

    /// Records a terminal status with an optional error and end time.
    pub fn finish(&mut self, status: OutcomeStatus, error: Option<OutcomeError>, now: Timestamp) {
        self.status = status;
        self.error = error;
        self.ended_at = Some(now);
        self.duration_ms = self.started_at.and_then(|start| start.elapsed_until(&now));
    }
}
