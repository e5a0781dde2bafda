// crates/parity-core/src/core/run.rs
// ============================================================================
// Module: Parity Execution Runs
// Description: Run headers, run snapshots, and derived summaries.
// Purpose: Model the resumable state of one validation run.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An [`ExecutionRun`] is the header of one validation run. It carries the
//! plan (ordered query ids) and a cursor naming the next unprocessed entry.
//! The header plus the outcome map ([`RunSnapshot`]) fully determine the next
//! query to run, independent of process restarts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ExecutionId;
use crate::core::identifiers::QueryId;
use crate::core::outcome::OutcomeStatus;
use crate::core::outcome::QueryOutcome;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Run Status
// ============================================================================

/// Lifecycle status of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Run is in progress or was interrupted.
    Running,
    /// Every outcome succeeded.
    Completed,
    /// At least one outcome failed or was skipped.
    CompletedWithFailures,
    /// The engine could not continue.
    Aborted,
}

impl RunStatus {
    /// Returns true when the run can be resumed.
    #[must_use]
    pub const fn is_incomplete(self) -> bool {
        matches!(self, Self::Running | Self::Aborted)
    }

    /// Returns the stable label for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::CompletedWithFailures => "COMPLETED_WITH_FAILURES",
            Self::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Run Header
// ============================================================================

/// Header of one validation run.
///
/// # Invariants
/// - `cursor <= plan.len()`.
/// - Every entry before `cursor` has a terminal outcome committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRun {
    /// Execution identifier.
    pub execution_id: ExecutionId,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Timestamp of the latest committed transition.
    pub updated_at: Timestamp,
    /// Ordered query ids processed by the current pass.
    pub plan: Vec<QueryId>,
    /// Index of the next unprocessed plan entry.
    pub cursor: usize,
    /// Outcomes currently `SUCCESS`.
    pub completed: u32,
    /// Outcomes currently `FAILED`.
    pub failed: u32,
    /// Outcomes currently `SKIPPED`.
    pub skipped: u32,
    /// Run status.
    pub status: RunStatus,
    /// Number of engine passes over this run (fresh, resume, retry).
    pub pass: u32,
}

impl ExecutionRun {
    /// Creates a new running header for a fresh plan.
    #[must_use]
    pub const fn new(execution_id: ExecutionId, plan: Vec<QueryId>, now: Timestamp) -> Self {
        Self {
            execution_id,
            created_at: now,
            updated_at: now,
            plan,
            cursor: 0,
            completed: 0,
            failed: 0,
            skipped: 0,
            status: RunStatus::Running,
            pass: 1,
        }
    }

    /// Returns the next unprocessed query id, if any.
    #[must_use]
    pub fn next_query(&self) -> Option<&QueryId> {
        self.plan.get(self.cursor)
    }

    /// Recomputes the outcome counters from the outcome map.
    pub fn refresh_counts(&mut self, outcomes: &BTreeMap<QueryId, QueryOutcome>) {
        let summary = RunSummary::from_outcomes(outcomes);
        self.completed = summary.succeeded;
        self.failed = summary.failed;
        self.skipped = summary.skipped;
    }
}

/// Run header plus the full outcome map for that run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Run header.
    pub run: ExecutionRun,
    /// Latest committed outcome per query.
    pub outcomes: BTreeMap<QueryId, QueryOutcome>,
}

impl RunSnapshot {
    /// Returns the run summary for this snapshot.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_outcomes(&self.outcomes)
    }
}

// ============================================================================
// SECTION: Run Summary
// ============================================================================

/// Aggregate counts for a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of outcomes in the run.
    pub total: u32,
    /// Outcomes with `SUCCESS`.
    pub succeeded: u32,
    /// Outcomes with `FAILED`.
    pub failed: u32,
    /// Outcomes with `SKIPPED`.
    pub skipped: u32,
    /// Outcomes still `PENDING` or `RUNNING`.
    pub pending: u32,
    /// Percentage of outcomes that succeeded.
    pub success_rate: f64,
}

impl RunSummary {
    /// Computes a summary over an outcome map.
    #[must_use]
    pub fn from_outcomes(outcomes: &BTreeMap<QueryId, QueryOutcome>) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes.values() {
            summary.total += 1;
            match outcome.status {
                OutcomeStatus::Success => summary.succeeded += 1,
                OutcomeStatus::Failed => summary.failed += 1,
                OutcomeStatus::Skipped => summary.skipped += 1,
                OutcomeStatus::Pending | OutcomeStatus::Running => summary.pending += 1,
            }
        }
        if summary.total > 0 {
            summary.success_rate = f64::from(summary.succeeded) / f64::from(summary.total) * 100.0;
        }
        summary
    }

    /// Derives the terminal run status implied by this summary.
    ///
    /// Returns `None` while any outcome is still pending.
    #[must_use]
    pub const fn terminal_status(&self) -> Option<RunStatus> {
        if self.pending > 0 {
            None
        } else if self.failed > 0 || self.skipped > 0 {
            Some(RunStatus::CompletedWithFailures)
        } else {
            Some(RunStatus::Completed)
        }
    }
}
