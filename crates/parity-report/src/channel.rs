// crates/parity-report/src/channel.rs
// ============================================================================
// Module: Channel Report Sink
// Description: Report sink forwarding events through a Tokio mpsc channel.
// Purpose: Let hosts observe run progress asynchronously.
// Dependencies: parity-core, tokio
// ============================================================================

//! ## Overview
//! [`ChannelSink`] converts sink callbacks into [`ReportEvent`] messages and
//! enqueues them with `try_send`. The engine never blocks on a slow
//! consumer: a full or closed channel surfaces as
//! [`SinkError::Unavailable`], which the engine logs and ignores.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use parity_core::ExecutionId;
use parity_core::ExecutionRun;
use parity_core::QueryId;
use parity_core::QueryOutcome;
use parity_core::ReportSink;
use parity_core::RunSummary;
use parity_core::SinkError;
use tokio::sync::mpsc::Sender;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Event delivered through a [`ChannelSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    /// A query outcome was committed.
    QueryCompleted {
        /// Execution identifier.
        execution_id: ExecutionId,
        /// Committed outcome.
        outcome: QueryOutcome,
    },
    /// A run reached a terminal status.
    RunCompleted {
        /// Execution identifier.
        execution_id: ExecutionId,
        /// Final run header.
        run: ExecutionRun,
        /// Aggregate counts.
        summary: RunSummary,
    },
}

// ============================================================================
// SECTION: Channel Sink
// ============================================================================

/// Channel-based report sink.
///
/// # Invariants
/// - Each successful callback enqueues exactly one [`ReportEvent`].
#[derive(Debug)]
pub struct ChannelSink {
    /// Sender used to dispatch events.
    sender: Sender<ReportEvent>,
}

impl ChannelSink {
    /// Creates a channel sink.
    #[must_use]
    pub const fn new(sender: Sender<ReportEvent>) -> Self {
        Self {
            sender,
        }
    }

    /// Enqueues one event without waiting.
    fn send(&self, event: ReportEvent) -> Result<(), SinkError> {
        self.sender.try_send(event).map_err(|err| SinkError::Unavailable(err.to_string()))
    }
}

impl ReportSink for ChannelSink {
    fn on_query_completed(
        &self,
        execution_id: &ExecutionId,
        outcome: &QueryOutcome,
    ) -> Result<(), SinkError> {
        self.send(ReportEvent::QueryCompleted {
            execution_id: execution_id.clone(),
            outcome: outcome.clone(),
        })
    }

    fn on_run_completed(
        &self,
        execution_id: &ExecutionId,
        run: &ExecutionRun,
        outcomes: &BTreeMap<QueryId, QueryOutcome>,
    ) -> Result<(), SinkError> {
        self.send(ReportEvent::RunCompleted {
            execution_id: execution_id.clone(),
            run: run.clone(),
            summary: RunSummary::from_outcomes(outcomes),
        })
    }
}
