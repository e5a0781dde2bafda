// crates/parity-report/src/composite.rs
// ============================================================================
// Module: Composite Report Sink
// Description: Fans sink callbacks out to several sinks.
// Purpose: Attach a ledger, summary writer, and observers to one engine.
// Dependencies: parity-core
// ============================================================================

//! ## Overview
//! [`CompositeSink`] forwards every callback to each inner sink in order.
//! A failing sink does not stop delivery to the others; the first error is
//! returned after all sinks have been called.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use parity_core::ExecutionId;
use parity_core::ExecutionRun;
use parity_core::QueryId;
use parity_core::QueryOutcome;
use parity_core::ReportSink;
use parity_core::SinkError;

// ============================================================================
// SECTION: Composite Sink
// ============================================================================

/// Report sink delivering to a list of sinks.
#[derive(Default, Clone)]
pub struct CompositeSink {
    /// Inner sinks in delivery order.
    sinks: Vec<Arc<dyn ReportSink>>,
}

impl CompositeSink {
    /// Creates an empty composite sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Returns the number of inner sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns true when no sinks are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Calls `deliver` on every sink and keeps the first error.
    fn fan_out(
        &self,
        deliver: impl Fn(&dyn ReportSink) -> Result<(), SinkError>,
    ) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(err) = deliver(sink.as_ref()) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl ReportSink for CompositeSink {
    fn on_query_completed(
        &self,
        execution_id: &ExecutionId,
        outcome: &QueryOutcome,
    ) -> Result<(), SinkError> {
        self.fan_out(|sink| sink.on_query_completed(execution_id, outcome))
    }

    fn on_run_completed(
        &self,
        execution_id: &ExecutionId,
        run: &ExecutionRun,
        outcomes: &BTreeMap<QueryId, QueryOutcome>,
    ) -> Result<(), SinkError> {
        self.fan_out(|sink| sink.on_run_completed(execution_id, run, outcomes))
    }
}
