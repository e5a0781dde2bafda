// crates/parity-core/src/runtime/audit.rs
// ============================================================================
// Module: Parity Run Audit Logging
// Description: Structured audit events for run and query transitions.
// Purpose: Emit JSON-lines logs without hard dependencies on a logging stack.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The engine reports every run and query transition (start, attempt, retry,
//! commit failure, sink failure, completion) as a [`RunAuditEvent`]. Sinks
//! serialize events as one JSON object per line so deployments can route
//! them to any log pipeline. Audit sinks never fail the run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;

use crate::core::ExecutionId;
use crate::core::FailureKind;
use crate::core::QueryId;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Run audit event payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp from the engine clock.
    pub timestamp: Timestamp,
    /// Execution identifier.
    pub execution_id: String,
    /// Query identifier when the event concerns one query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    /// Attempt number when relevant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    /// Status label when relevant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    /// Failure classification when relevant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    /// Scheduled delay (ms) before the next attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    /// Free-form detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RunAuditEvent {
    /// Creates a run-level event.
    #[must_use]
    pub fn new(event: &'static str, timestamp: Timestamp, execution_id: &ExecutionId) -> Self {
        Self {
            event,
            timestamp,
            execution_id: execution_id.to_string(),
            query_id: None,
            attempt: None,
            status: None,
            error_kind: None,
            delay_ms: None,
            message: None,
        }
    }

    /// Attaches a query identifier.
    #[must_use]
    pub fn query(mut self, query_id: &QueryId) -> Self {
        self.query_id = Some(query_id.to_string());
        self
    }

    /// Attaches an attempt number.
    #[must_use]
    pub const fn attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    /// Attaches a status label.
    #[must_use]
    pub const fn status(mut self, status: &'static str) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a failure classification.
    #[must_use]
    pub const fn error_kind(mut self, kind: FailureKind) -> Self {
        self.error_kind = Some(kind);
        self
    }

    /// Attaches a retry delay.
    #[must_use]
    pub const fn delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    /// Attaches a message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for run events.
pub trait RunAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &RunAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl RunAuditSink for StderrAuditSink {
    fn record(&self, event: &RunAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl RunAuditSink for FileAuditSink {
    fn record(&self, event: &RunAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl RunAuditSink for NoopAuditSink {
    fn record(&self, _event: &RunAuditEvent) {}
}

/// Audit sink that keeps events in memory (tests and embedding hosts).
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Recorded events.
    events: Mutex<Vec<RunAuditEvent>>,
}

impl MemoryAuditSink {
    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<RunAuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl RunAuditSink for MemoryAuditSink {
    fn record(&self, event: &RunAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
