// crates/parity-core/src/interfaces/mod.rs
// ============================================================================
// Module: Parity Interfaces
// Description: Backend-agnostic interfaces for execution, storage, and reporting.
// Purpose: Define the contract surfaces used by the Parity run engine.
// Dependencies: crate::core, async-trait
// ============================================================================

//! ## Overview
//! Interfaces define how the run engine integrates with warehouses, durable
//! state, and report renderers without embedding backend-specific details.
//! Store implementations must be crash-consistent and fail closed on corrupt
//! data; executors classify every failure so the engine can decide whether to
//! retry; sinks are advisory and never fail a run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::ArtifactRef;
use crate::core::Dataset;
use crate::core::ExecutionId;
use crate::core::ExecutionRun;
use crate::core::FailureKind;
use crate::core::QueryDefinition;
use crate::core::QueryId;
use crate::core::QueryOutcome;
use crate::core::RunSnapshot;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Query Executor
// ============================================================================

/// Side of a comparison a dataset is materialized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSide {
    /// Reference (legacy) system.
    Source,
    /// System under validation.
    Target,
}

impl TargetSide {
    /// Returns the stable label for this side.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
        }
    }
}

impl fmt::Display for TargetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of executor failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorErrorKind {
    /// Network or connection failure.
    Connection,
    /// Materialization exceeded its deadline.
    Timeout,
    /// Authentication or authorization failure.
    Permission,
    /// Malformed query or rejected statement.
    Query,
}

impl ExecutorErrorKind {
    /// Returns the outcome failure kind for this executor failure.
    #[must_use]
    pub const fn failure_kind(self) -> FailureKind {
        match self {
            Self::Connection => FailureKind::Connection,
            Self::Timeout => FailureKind::Timeout,
            Self::Permission => FailureKind::Permission,
            Self::Query => FailureKind::Query,
        }
    }
}

/// Classified executor failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} error ({}): {message}", kind_label(.kind), side_label(.side))]
pub struct ExecutorError {
    /// Failure classification.
    pub kind: ExecutorErrorKind,
    /// Side that failed, when attributable.
    pub side: Option<TargetSide>,
    /// Human-readable message.
    pub message: String,
}

impl ExecutorError {
    /// Creates a classified executor error.
    #[must_use]
    pub fn new(kind: ExecutorErrorKind, side: Option<TargetSide>, message: impl Into<String>) -> Self {
        Self {
            kind,
            side,
            message: message.into(),
        }
    }

    /// Creates a connection error for a side.
    #[must_use]
    pub fn connection(side: TargetSide, message: impl Into<String>) -> Self {
        Self::new(ExecutorErrorKind::Connection, Some(side), message)
    }

    /// Creates a timeout error for a side.
    #[must_use]
    pub fn timeout(side: Option<TargetSide>, message: impl Into<String>) -> Self {
        Self::new(ExecutorErrorKind::Timeout, side, message)
    }

    /// Creates a permission error for a side.
    #[must_use]
    pub fn permission(side: TargetSide, message: impl Into<String>) -> Self {
        Self::new(ExecutorErrorKind::Permission, Some(side), message)
    }

    /// Creates a query error for a side.
    #[must_use]
    pub fn query(side: TargetSide, message: impl Into<String>) -> Self {
        Self::new(ExecutorErrorKind::Query, Some(side), message)
    }

    /// Returns true when the engine may retry the attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.failure_kind().is_retryable()
    }

    /// Attributes the error to a side when the executor did not.
    #[must_use]
    pub fn with_side(mut self, side: TargetSide) -> Self {
        if self.side.is_none() {
            self.side = Some(side);
        }
        self
    }
}

/// Renders an executor error kind for error messages.
const fn kind_label(kind: &ExecutorErrorKind) -> &'static str {
    kind.failure_kind().as_str()
}

/// Renders an optional side for error messages.
const fn side_label(side: &Option<TargetSide>) -> &'static str {
    match side {
        Some(side) => side.as_str(),
        None => "both sides",
    }
}

/// Executor adapter that materializes one side of a query.
///
/// Implementations must not retry internally; the engine owns retry policy.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Materializes the query's result set on the requested side.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] classified as connection, timeout,
    /// permission, or query failure.
    async fn materialize(
        &self,
        query: &QueryDefinition,
        side: TargetSide,
    ) -> Result<Box<dyn Dataset>, ExecutorError>;
}

// ============================================================================
// SECTION: State Store
// ============================================================================

/// Validation state store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("validation state store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("validation state store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("validation state store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("validation state store invalid data: {0}")]
    Invalid(String),
    /// Another holder owns the run lease.
    #[error("execution {execution_id} is locked by {holder}")]
    Locked {
        /// Locked execution identifier.
        execution_id: String,
        /// Current lease holder.
        holder: String,
    },
    /// Store reported an error.
    #[error("validation state store error: {0}")]
    Store(String),
}

/// Holder placed in [`StoreError::Locked`] when no lease row exists.
pub const RELEASED_LEASE_HOLDER: &str = "(released)";

/// Lease presented with every commit.
///
/// The store accepts the commit only while `holder` still owns the
/// execution's lease, and extends that lease to `now + ttl_ms` in the same
/// transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseClaim {
    /// Lease holder identity.
    pub holder: String,
    /// Time of the commit.
    pub now: Timestamp,
    /// Lease duration granted by the commit (ms).
    pub ttl_ms: u64,
}

impl LeaseClaim {
    /// Creates a lease claim.
    #[must_use]
    pub fn new(holder: impl Into<String>, now: Timestamp, ttl_ms: u64) -> Self {
        Self {
            holder: holder.into(),
            now,
            ttl_ms,
        }
    }

    /// Returns the expiry tick granted by this claim.
    #[must_use]
    pub fn expires_at(&self) -> i64 {
        self.now.ticks().saturating_add(i64::try_from(self.ttl_ms).unwrap_or(i64::MAX))
    }
}

/// Durable, crash-consistent validation state store.
///
/// # Invariants
/// - `commit` persists the header and every supplied outcome together, or
///   nothing.
/// - `commit` is fenced by the lease: a holder that lost its lease (taken
///   over or released) can no longer write.
/// - The latest committed outcome for a query is never lost.
pub trait ValidationStateStore: Send + Sync {
    /// Loads a run snapshot by execution identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails or data is corrupt.
    fn load(&self, execution_id: &ExecutionId) -> Result<Option<RunSnapshot>, StoreError>;

    /// Atomically persists the run header and the changed outcomes, and
    /// renews the lease named by `lease`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Locked`] when `lease.holder` no longer owns the
    /// execution's lease, or [`StoreError`] when the commit cannot be made
    /// durable.
    fn commit(
        &self,
        run: &ExecutionRun,
        outcomes: &[QueryOutcome],
        lease: &LeaseClaim,
    ) -> Result<(), StoreError>;

    /// Returns the most recently created run that is `RUNNING` or `ABORTED`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn latest_incomplete(&self) -> Result<Option<ExecutionId>, StoreError>;

    /// Returns the most recently created run of any status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn latest(&self) -> Result<Option<ExecutionId>, StoreError>;

    /// Lists run headers, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the listing fails.
    fn list_runs(&self, limit: usize) -> Result<Vec<ExecutionRun>, StoreError>;

    /// Acquires or renews the advisory lease for an execution.
    ///
    /// A lease held by `holder` is renewed; a lease held by anyone else that
    /// has not expired at `now` fails with [`StoreError::Locked`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Locked`] when another holder owns a live lease.
    fn acquire_lock(
        &self,
        execution_id: &ExecutionId,
        holder: &str,
        now: Timestamp,
        ttl_ms: u64,
    ) -> Result<(), StoreError>;

    /// Releases the advisory lease when held by `holder`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the release cannot be persisted.
    fn release_lock(&self, execution_id: &ExecutionId, holder: &str) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Report Sink
// ============================================================================

/// Report sink errors.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Sink I/O failed.
    #[error("report sink io error: {0}")]
    Io(String),
    /// Sink could not serialize a payload.
    #[error("report sink serialization error: {0}")]
    Serialization(String),
    /// Sink is closed or full.
    #[error("report sink unavailable: {0}")]
    Unavailable(String),
}

/// Advisory consumer of outcomes and run summaries.
pub trait ReportSink: Send + Sync {
    /// Receives a committed query outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] on delivery failure; the engine ignores it.
    fn on_query_completed(
        &self,
        execution_id: &ExecutionId,
        outcome: &QueryOutcome,
    ) -> Result<(), SinkError>;

    /// Receives the final run header and outcome map.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] on delivery failure; the engine ignores it.
    fn on_run_completed(
        &self,
        execution_id: &ExecutionId,
        run: &ExecutionRun,
        outcomes: &BTreeMap<QueryId, QueryOutcome>,
    ) -> Result<(), SinkError>;
}

// ============================================================================
// SECTION: Artifact Sink
// ============================================================================

/// Artifact export errors.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Artifact sink I/O failed.
    #[error("artifact sink io error: {0}")]
    Io(String),
    /// Artifact could not be serialized.
    #[error("artifact serialization error: {0}")]
    Serialization(String),
}

/// Exporter for per-query artifacts referenced by outcomes.
pub trait ArtifactSink: Send + Sync {
    /// Exports a per-query artifact and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when the export fails.
    fn export(
        &self,
        execution_id: &ExecutionId,
        query: &QueryDefinition,
        outcome: &QueryOutcome,
    ) -> Result<ArtifactRef, ArtifactError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Time source for persisted timestamps.
pub trait Clock: Send + Sync {
    /// Returns the current timestamp.
    fn now(&self) -> Timestamp;
}
