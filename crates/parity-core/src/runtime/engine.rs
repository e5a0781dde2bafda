// crates/parity-core/src/runtime/engine.rs
// ============================================================================
// Module: Parity Run Engine
// Description: Resumable orchestrator for validation runs.
// Purpose: Sequence queries, retry transient failures, compare, and checkpoint.
// Dependencies: crate::{core, interfaces, runtime}, tokio
// ============================================================================

//! ## Overview
//! The [`ValidationEngine`] drives one execution at a time through its plan.
//! Each query moves `PENDING -> RUNNING -> {SUCCESS | FAILED}` (or
//! `PENDING -> SKIPPED` when a dependency can never succeed), and every
//! transition is committed through the [`ValidationStateStore`] before the
//! engine acts on it. A terminal outcome and the cursor advance past it are
//! one durability unit, so a crash before that commit replays the query
//! exactly once on resume.
//!
//! Invariants:
//! - In-memory state only changes after the store accepted the commit.
//! - A single query's failure never stops the run; only persistence faults,
//!   lost leases, and plan corruption abort it.
//! - Every commit presents the engine's lease. Each attempt starts with a
//!   commit, so the lease is renewed at least once per attempt, and a commit
//!   after the lease was taken over fails with [`EngineError::ConcurrentRun`].
//! - Cancellation is observed between queries, never mid-comparison.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::core::Dataset;
use crate::core::ExecutionId;
use crate::core::ExecutionRun;
use crate::core::ExecutionTimings;
use crate::core::FailureKind;
use crate::core::OutcomeError;
use crate::core::OutcomeStatus;
use crate::core::QueryDefinition;
use crate::core::QueryId;
use crate::core::QueryOutcome;
use crate::core::RunSnapshot;
use crate::core::RunStatus;
use crate::core::RunSummary;
use crate::interfaces::ArtifactSink;
use crate::interfaces::Clock;
use crate::interfaces::ExecutorError;
use crate::interfaces::LeaseClaim;
use crate::interfaces::QueryExecutor;
use crate::interfaces::ReportSink;
use crate::interfaces::StoreError;
use crate::interfaces::TargetSide;
use crate::interfaces::ValidationStateStore;
use crate::runtime::audit::NoopAuditSink;
use crate::runtime::audit::RunAuditEvent;
use crate::runtime::audit::RunAuditSink;
use crate::runtime::clock::SystemClock;
use crate::runtime::comparator::DEFAULT_SAMPLE_DIFFERENCES_LIMIT;
use crate::runtime::comparator::compare_datasets;
use crate::runtime::plan::ExecutionPlan;
use crate::runtime::plan::PlanError;
use crate::runtime::plan::validate_catalog;
use crate::runtime::retry::RetryPolicy;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default number of attempts for each state commit.
pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 3;
/// Default delay between commit attempts (ms).
pub const DEFAULT_COMMIT_RETRY_DELAY_MS: u64 = 100;
/// Default advisory lease duration (ms).
pub const DEFAULT_LOCK_TTL_MS: u64 = 15 * 60 * 1_000;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Engine tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Backoff policy for retryable executor failures.
    pub retry: RetryPolicy,
    /// Attempts per state commit before the run aborts.
    pub max_commit_attempts: u32,
    /// Delay between commit attempts (ms).
    pub commit_retry_delay_ms: u64,
    /// Lease duration (ms), renewed by every commit.
    pub lock_ttl_ms: u64,
    /// Lease holder identity for this process.
    pub holder: String,
    /// Cap on sample differences recorded per outcome.
    pub sample_differences_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
            commit_retry_delay_ms: DEFAULT_COMMIT_RETRY_DELAY_MS,
            lock_ttl_ms: DEFAULT_LOCK_TTL_MS,
            holder: format!("parity-{}", std::process::id()),
            sample_differences_limit: DEFAULT_SAMPLE_DIFFERENCES_LIMIT,
        }
    }
}

// ============================================================================
// SECTION: Requests and Reports
// ============================================================================

/// How the engine should select the execution to drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunRequest {
    /// Start a new execution over the catalog or a subset of it.
    Start {
        /// Explicit execution id; generated when absent.
        execution_id: Option<ExecutionId>,
        /// Query subset; dependencies are added automatically.
        queries: Option<Vec<QueryId>>,
    },
    /// Resume an execution (most recent incomplete when absent).
    Resume {
        /// Execution to resume.
        execution_id: Option<ExecutionId>,
    },
    /// Re-run failed queries and the skipped queries they blocked (most
    /// recent run when absent).
    RetryFailed {
        /// Execution to retry.
        execution_id: Option<ExecutionId>,
    },
}

/// Result of one engine pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Execution identifier.
    pub execution_id: ExecutionId,
    /// Run status after the pass.
    pub status: RunStatus,
    /// Outcome counts over the whole execution.
    pub summary: RunSummary,
    /// True when the pass stopped on a stop request.
    pub interrupted: bool,
    /// Queries finalized during this pass.
    pub processed: u32,
}

/// Cooperative stop flag checked between queries.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    /// Shared flag.
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    /// Creates an unset stop signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the engine stop before the next query.
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns true when a stop was requested.
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Engine-level faults that end a pass.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Catalog or persisted plan is invalid.
    #[error(transparent)]
    Plan(#[from] PlanError),
    /// State could not be committed.
    #[error("persistence failure: {0}")]
    Persistence(StoreError),
    /// Another process holds the execution lease.
    #[error("concurrent run: execution {execution_id} is held by {holder}")]
    ConcurrentRun {
        /// Execution identifier.
        execution_id: String,
        /// Current lease holder.
        holder: String,
    },
    /// Requested execution does not exist.
    #[error("execution not found: {0}")]
    NotFound(String),
    /// No execution matches an implicit resume or retry.
    #[error("no execution available: {0}")]
    NothingToResume(&'static str),
    /// Requested execution id is already in use.
    #[error("execution already exists: {0}")]
    AlreadyExists(String),
    /// Retry requested while queries of the execution have not finished.
    #[error("execution {execution_id} is incomplete ({query_id} has not finished); resume it first")]
    Incomplete {
        /// Execution identifier.
        execution_id: String,
        /// First unfinished query.
        query_id: String,
    },
}

impl EngineError {
    /// Maps a store error, surfacing lease conflicts distinctly.
    fn from_store(error: StoreError) -> Self {
        match error {
            StoreError::Locked {
                execution_id,
                holder,
            } => Self::ConcurrentRun {
                execution_id,
                holder,
            },
            other => Self::Persistence(other),
        }
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Dependency readiness of a query.
enum DependencyState {
    /// Every dependency succeeded.
    Ready,
    /// A dependency ended without success.
    Blocked {
        /// Blocking dependency.
        dependency: QueryId,
        /// Its terminal status.
        status: OutcomeStatus,
    },
    /// A dependency has not run yet.
    Waiting(QueryId),
}

/// Both sides of a query, materialized.
struct Materialized {
    /// Source dataset.
    source: Box<dyn Dataset>,
    /// Target dataset.
    target: Box<dyn Dataset>,
    /// Source materialization time (ms).
    source_ms: u64,
    /// Target materialization time (ms).
    target_ms: u64,
}

/// Resumable validation run engine.
pub struct ValidationEngine<S, E> {
    /// Query catalog in declaration order.
    catalog: Vec<QueryDefinition>,
    /// Catalog index by query id.
    index: BTreeMap<QueryId, usize>,
    /// Durable state store.
    store: S,
    /// Executor adapter.
    executor: E,
    /// Engine configuration.
    config: EngineConfig,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Advisory report sinks.
    report_sinks: Vec<Arc<dyn ReportSink>>,
    /// Optional per-query artifact exporter.
    artifact_sink: Option<Arc<dyn ArtifactSink>>,
    /// Audit log sink.
    audit: Arc<dyn RunAuditSink>,
    /// Cooperative stop flag.
    stop: StopSignal,
}

impl<S, E> ValidationEngine<S, E>
where
    S: ValidationStateStore,
    E: QueryExecutor,
{
    /// Creates an engine over a validated catalog.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Plan`] when the catalog is invalid.
    pub fn new(
        catalog: Vec<QueryDefinition>,
        store: S,
        executor: E,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let index = validate_catalog(&catalog)?;
        Ok(Self {
            catalog,
            index,
            store,
            executor,
            config,
            clock: Arc::new(SystemClock),
            report_sinks: Vec::new(),
            artifact_sink: None,
            audit: Arc::new(NoopAuditSink),
            stop: StopSignal::new(),
        })
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Adds an advisory report sink.
    #[must_use]
    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.report_sinks.push(sink);
        self
    }

    /// Installs a per-query artifact exporter.
    #[must_use]
    pub fn with_artifact_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.artifact_sink = Some(sink);
        self
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn RunAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Installs a shared stop signal.
    #[must_use]
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Returns the query catalog.
    #[must_use]
    pub fn catalog(&self) -> &[QueryDefinition] {
        &self.catalog
    }

    /// Returns the state store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the stop signal.
    #[must_use]
    pub const fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Builds the plan a `Start` request would run, without executing it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Plan`] when the selection is invalid.
    pub fn plan(&self, queries: Option<&[QueryId]>) -> Result<ExecutionPlan, EngineError> {
        Ok(ExecutionPlan::build(&self.catalog, queries)?)
    }

    /// Drives one pass over an execution.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the run cannot start or must abort.
    pub async fn execute(&self, request: RunRequest) -> Result<RunReport, EngineError> {
        let execution_id = self.resolve_execution_id(&request)?;
        self.store
            .acquire_lock(
                &execution_id,
                &self.config.holder,
                self.clock.now(),
                self.config.lock_ttl_ms,
            )
            .map_err(EngineError::from_store)?;
        let result = self.execute_locked(&execution_id, request).await;
        if let Err(err) = self.store.release_lock(&execution_id, &self.config.holder) {
            self.record(
                RunAuditEvent::new("lock_release_failed", self.clock.now(), &execution_id)
                    .message(err.to_string()),
            );
        }
        result
    }

    /// Prepares and drives an execution while holding its lease.
    async fn execute_locked(
        &self,
        execution_id: &ExecutionId,
        request: RunRequest,
    ) -> Result<RunReport, EngineError> {
        let mut snapshot = self.prepare(execution_id, request).await?;
        match self.drive(&mut snapshot).await {
            Ok(report) => Ok(report),
            Err(err) => {
                self.abort(&mut snapshot, &err);
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Preparation
    // ------------------------------------------------------------------------

    /// Resolves the execution id a request targets.
    fn resolve_execution_id(&self, request: &RunRequest) -> Result<ExecutionId, EngineError> {
        match request {
            RunRequest::Start {
                execution_id, ..
            } => Ok(execution_id.clone().unwrap_or_else(|| ExecutionId::generate(self.clock.now()))),
            RunRequest::Resume {
                execution_id: Some(execution_id),
            }
            | RunRequest::RetryFailed {
                execution_id: Some(execution_id),
            } => Ok(execution_id.clone()),
            RunRequest::Resume {
                execution_id: None,
            } => require(self.store.latest_incomplete(), "no incomplete run to resume"),
            RunRequest::RetryFailed {
                execution_id: None,
            } => require(self.store.latest(), "no run to retry"),
        }
    }

    /// Loads or creates the snapshot for a request and commits its starting state.
    async fn prepare(
        &self,
        execution_id: &ExecutionId,
        request: RunRequest,
    ) -> Result<RunSnapshot, EngineError> {
        let existing = self.store.load(execution_id).map_err(EngineError::Persistence)?;
        match request {
            RunRequest::Start {
                queries, ..
            } => {
                if existing.is_some() {
                    return Err(EngineError::AlreadyExists(execution_id.to_string()));
                }
                let plan = ExecutionPlan::build(&self.catalog, queries.as_deref())?;
                let now = self.clock.now();
                let outcomes: Vec<QueryOutcome> =
                    plan.order.iter().cloned().map(QueryOutcome::pending).collect();
                let mut snapshot = RunSnapshot {
                    run: ExecutionRun::new(execution_id.clone(), plan.order, now),
                    outcomes: BTreeMap::new(),
                };
                let run = snapshot.run.clone();
                self.commit(&mut snapshot, run, outcomes).await?;
                self.record(
                    RunAuditEvent::new("run_started", now, execution_id)
                        .status(RunStatus::Running.as_str())
                        .message(format!("{} queries planned", snapshot.run.plan.len())),
                );
                Ok(snapshot)
            }
            RunRequest::Resume { .. } => {
                let mut snapshot =
                    existing.ok_or_else(|| EngineError::NotFound(execution_id.to_string()))?;
                self.ensure_known(&snapshot.run.plan)?;
                let reset: Vec<QueryOutcome> = snapshot
                    .outcomes
                    .values()
                    .filter(|outcome| outcome.status == OutcomeStatus::Running)
                    .map(|outcome| {
                        let mut outcome = outcome.clone();
                        outcome.reset();
                        outcome
                    })
                    .collect();
                let mut run = snapshot.run.clone();
                run.status = RunStatus::Running;
                run.pass += 1;
                let recovered = reset.len();
                self.commit(&mut snapshot, run, reset).await?;
                self.record(
                    RunAuditEvent::new("run_resumed", self.clock.now(), execution_id)
                        .status(RunStatus::Running.as_str())
                        .message(format!(
                            "cursor {}/{}; {recovered} in-flight queries reset",
                            snapshot.run.cursor,
                            snapshot.run.plan.len()
                        )),
                );
                Ok(snapshot)
            }
            RunRequest::RetryFailed { .. } => {
                let mut snapshot =
                    existing.ok_or_else(|| EngineError::NotFound(execution_id.to_string()))?;
                if let Some(open) =
                    snapshot.outcomes.values().find(|outcome| !outcome.status.is_terminal())
                {
                    return Err(EngineError::Incomplete {
                        execution_id: execution_id.to_string(),
                        query_id: open.query_id.to_string(),
                    });
                }
                let seed = self.retry_seed(&snapshot);
                let plan = ExecutionPlan::reseed(&self.catalog, &seed)?;
                let reset: Vec<QueryOutcome> = seed
                    .iter()
                    .filter_map(|id| snapshot.outcomes.get(id))
                    .map(|outcome| {
                        let mut outcome = outcome.clone();
                        outcome.reset();
                        outcome
                    })
                    .collect();
                let mut run = snapshot.run.clone();
                run.plan = plan.order;
                run.cursor = 0;
                run.status = RunStatus::Running;
                run.pass += 1;
                self.commit(&mut snapshot, run, reset).await?;
                self.record(
                    RunAuditEvent::new("run_retry_seeded", self.clock.now(), execution_id)
                        .status(RunStatus::Running.as_str())
                        .message(format!("{} queries reseeded", snapshot.run.plan.len())),
                );
                Ok(snapshot)
            }
        }
    }

    /// Selects failed queries plus the skipped queries blocked by them,
    /// transitively.
    fn retry_seed(&self, snapshot: &RunSnapshot) -> Vec<QueryId> {
        let mut seed: BTreeSet<QueryId> = snapshot
            .outcomes
            .values()
            .filter(|outcome| outcome.status == OutcomeStatus::Failed)
            .map(|outcome| outcome.query_id.clone())
            .collect();
        loop {
            let blocked: Vec<QueryId> = snapshot
                .outcomes
                .values()
                .filter(|outcome| {
                    outcome.status == OutcomeStatus::Skipped && !seed.contains(&outcome.query_id)
                })
                .filter(|outcome| {
                    self.definition(&outcome.query_id).is_some_and(|query| {
                        query.dependencies.iter().any(|dependency| seed.contains(dependency))
                    })
                })
                .map(|outcome| outcome.query_id.clone())
                .collect();
            if blocked.is_empty() {
                break;
            }
            seed.extend(blocked);
        }
        seed.into_iter().collect()
    }

    /// Returns the catalog definition of a query.
    fn definition(&self, query_id: &QueryId) -> Option<&QueryDefinition> {
        self.index.get(query_id).and_then(|position| self.catalog.get(*position))
    }

    /// Fails when a persisted plan names queries missing from the catalog.
    fn ensure_known(&self, plan: &[QueryId]) -> Result<(), EngineError> {
        if let Some(unknown) = plan.iter().find(|id| !self.index.contains_key(*id)) {
            return Err(
                PlanError::Corrupt(format!("query {unknown} is no longer in the catalog")).into()
            );
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Driving
    // ------------------------------------------------------------------------

    /// Processes the plan from the cursor to the end or a stop request.
    async fn drive(&self, snapshot: &mut RunSnapshot) -> Result<RunReport, EngineError> {
        let mut processed = 0_u32;
        let mut interrupted = false;
        while let Some(query_id) = snapshot.run.next_query().cloned() {
            if self.stop.is_stop_requested() {
                interrupted = true;
                break;
            }
            if self.process_query(snapshot, &query_id).await? {
                processed += 1;
            }
        }
        self.finish(snapshot, interrupted, processed).await
    }

    /// Processes the query at the cursor. Returns true when it was finalized.
    async fn process_query(
        &self,
        snapshot: &mut RunSnapshot,
        query_id: &QueryId,
    ) -> Result<bool, EngineError> {
        let query = self
            .definition(query_id)
            .ok_or_else(|| PlanError::Corrupt(format!("query {query_id} is not in the catalog")))?;
        let mut outcome = snapshot.outcomes.get(query_id).cloned().ok_or_else(|| {
            PlanError::Corrupt(format!("query {query_id} has no outcome record"))
        })?;

        if outcome.status.is_terminal() {
            let mut run = snapshot.run.clone();
            run.cursor += 1;
            self.commit(snapshot, run, Vec::new()).await?;
            return Ok(false);
        }

        match self.dependency_state(snapshot, query)? {
            DependencyState::Ready => {}
            DependencyState::Blocked {
                dependency,
                status,
            } => {
                let now = self.clock.now();
                outcome.finish(
                    OutcomeStatus::Skipped,
                    Some(OutcomeError {
                        kind: FailureKind::Dependency,
                        message: format!("dependency {dependency} finished {status}"),
                    }),
                    now,
                );
                self.record(
                    RunAuditEvent::new("query_skipped", now, &snapshot.run.execution_id)
                        .query(query_id)
                        .status(OutcomeStatus::Skipped.as_str())
                        .error_kind(FailureKind::Dependency)
                        .message(format!("blocked by {dependency}")),
                );
                self.complete_query(snapshot, outcome).await?;
                return Ok(true);
            }
            DependencyState::Waiting(dependency) => {
                return Err(PlanError::Corrupt(format!(
                    "query {query_id} is scheduled before its dependency {dependency}"
                ))
                .into());
            }
        }

        let mut attempt = 0_u32;
        loop {
            attempt += 1;
            outcome.begin_attempt(attempt, self.clock.now());
            let run = snapshot.run.clone();
            self.commit(snapshot, run, vec![outcome.clone()]).await?;
            self.record(
                RunAuditEvent::new(
                    "query_attempt_started",
                    self.clock.now(),
                    &snapshot.run.execution_id,
                )
                .query(query_id)
                .attempt(attempt)
                .status(OutcomeStatus::Running.as_str()),
            );

            match self.materialize(query).await {
                Ok(materialized) => {
                    self.evaluate(query, &mut outcome, materialized);
                    break;
                }
                Err(error) if error.is_retryable() && attempt < query.max_attempts => {
                    let delay = self.config.retry.delay(attempt);
                    self.record(
                        RunAuditEvent::new(
                            "query_retry_scheduled",
                            self.clock.now(),
                            &snapshot.run.execution_id,
                        )
                        .query(query_id)
                        .attempt(attempt)
                        .error_kind(error.kind.failure_kind())
                        .delay_ms(self.config.retry.delay_ms(attempt))
                        .message(error.to_string()),
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(error) => {
                    outcome.finish(
                        OutcomeStatus::Failed,
                        Some(OutcomeError {
                            kind: error.kind.failure_kind(),
                            message: error.to_string(),
                        }),
                        self.clock.now(),
                    );
                    break;
                }
            }
        }

        if let Some(sink) = &self.artifact_sink {
            match sink.export(&snapshot.run.execution_id, query, &outcome) {
                Ok(artifact) => outcome.artifacts = vec![artifact],
                Err(err) => self.record(
                    RunAuditEvent::new(
                        "artifact_export_failed",
                        self.clock.now(),
                        &snapshot.run.execution_id,
                    )
                    .query(query_id)
                    .message(err.to_string()),
                ),
            }
        }
        let mut event =
            RunAuditEvent::new("query_completed", self.clock.now(), &snapshot.run.execution_id)
                .query(query_id)
                .attempt(outcome.attempts)
                .status(outcome.status.as_str());
        if let Some(error) = &outcome.error {
            event = event.error_kind(error.kind).message(error.message.clone());
        }
        self.record(event);
        self.complete_query(snapshot, outcome).await?;
        Ok(true)
    }

    /// Commits a terminal outcome with the cursor advance and notifies sinks.
    async fn complete_query(
        &self,
        snapshot: &mut RunSnapshot,
        outcome: QueryOutcome,
    ) -> Result<(), EngineError> {
        let mut run = snapshot.run.clone();
        run.cursor += 1;
        self.commit(snapshot, run, vec![outcome.clone()]).await?;
        for sink in &self.report_sinks {
            if let Err(err) = sink.on_query_completed(&snapshot.run.execution_id, &outcome) {
                self.record(
                    RunAuditEvent::new(
                        "report_sink_failed",
                        self.clock.now(),
                        &snapshot.run.execution_id,
                    )
                    .query(&outcome.query_id)
                    .message(err.to_string()),
                );
            }
        }
        Ok(())
    }

    /// Classifies the dependencies of a query against committed outcomes.
    fn dependency_state(
        &self,
        snapshot: &RunSnapshot,
        query: &QueryDefinition,
    ) -> Result<DependencyState, EngineError> {
        for dependency in &query.dependencies {
            let Some(outcome) = snapshot.outcomes.get(dependency) else {
                return Err(PlanError::Corrupt(format!(
                    "dependency {dependency} of {} is not part of the execution",
                    query.id
                ))
                .into());
            };
            match outcome.status {
                OutcomeStatus::Success => {}
                OutcomeStatus::Failed | OutcomeStatus::Skipped => {
                    return Ok(DependencyState::Blocked {
                        dependency: dependency.clone(),
                        status: outcome.status,
                    });
                }
                OutcomeStatus::Pending | OutcomeStatus::Running => {
                    return Ok(DependencyState::Waiting(dependency.clone()));
                }
            }
        }
        Ok(DependencyState::Ready)
    }

    /// Materializes both sides concurrently under the query timeout.
    async fn materialize(&self, query: &QueryDefinition) -> Result<Materialized, ExecutorError> {
        let side = |side: TargetSide| async move {
            let started = Instant::now();
            let dataset = self
                .executor
                .materialize(query, side)
                .await
                .map_err(|err| err.with_side(side))?;
            Ok::<_, ExecutorError>((dataset, elapsed_ms(started)))
        };
        let both = async { tokio::try_join!(side(TargetSide::Source), side(TargetSide::Target)) };
        match tokio::time::timeout(Duration::from_millis(query.timeout_ms), both).await {
            Ok(Ok(((source, source_ms), (target, target_ms)))) => Ok(Materialized {
                source,
                target,
                source_ms,
                target_ms,
            }),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(ExecutorError::timeout(
                None,
                format!("materialization exceeded {} ms", query.timeout_ms),
            )),
        }
    }

    /// Compares materialized datasets and records the terminal outcome.
    fn evaluate(
        &self,
        query: &QueryDefinition,
        outcome: &mut QueryOutcome,
        materialized: Materialized,
    ) {
        let Materialized {
            source,
            target,
            source_ms,
            target_ms,
        } = materialized;
        outcome.source_rows = Some(source.row_count());
        outcome.target_rows = Some(target.row_count());
        let started = Instant::now();
        let compared = compare_datasets(
            query,
            source.as_ref(),
            target.as_ref(),
            self.config.sample_differences_limit,
        );
        outcome.timings = Some(ExecutionTimings {
            source_ms,
            target_ms,
            comparison_ms: elapsed_ms(started),
        });
        let (status, error) = match compared {
            Ok(result) => {
                let verdict = if result.matched {
                    (OutcomeStatus::Success, None)
                } else {
                    (
                        OutcomeStatus::Failed,
                        Some(OutcomeError {
                            kind: FailureKind::DataMismatch,
                            message: format!(
                                "{} discrepancies ({:.2}% of {} rows matched)",
                                result.discrepancy_count,
                                result.match_percentage,
                                result.total_compared
                            ),
                        }),
                    )
                };
                outcome.result = Some(result);
                verdict
            }
            Err(err) => (
                OutcomeStatus::Failed,
                Some(OutcomeError {
                    kind: err.failure_kind(),
                    message: err.to_string(),
                }),
            ),
        };
        outcome.finish(status, error, self.clock.now());
    }

    // ------------------------------------------------------------------------
    // Completion
    // ------------------------------------------------------------------------

    /// Commits the final header for the pass and notifies sinks.
    async fn finish(
        &self,
        snapshot: &mut RunSnapshot,
        interrupted: bool,
        processed: u32,
    ) -> Result<RunReport, EngineError> {
        let summary = snapshot.summary();
        let status = if interrupted {
            RunStatus::Running
        } else {
            summary.terminal_status().ok_or_else(|| {
                PlanError::Corrupt(format!(
                    "{} outcomes are pending after the plan completed",
                    summary.pending
                ))
            })?
        };
        let mut run = snapshot.run.clone();
        run.status = status;
        self.commit(snapshot, run, Vec::new()).await?;
        let event = if interrupted { "run_interrupted" } else { "run_completed" };
        self.record(
            RunAuditEvent::new(event, self.clock.now(), &snapshot.run.execution_id)
                .status(status.as_str())
                .message(format!(
                    "{} succeeded, {} failed, {} skipped, {} pending",
                    summary.succeeded, summary.failed, summary.skipped, summary.pending
                )),
        );
        if !interrupted {
            self.notify_run_completed(snapshot);
        }
        Ok(RunReport {
            execution_id: snapshot.run.execution_id.clone(),
            status,
            summary,
            interrupted,
            processed,
        })
    }

    /// Marks the run aborted (best effort) after an engine fault.
    fn abort(&self, snapshot: &mut RunSnapshot, error: &EngineError) {
        let now = self.clock.now();
        let execution_id = snapshot.run.execution_id.clone();
        if !matches!(error, EngineError::ConcurrentRun { .. }) {
            let mut run = snapshot.run.clone();
            run.status = RunStatus::Aborted;
            run.updated_at = now;
            if self.store.commit(&run, &[], &self.lease()).is_ok() {
                snapshot.run = run;
            }
        }
        self.record(
            RunAuditEvent::new("run_aborted", now, &execution_id)
                .status(RunStatus::Aborted.as_str())
                .message(error.to_string()),
        );
        self.notify_run_completed(snapshot);
    }

    /// Sends the run summary to every report sink.
    fn notify_run_completed(&self, snapshot: &RunSnapshot) {
        for sink in &self.report_sinks {
            if let Err(err) =
                sink.on_run_completed(&snapshot.run.execution_id, &snapshot.run, &snapshot.outcomes)
            {
                self.record(
                    RunAuditEvent::new(
                        "report_sink_failed",
                        self.clock.now(),
                        &snapshot.run.execution_id,
                    )
                    .message(err.to_string()),
                );
            }
        }
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    /// Commits a new header plus changed outcomes, retrying transient faults.
    ///
    /// The snapshot is only updated once the store accepted the commit.
    async fn commit(
        &self,
        snapshot: &mut RunSnapshot,
        mut run: ExecutionRun,
        changed: Vec<QueryOutcome>,
    ) -> Result<(), EngineError> {
        let mut merged = snapshot.outcomes.clone();
        for outcome in &changed {
            merged.insert(outcome.query_id.clone(), outcome.clone());
        }
        run.refresh_counts(&merged);
        run.updated_at = self.clock.now();

        let attempts = self.config.max_commit_attempts.max(1);
        let mut last_error = None;
        for attempt in 1 ..= attempts {
            match self.store.commit(&run, &changed, &self.lease()) {
                Ok(()) => {
                    snapshot.run = run;
                    snapshot.outcomes = merged;
                    return Ok(());
                }
                Err(err @ StoreError::Locked { .. }) => {
                    self.record(
                        RunAuditEvent::new("lease_lost", self.clock.now(), &run.execution_id)
                            .attempt(attempt)
                            .message(err.to_string()),
                    );
                    return Err(EngineError::from_store(err));
                }
                Err(err) => {
                    self.record(
                        RunAuditEvent::new("commit_failed", self.clock.now(), &run.execution_id)
                            .attempt(attempt)
                            .message(err.to_string()),
                    );
                    last_error = Some(err);
                    if attempt < attempts && self.config.commit_retry_delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.config.commit_retry_delay_ms))
                            .await;
                    }
                }
            }
        }
        Err(EngineError::Persistence(
            last_error.unwrap_or_else(|| StoreError::Store("commit was not attempted".to_string())),
        ))
    }

    /// Builds the lease claim presented with a commit.
    fn lease(&self) -> LeaseClaim {
        LeaseClaim::new(self.config.holder.clone(), self.clock.now(), self.config.lock_ttl_ms)
    }

    /// Records an audit event.
    fn record(&self, event: RunAuditEvent) {
        self.audit.record(&event);
    }
}

/// Unwraps an implicit execution lookup.
fn require(
    found: Result<Option<ExecutionId>, StoreError>,
    what: &'static str,
) -> Result<ExecutionId, EngineError> {
    found.map_err(EngineError::Persistence)?.ok_or(EngineError::NothingToResume(what))
}

/// Returns elapsed milliseconds since `started`.
fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
