// crates/parity-core/tests/common/mod.rs
// ============================================================================
// Module: Shared Engine Test Fixtures
// Description: Scripted executors, lazy datasets, and fault-injecting stores.
// Purpose: Drive the run engine deterministically from integration tests.
// Dependencies: parity-core, serde_json
// ============================================================================

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only helpers; not every test file uses every fixture."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use parity_core::Clock;
use parity_core::ColumnSchema;
use parity_core::ColumnType;
use parity_core::ComparisonStrategy;
use parity_core::Dataset;
use parity_core::DatasetError;
use parity_core::EngineConfig;
use parity_core::ExecutionId;
use parity_core::ExecutionRun;
use parity_core::ExecutorError;
use parity_core::LeaseClaim;
use parity_core::MaterializedDataset;
use parity_core::OutcomeStatus;
use parity_core::QueryCategory;
use parity_core::QueryDefinition;
use parity_core::QueryExecutor;
use parity_core::QueryId;
use parity_core::QueryOutcome;
use parity_core::RetryPolicy;
use parity_core::Row;
use parity_core::RowOrder;
use parity_core::RowStream;
use parity_core::RunSnapshot;
use parity_core::StoreError;
use parity_core::TargetSide;
use parity_core::Timestamp;
use parity_core::ValidationStateStore;
use serde_json::Value;

// ============================================================================
// SECTION: Definitions
// ============================================================================

/// Builds an exact-match query with test-friendly limits.
pub fn exact(id: &str) -> QueryDefinition {
    QueryDefinition::new(
        id,
        QueryCategory::Content,
        ComparisonStrategy::ExactMatch,
        format!("SELECT * FROM {id}"),
    )
}

/// Builds an exact-match query with dependencies.
pub fn exact_after(id: &str, dependencies: &[&str]) -> QueryDefinition {
    let mut query = exact(id);
    query.dependencies = dependencies.iter().map(|dep| QueryId::new(*dep)).collect();
    query
}

/// Engine config without backoff delays.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        retry: RetryPolicy::immediate(),
        commit_retry_delay_ms: 0,
        holder: "test-holder".to_string(),
        ..EngineConfig::default()
    }
}

/// Builds a dataset from a JSON array of objects.
pub fn table(records: Value) -> MaterializedDataset {
    let Value::Array(items) = records else {
        panic!("table fixture must be an array");
    };
    let records = items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => map,
            other => panic!("table row must be an object: {other}"),
        })
        .collect();
    MaterializedDataset::from_records(records).expect("table fixture")
}

// ============================================================================
// SECTION: Manual Clock
// ============================================================================

/// Wall clock that only moves when a test advances it.
#[derive(Debug)]
pub struct ManualClock {
    /// Current unix milliseconds.
    millis: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at `millis`.
    pub fn at(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Moves the clock forward by `millis`.
    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::UnixMillis(self.millis.load(Ordering::SeqCst))
    }
}

// ============================================================================
// SECTION: Scripted Executor
// ============================================================================

/// Produces a dataset (or error) for the n-th call on one side (1-based).
pub type Producer = Arc<dyn Fn(u32) -> Result<Box<dyn Dataset>, ExecutorError> + Send + Sync>;

/// Script entries and call counts.
#[derive(Default)]
struct Script {
    /// Producers keyed by query id and side label.
    producers: BTreeMap<(String, &'static str), Producer>,
    /// Calls keyed by query id and side label.
    calls: BTreeMap<(String, &'static str), u32>,
}

/// Executor answering from a per-query script.
#[derive(Clone, Default)]
pub struct ScriptedExecutor {
    /// Shared script state.
    script: Arc<Mutex<Script>>,
}

impl ScriptedExecutor {
    /// Installs a producer for one side of a query.
    pub fn on(&self, query: &str, side: TargetSide, producer: Producer) {
        self.script.lock().unwrap().producers.insert((query.to_string(), side.as_str()), producer);
    }

    /// Serves the same dataset on both sides.
    pub fn same(&self, query: &str, dataset: &MaterializedDataset) {
        self.serve(query, dataset, dataset);
    }

    /// Serves fixed source and target datasets.
    pub fn serve(&self, query: &str, source: &MaterializedDataset, target: &MaterializedDataset) {
        let source = source.clone();
        let target = target.clone();
        self.on(query, TargetSide::Source, Arc::new(move |_| Ok(Box::new(source.clone()))));
        self.on(query, TargetSide::Target, Arc::new(move |_| Ok(Box::new(target.clone()))));
    }

    /// Fails both sides with a fixed error.
    pub fn fail(&self, query: &str, error: ExecutorError) {
        let source_error = error.clone();
        self.on(query, TargetSide::Source, Arc::new(move |_| Err(source_error.clone())));
        self.on(query, TargetSide::Target, Arc::new(move |_| Err(error.clone())));
    }

    /// Returns how many times the source side of a query was materialized.
    pub fn calls(&self, query: &str) -> u32 {
        self.script
            .lock()
            .unwrap()
            .calls
            .get(&(query.to_string(), TargetSide::Source.as_str()))
            .copied()
            .unwrap_or(0)
    }

    /// Returns the total number of source materializations.
    pub fn total_calls(&self) -> u32 {
        let script = self.script.lock().unwrap();
        script
            .calls
            .iter()
            .filter(|((_, side), _)| *side == TargetSide::Source.as_str())
            .map(|(_, count)| *count)
            .sum()
    }
}

#[async_trait]
impl QueryExecutor for ScriptedExecutor {
    async fn materialize(
        &self,
        query: &QueryDefinition,
        side: TargetSide,
    ) -> Result<Box<dyn Dataset>, ExecutorError> {
        let (producer, call) = {
            let mut script = self.script.lock().unwrap();
            let key = (query.id.to_string(), side.as_str());
            let call = script.calls.entry(key.clone()).or_insert(0);
            *call += 1;
            let call = *call;
            let producer = script.producers.get(&key).cloned();
            (producer, call)
        };
        match producer {
            Some(producer) => producer(call),
            None => Err(ExecutorError::query(side, format!("no script for {}", query.id))),
        }
    }
}

// ============================================================================
// SECTION: Lazy Dataset
// ============================================================================

/// Generated `(id, value)` dataset sorted by `id`, counting rows read.
pub struct CountingDataset {
    /// Column schema.
    columns: Vec<ColumnSchema>,
    /// Number of rows.
    rows: u64,
    /// Rows handed out so far.
    read: Arc<AtomicU64>,
    /// Value generator.
    value: fn(u64) -> Value,
}

impl CountingDataset {
    /// Creates a dataset of `rows` rows with values from `value`.
    pub fn new(rows: u64, value: fn(u64) -> Value, read: Arc<AtomicU64>) -> Self {
        Self {
            columns: vec![
                ColumnSchema::new("id", ColumnType::Integer),
                ColumnSchema::new("value", ColumnType::Integer),
            ],
            rows,
            read,
            value,
        }
    }
}

impl Dataset for CountingDataset {
    fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    fn row_count(&self) -> u64 {
        self.rows
    }

    fn rows(&self, _order: &RowOrder) -> Result<Box<dyn RowStream + '_>, DatasetError> {
        Ok(Box::new(CountingStream {
            dataset: self,
            next: 0,
        }))
    }
}

/// Stream over a [`CountingDataset`].
struct CountingStream<'a> {
    /// Source dataset.
    dataset: &'a CountingDataset,
    /// Next row index.
    next: u64,
}

impl RowStream for CountingStream<'_> {
    fn next_row(&mut self) -> Result<Option<Row>, DatasetError> {
        if self.next >= self.dataset.rows {
            return Ok(None);
        }
        let index = self.next;
        self.next += 1;
        self.dataset.read.fetch_add(1, Ordering::SeqCst);
        Ok(Some(vec![Value::from(index), (self.dataset.value)(index)]))
    }
}

// ============================================================================
// SECTION: Fault-Injecting Store
// ============================================================================

/// Store wrapper that fails selected commits.
#[derive(Clone)]
pub struct FlakyStore<S> {
    /// Wrapped store.
    inner: S,
    /// Query whose terminal commit fails.
    fail_terminal_for: Arc<Mutex<Option<QueryId>>>,
    /// Remaining commits to fail unconditionally.
    fail_next: Arc<AtomicU64>,
    /// Commits attempted.
    commits: Arc<AtomicU64>,
}

impl<S: ValidationStateStore> FlakyStore<S> {
    /// Wraps a store.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_terminal_for: Arc::new(Mutex::new(None)),
            fail_next: Arc::new(AtomicU64::new(0)),
            commits: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Rejects every commit that records a terminal outcome for `query`.
    pub fn fail_terminal_commit(&self, query: &str) {
        *self.fail_terminal_for.lock().unwrap() = Some(QueryId::new(query));
    }

    /// Stops injecting terminal commit failures.
    pub fn heal(&self) {
        *self.fail_terminal_for.lock().unwrap() = None;
        self.fail_next.store(0, Ordering::SeqCst);
    }

    /// Rejects the next `count` commits.
    pub fn fail_next_commits(&self, count: u64) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Returns the number of attempted commits.
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }
}

impl<S: ValidationStateStore> ValidationStateStore for FlakyStore<S> {
    fn load(&self, execution_id: &ExecutionId) -> Result<Option<RunSnapshot>, StoreError> {
        self.inner.load(execution_id)
    }

    fn commit(
        &self,
        run: &ExecutionRun,
        outcomes: &[QueryOutcome],
        lease: &LeaseClaim,
    ) -> Result<(), StoreError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        let pending_failures = self.fail_next.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.fail_next.store(pending_failures - 1, Ordering::SeqCst);
            return Err(StoreError::Io("injected commit failure".to_string()));
        }
        let target = self.fail_terminal_for.lock().unwrap().clone();
        if let Some(target) = target
            && outcomes
                .iter()
                .any(|outcome| outcome.query_id == target && outcome.status.is_terminal())
        {
            return Err(StoreError::Io(format!("injected crash before committing {target}")));
        }
        self.inner.commit(run, outcomes, lease)
    }

    fn latest_incomplete(&self) -> Result<Option<ExecutionId>, StoreError> {
        self.inner.latest_incomplete()
    }

    fn latest(&self) -> Result<Option<ExecutionId>, StoreError> {
        self.inner.latest()
    }

    fn list_runs(&self, limit: usize) -> Result<Vec<ExecutionRun>, StoreError> {
        self.inner.list_runs(limit)
    }

    fn acquire_lock(
        &self,
        execution_id: &ExecutionId,
        holder: &str,
        now: Timestamp,
        ttl_ms: u64,
    ) -> Result<(), StoreError> {
        self.inner.acquire_lock(execution_id, holder, now, ttl_ms)
    }

    fn release_lock(&self, execution_id: &ExecutionId, holder: &str) -> Result<(), StoreError> {
        self.inner.release_lock(execution_id, holder)
    }
}

/// Returns the status of one query in a snapshot.
pub fn status_of(snapshot: &RunSnapshot, query: &str) -> OutcomeStatus {
    snapshot.outcomes.get(&QueryId::new(query)).map(|outcome| outcome.status).expect("outcome")
}
