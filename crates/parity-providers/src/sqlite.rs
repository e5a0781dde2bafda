// crates/parity-providers/src/sqlite.rs
// ============================================================================
// Module: SQLite Query Executor
// Description: Executor adapter running query SQL against SQLite files.
// Purpose: Materialize source and target datasets from two SQLite databases.
// Dependencies: parity-core, rusqlite, serde, serde_json, tokio
// ============================================================================

//! ## Overview
//! [`SqliteQueryExecutor`] opens the source or target database read-only and
//! runs the query's SQL on a blocking task. Results up to
//! `max_buffered_rows` are held in memory; larger results become a
//! [`SqliteStreamDataset`] that re-runs the statement with an `ORDER BY` on
//! the requested keys and hands rows to the comparator through a bounded
//! queue, so neither side is ever fully loaded.
//!
//! `SQLite` result codes are mapped onto the engine's failure classes so busy
//! databases retry while malformed SQL fails fast. Dropping the
//! materialization future (for example on a timeout) interrupts the running
//! statement.
//!
//! Security posture: connections are opened read-only and only statements
//! that `SQLite` reports as read-only are executed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use parity_core::ColumnSchema;
use parity_core::ColumnType;
use parity_core::Dataset;
use parity_core::DatasetError;
use parity_core::ExecutorError;
use parity_core::ExecutorErrorKind;
use parity_core::MaterializedDataset;
use parity_core::QueryDefinition;
use parity_core::QueryExecutor;
use parity_core::Row;
use parity_core::RowOrder;
use parity_core::RowStream;
use parity_core::TargetSide;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::InterruptHandle;
use rusqlite::OpenFlags;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Number;
use serde_json::Value;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default number of rows held in memory before a result is streamed.
const DEFAULT_MAX_BUFFERED_ROWS: u64 = 100_000;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Rows queued between a stream worker and its reader.
const STREAM_QUEUE_ROWS: usize = 1_024;

/// Configuration for the `SQLite` query executor.
///
/// # Invariants
/// - At most `max_buffered_rows` rows per side are held in memory; larger
///   results are streamed from the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteExecutorConfig {
    /// Source database file.
    pub source: PathBuf,
    /// Target database file.
    pub target: PathBuf,
    /// Rows held in memory per side before switching to streaming.
    #[serde(default = "default_max_buffered_rows")]
    pub max_buffered_rows: u64,
    /// Busy timeout for locked databases (ms).
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl SqliteExecutorConfig {
    /// Creates a config with default limits.
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            max_buffered_rows: DEFAULT_MAX_BUFFERED_ROWS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    /// Returns the database path for a side.
    fn path_for(&self, side: TargetSide) -> &PathBuf {
        match side {
            TargetSide::Source => &self.source,
            TargetSide::Target => &self.target,
        }
    }
}

/// Returns the default in-memory row limit.
const fn default_max_buffered_rows() -> u64 {
    DEFAULT_MAX_BUFFERED_ROWS
}

/// Returns the default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Executor adapter backed by two `SQLite` database files.
#[derive(Debug, Clone)]
pub struct SqliteQueryExecutor {
    /// Executor configuration.
    config: SqliteExecutorConfig,
}

impl SqliteQueryExecutor {
    /// Creates a `SQLite` executor.
    #[must_use]
    pub const fn new(config: SqliteExecutorConfig) -> Self {
        Self {
            config,
        }
    }

    /// Returns the executor configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteExecutorConfig {
        &self.config
    }
}

#[async_trait]
impl QueryExecutor for SqliteQueryExecutor {
    async fn materialize(
        &self,
        query: &QueryDefinition,
        side: TargetSide,
    ) -> Result<Box<dyn Dataset>, ExecutorError> {
        let slot = Arc::new(Mutex::new(InterruptSlot::Pending));
        let mut guard = InterruptGuard {
            slot: Some(Arc::clone(&slot)),
        };
        let database = DatabaseFile {
            path: self.config.path_for(side).clone(),
            busy_timeout_ms: self.config.busy_timeout_ms,
        };
        let sql = query.sql.clone();
        let limit = self.config.max_buffered_rows;
        let result = tokio::task::spawn_blocking(move || {
            let connection = database.open().map_err(|err| {
                classify(&err, side, &format!("open {}", database.path.display()))
            })?;
            arm(&slot, &connection, side)?;
            run_query(&connection, database, &sql, limit, side)
        })
        .await
        .map_err(|err| ExecutorError::query(side, format!("materialization task failed: {err}")));
        guard.disarm();
        result?
    }
}

/// Database file plus connection settings, shared with stream workers.
#[derive(Debug, Clone)]
struct DatabaseFile {
    /// Database path.
    path: PathBuf,
    /// Busy timeout (ms).
    busy_timeout_ms: u64,
}

impl DatabaseFile {
    /// Opens a read-only connection with the busy timeout applied.
    fn open(&self) -> rusqlite::Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection = Connection::open_with_flags(&self.path, flags)?;
        connection.busy_timeout(Duration::from_millis(self.busy_timeout_ms))?;
        Ok(connection)
    }
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// Interrupt state shared between the async caller and the blocking task.
enum InterruptSlot {
    /// The blocking task has not opened its connection yet.
    Pending,
    /// The statement can be interrupted through this handle.
    Armed(InterruptHandle),
    /// The caller went away before the connection was opened.
    Cancelled,
}

/// Publishes the connection's interrupt handle, failing if already cancelled.
fn arm(
    slot: &Mutex<InterruptSlot>,
    connection: &Connection,
    side: TargetSide,
) -> Result<(), ExecutorError> {
    let mut state = slot
        .lock()
        .map_err(|_| ExecutorError::query(side, "interrupt state poisoned"))?;
    if matches!(*state, InterruptSlot::Cancelled) {
        return Err(ExecutorError::timeout(Some(side), "materialization cancelled"));
    }
    *state = InterruptSlot::Armed(connection.get_interrupt_handle());
    drop(state);
    Ok(())
}

/// Interrupts the running statement unless disarmed.
struct InterruptGuard {
    /// Shared interrupt state.
    slot: Option<Arc<Mutex<InterruptSlot>>>,
}

impl InterruptGuard {
    /// Stops the guard from interrupting on drop.
    fn disarm(&mut self) {
        self.slot = None;
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        let Some(slot) = self.slot.take() else {
            return;
        };
        let Ok(mut state) = slot.lock() else {
            return;
        };
        match &*state {
            InterruptSlot::Armed(handle) => handle.interrupt(),
            InterruptSlot::Pending => *state = InterruptSlot::Cancelled,
            InterruptSlot::Cancelled => {}
        }
    }
}

// ============================================================================
// SECTION: Query Execution
// ============================================================================

/// Runs a read-only statement, buffering small results and streaming large ones.
fn run_query(
    connection: &Connection,
    database: DatabaseFile,
    sql: &str,
    limit: u64,
    side: TargetSide,
) -> Result<Box<dyn Dataset>, ExecutorError> {
    let mut statement = connection.prepare(sql).map_err(|err| classify(&err, side, "prepare"))?;
    if !statement.readonly() {
        return Err(ExecutorError::query(side, "statement is not read-only"));
    }
    let names: Vec<String> =
        statement.column_names().into_iter().map(ToString::to_string).collect();
    let width = names.len();
    let mut types: BTreeMap<usize, ColumnType> = BTreeMap::new();
    let mut rows: Vec<Row> = Vec::new();
    let mut overflow = false;
    let mut cursor = statement.query([]).map_err(|err| classify(&err, side, "execute"))?;
    while let Some(row) = cursor.next().map_err(|err| classify(&err, side, "fetch"))? {
        if rows.len() as u64 >= limit {
            overflow = true;
            break;
        }
        let cells = read_row(row, width).map_err(|err| classify(&err, side, "read"))?;
        infer_types(&mut types, &cells);
        rows.push(cells);
    }
    drop(cursor);
    drop(statement);
    let columns: Vec<ColumnSchema> = names
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            ColumnSchema::new(name, types.get(&index).copied().unwrap_or(ColumnType::Unknown))
        })
        .collect();
    if !overflow {
        let dataset = MaterializedDataset::new(columns, rows)
            .map_err(|err| ExecutorError::query(side, err.to_string()))?;
        return Ok(Box::new(dataset));
    }
    drop(rows);
    let inner = inner_sql(sql);
    let count: i64 = connection
        .query_row(&format!("SELECT COUNT(*) FROM ({inner})"), [], |row| row.get(0))
        .map_err(|err| classify(&err, side, "count"))?;
    Ok(Box::new(SqliteStreamDataset {
        database,
        sql: inner.to_string(),
        columns,
        row_count: u64::try_from(count).unwrap_or(0),
    }))
}

/// Reads every cell of a row as JSON.
fn read_row(row: &rusqlite::Row<'_>, width: usize) -> rusqlite::Result<Row> {
    let mut cells = Vec::with_capacity(width);
    for index in 0 .. width {
        cells.push(to_json(row.get_ref(index)?));
    }
    Ok(cells)
}

/// Widens inferred column types with one row of cells.
fn infer_types(types: &mut BTreeMap<usize, ColumnType>, cells: &[Value]) {
    for (index, value) in cells.iter().enumerate() {
        let inferred = ColumnType::of_value(value);
        let entry = types.entry(index).or_insert(ColumnType::Unknown);
        if *entry == ColumnType::Unknown
            || (*entry == ColumnType::Integer && inferred == ColumnType::Decimal)
        {
            *entry = inferred;
        }
    }
}

/// Strips trailing semicolons so the statement can be nested.
fn inner_sql(sql: &str) -> &str {
    sql.trim().trim_end_matches(|ch: char| ch == ';' || ch.is_whitespace())
}

/// Quotes an identifier for use in generated SQL.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Converts a `SQLite` cell into a JSON value.
fn to_json(cell: ValueRef<'_>) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(value) => Value::from(value),
        ValueRef::Real(value) => Number::from_f64(value).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(hex(bytes)),
    }
}

/// Lowercase hex rendering of a blob.
fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

// ============================================================================
// SECTION: Streaming Dataset
// ============================================================================

/// Result set read from the database on demand.
///
/// Every [`Dataset::rows`] call re-runs the statement on a fresh read-only
/// connection in a worker thread. Keyed streams are ordered by `SQLite`; the
/// comparator rejects any key that goes backwards under canonical ordering.
/// Column types are inferred from the buffered prefix of the first run.
#[derive(Debug)]
pub struct SqliteStreamDataset {
    /// Database the statement runs against.
    database: DatabaseFile,
    /// Statement without trailing semicolons.
    sql: String,
    /// Column schema.
    columns: Vec<ColumnSchema>,
    /// Row count reported by `COUNT(*)`.
    row_count: u64,
}

impl Dataset for SqliteStreamDataset {
    fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    fn row_count(&self) -> u64 {
        self.row_count
    }

    fn rows(&self, order: &RowOrder) -> Result<Box<dyn RowStream + '_>, DatasetError> {
        let sql = match order {
            RowOrder::Natural => self.sql.clone(),
            RowOrder::ByKey(keys) => {
                if let Some(missing) = keys.iter().find(|key| self.column_index(key).is_none()) {
                    return Err(DatasetError::UnknownColumn(missing.clone()));
                }
                let ordering: Vec<String> =
                    keys.iter().map(|key| quote_identifier(key)).collect();
                format!("SELECT * FROM ({}) ORDER BY {}", self.sql, ordering.join(", "))
            }
        };
        let (sender, receiver) = mpsc::sync_channel(STREAM_QUEUE_ROWS);
        let database = self.database.clone();
        let width = self.columns.len();
        let worker = thread::Builder::new()
            .name("parity-sqlite-stream".to_string())
            .spawn(move || {
                if let Err(err) = send_rows(&database, &sql, width, &sender) {
                    let _ = sender.send(Err(err));
                }
            })
            .map_err(|err| DatasetError::Read(format!("failed to spawn stream worker: {err}")))?;
        Ok(Box::new(SqliteRowStream {
            receiver,
            worker: Some(worker),
        }))
    }
}

/// Runs `sql` and pushes rows until the reader hangs up.
fn send_rows(
    database: &DatabaseFile,
    sql: &str,
    width: usize,
    sender: &mpsc::SyncSender<Result<Row, DatasetError>>,
) -> Result<(), DatasetError> {
    let connection = database.open().map_err(|err| read_error(&err))?;
    let mut statement = connection.prepare(sql).map_err(|err| read_error(&err))?;
    let mut cursor = statement.query([]).map_err(|err| read_error(&err))?;
    while let Some(row) = cursor.next().map_err(|err| read_error(&err))? {
        let cells = read_row(row, width).map_err(|err| read_error(&err))?;
        if sender.send(Ok(cells)).is_err() {
            return Ok(());
        }
    }
    Ok(())
}

/// Maps a `SQLite` error raised mid-stream.
fn read_error(error: &rusqlite::Error) -> DatasetError {
    DatasetError::Read(format!("sqlite: {error}"))
}

/// Reader side of a stream worker.
struct SqliteRowStream {
    /// Rows (or the terminating error) from the worker.
    receiver: mpsc::Receiver<Result<Row, DatasetError>>,
    /// Worker thread, joined once the queue closes.
    worker: Option<thread::JoinHandle<()>>,
}

impl RowStream for SqliteRowStream {
    fn next_row(&mut self) -> Result<Option<Row>, DatasetError> {
        match self.receiver.recv() {
            Ok(item) => item.map(Some),
            Err(_) => match self.worker.take().map(thread::JoinHandle::join) {
                Some(Err(_)) => Err(DatasetError::Read("stream worker panicked".to_string())),
                _ => Ok(None),
            },
        }
    }
}

// ============================================================================
// SECTION: Error Classification
// ============================================================================

/// Maps a `SQLite` error onto an executor failure class.
fn classify(error: &rusqlite::Error, side: TargetSide, action: &str) -> ExecutorError {
    let kind = error.sqlite_error_code().map_or(ExecutorErrorKind::Query, classify_code);
    ExecutorError::new(kind, Some(side), format!("{action}: {error}"))
}

/// Maps a `SQLite` primary result code onto an executor failure class.
const fn classify_code(code: ErrorCode) -> ExecutorErrorKind {
    match code {
        ErrorCode::DatabaseBusy
        | ErrorCode::DatabaseLocked
        | ErrorCode::CannotOpen
        | ErrorCode::SystemIoFailure
        | ErrorCode::FileLockingProtocolFailed => ExecutorErrorKind::Connection,
        ErrorCode::OperationInterrupted => ExecutorErrorKind::Timeout,
        ErrorCode::PermissionDenied
        | ErrorCode::ReadOnly
        | ErrorCode::AuthorizationForStatementDenied => ExecutorErrorKind::Permission,
        _ => ExecutorErrorKind::Query,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
