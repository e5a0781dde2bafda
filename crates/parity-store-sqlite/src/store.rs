// crates/parity-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Validation State Store
// Description: Durable ValidationStateStore backed by SQLite WAL.
// Purpose: Persist run headers and outcomes with deterministic serialization.
// Dependencies: parity-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`ValidationStateStore`] using `SQLite`.
//! Each commit writes the run header and every changed outcome as canonical
//! JSON in a single transaction, appends the outcomes to a version table, and
//! enforces optional retention. Loads verify stored hashes and fail closed on
//! corruption. Run leases live in their own table; every commit checks that
//! the committing holder still owns the lease and extends it in the same
//! transaction, so a holder whose lease was taken over cannot write.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use parity_core::ExecutionId;
use parity_core::ExecutionRun;
use parity_core::LeaseClaim;
use parity_core::QueryId;
use parity_core::QueryOutcome;
use parity_core::RELEASED_LEASE_HOLDER;
use parity_core::RunSnapshot;
use parity_core::StoreError;
use parity_core::Timestamp;
use parity_core::ValidationStateStore;
use parity_core::hashing::DEFAULT_HASH_ALGORITHM;
use parity_core::hashing::HashAlgorithm;
use parity_core::hashing::canonical_json_bytes;
use parity_core::hashing::hash_bytes;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum size of one stored header or outcome payload.
pub const MAX_STATE_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` validation state store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `max_versions`, when set, must be greater than zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Optional maximum outcome versions kept per query (older pruned).
    #[serde(default)]
    pub max_versions: Option<u64>,
}

impl SqliteStoreConfig {
    /// Creates a config with default pragmas for a database path.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            max_versions: None,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding raw outcome payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Payload exceeded the size limit.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
    /// Execution lease is held by another process.
    #[error("execution {execution_id} is locked by {holder}")]
    Locked {
        /// Execution identifier.
        execution_id: String,
        /// Current lease holder.
        holder: String,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "payload exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
            SqliteStoreError::Locked {
                execution_id,
                holder,
            } => Self::Locked {
                execution_id,
                holder,
            },
        }
    }
}

/// Maps a rusqlite error into a store error.
fn db_error(error: &rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(error.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed validation state store with WAL support.
///
/// # Invariants
/// - Header and outcome payloads are hash-verified before deserialization.
/// - `SQLite` connection access is serialized through a mutex.
#[derive(Clone)]
pub struct SqliteValidationStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

/// Summary metadata for one stored outcome version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeVersionSummary {
    /// Stored version number.
    pub version: i64,
    /// Outcome status label at that version.
    pub status: String,
    /// Unix millis when the version was saved.
    pub saved_at: i64,
    /// Stored payload hash.
    pub outcome_hash: String,
}

/// Canonical payload prepared for storage.
struct PreparedPayload {
    /// Canonical JSON bytes.
    bytes: Vec<u8>,
    /// Hex digest of `bytes`.
    hash: String,
}

/// Raw hashed payload read back from the database.
struct StoredPayload {
    /// Stored JSON bytes.
    bytes: Vec<u8>,
    /// Stored hash value.
    hash_value: String,
    /// Stored hash algorithm label.
    hash_algorithm: String,
}

impl SqliteValidationStore {
    /// Opens an `SQLite`-backed validation state store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        if config.max_versions == Some(0) {
            return Err(SqliteStoreError::Invalid(
                "max_versions must be greater than zero".to_string(),
            ));
        }
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Locks the shared connection.
    fn connection(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("connection mutex poisoned".to_string()))
    }

    /// Loads and verifies a full run snapshot.
    fn load_snapshot(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<Option<RunSnapshot>, SqliteStoreError> {
        let guard = self.connection()?;
        let header: Option<StoredPayload> = guard
            .query_row(
                "SELECT header_json, header_hash, hash_algorithm FROM runs WHERE execution_id = ?1",
                params![execution_id.as_str()],
                |row| {
                    Ok(StoredPayload {
                        bytes: row.get(0)?,
                        hash_value: row.get(1)?,
                        hash_algorithm: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|err| db_error(&err))?;
        let Some(header) = header else {
            return Ok(None);
        };
        let run: ExecutionRun = decode_verified(&header, &format!("run {execution_id}"))?;
        if run.execution_id != *execution_id {
            return Err(SqliteStoreError::Invalid(
                "execution_id mismatch between key and header".to_string(),
            ));
        }

        let mut stmt = guard
            .prepare(
                "SELECT query_id, outcome_json, outcome_hash, hash_algorithm FROM outcomes WHERE \
                 execution_id = ?1 ORDER BY query_id",
            )
            .map_err(|err| db_error(&err))?;
        let rows = stmt
            .query_map(params![execution_id.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    StoredPayload {
                        bytes: row.get(1)?,
                        hash_value: row.get(2)?,
                        hash_algorithm: row.get(3)?,
                    },
                ))
            })
            .map_err(|err| db_error(&err))?;
        let mut outcomes = BTreeMap::new();
        for row in rows {
            let (query_id, payload) = row.map_err(|err| db_error(&err))?;
            let outcome: QueryOutcome =
                decode_verified(&payload, &format!("outcome {execution_id}/{query_id}"))?;
            if outcome.query_id.as_str() != query_id {
                return Err(SqliteStoreError::Invalid(format!(
                    "query_id mismatch between key and outcome {query_id}"
                )));
            }
            outcomes.insert(QueryId::new(query_id), outcome);
        }
        drop(stmt);
        drop(guard);
        Ok(Some(RunSnapshot {
            run,
            outcomes,
        }))
    }

    /// Writes a header and changed outcomes in one transaction, fenced and
    /// renewed by the caller's lease.
    fn commit_snapshot(
        &self,
        run: &ExecutionRun,
        outcomes: &[QueryOutcome],
        lease: &LeaseClaim,
    ) -> Result<(), SqliteStoreError> {
        let header = prepare_payload(run)?;
        let prepared = outcomes
            .iter()
            .map(|outcome| prepare_payload(outcome).map(|payload| (outcome, payload)))
            .collect::<Result<Vec<_>, _>>()?;
        let saved_at = unix_millis();
        let mut guard = self.connection()?;
        let tx = guard.transaction().map_err(|err| db_error(&err))?;
        renew_lease(&tx, run.execution_id.as_str(), lease)?;
        tx.execute(
            "INSERT INTO runs (execution_id, run_seq, status, header_json, header_hash, \
             hash_algorithm, updated_at) VALUES (?1, (SELECT COALESCE(MAX(run_seq), 0) + 1 FROM \
             runs), ?2, ?3, ?4, ?5, ?6) ON CONFLICT(execution_id) DO UPDATE SET status = \
             excluded.status, header_json = excluded.header_json, header_hash = \
             excluded.header_hash, hash_algorithm = excluded.hash_algorithm, updated_at = \
             excluded.updated_at",
            params![
                run.execution_id.as_str(),
                run.status.as_str(),
                header.bytes.as_slice(),
                header.hash.as_str(),
                DEFAULT_HASH_ALGORITHM.as_str(),
                saved_at
            ],
        )
        .map_err(|err| db_error(&err))?;
        for (outcome, payload) in &prepared {
            write_outcome(&tx, run.execution_id.as_str(), outcome, payload, saved_at)?;
            enforce_retention(
                &tx,
                run.execution_id.as_str(),
                outcome.query_id.as_str(),
                self.config.max_versions,
            )?;
        }
        tx.commit().map_err(|err| db_error(&err))?;
        drop(guard);
        Ok(())
    }

    /// Returns the most recent execution id matching a status filter.
    fn latest_with_status(
        &self,
        statuses: &[&str],
    ) -> Result<Option<ExecutionId>, SqliteStoreError> {
        let guard = self.connection()?;
        let mut stmt = guard
            .prepare("SELECT execution_id, status FROM runs ORDER BY run_seq DESC")
            .map_err(|err| db_error(&err))?;
        let rows = stmt
            .query_map(params![], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|err| db_error(&err))?;
        for row in rows {
            let (execution_id, status) = row.map_err(|err| db_error(&err))?;
            if statuses.is_empty() || statuses.contains(&status.as_str()) {
                return Ok(Some(ExecutionId::new(execution_id)));
            }
        }
        Ok(None)
    }

    /// Lists run headers, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails or a header is corrupt.
    pub fn list_run_headers(&self, limit: usize) -> Result<Vec<ExecutionRun>, SqliteStoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let guard = self.connection()?;
        let mut stmt = guard
            .prepare(
                "SELECT execution_id, header_json, header_hash, hash_algorithm FROM runs ORDER BY \
                 run_seq DESC LIMIT ?1",
            )
            .map_err(|err| db_error(&err))?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    StoredPayload {
                        bytes: row.get(1)?,
                        hash_value: row.get(2)?,
                        hash_algorithm: row.get(3)?,
                    },
                ))
            })
            .map_err(|err| db_error(&err))?;
        let mut runs = Vec::new();
        for row in rows {
            let (execution_id, payload) = row.map_err(|err| db_error(&err))?;
            runs.push(decode_verified(&payload, &format!("run {execution_id}"))?);
        }
        Ok(runs)
    }

    /// Lists stored versions of one outcome, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn list_outcome_versions(
        &self,
        execution_id: &ExecutionId,
        query_id: &QueryId,
    ) -> Result<Vec<OutcomeVersionSummary>, SqliteStoreError> {
        let guard = self.connection()?;
        let mut stmt = guard
            .prepare(
                "SELECT version, status, saved_at, outcome_hash FROM outcome_versions WHERE \
                 execution_id = ?1 AND query_id = ?2 ORDER BY version",
            )
            .map_err(|err| db_error(&err))?;
        let rows = stmt
            .query_map(params![execution_id.as_str(), query_id.as_str()], |row| {
                Ok(OutcomeVersionSummary {
                    version: row.get(0)?,
                    status: row.get(1)?,
                    saved_at: row.get(2)?,
                    outcome_hash: row.get(3)?,
                })
            })
            .map_err(|err| db_error(&err))?;
        let mut versions = Vec::new();
        for row in rows {
            versions.push(row.map_err(|err| db_error(&err))?);
        }
        Ok(versions)
    }

    /// Acquires or renews a run lease.
    fn acquire(
        &self,
        execution_id: &ExecutionId,
        holder: &str,
        now: Timestamp,
        ttl_ms: u64,
    ) -> Result<(), SqliteStoreError> {
        let now_ticks = now.ticks();
        let expires_at = LeaseClaim::new(holder, now, ttl_ms).expires_at();
        let mut guard = self.connection()?;
        let tx = guard.transaction().map_err(|err| db_error(&err))?;
        let current: Option<(String, i64)> = tx
            .query_row(
                "SELECT holder, expires_at FROM run_locks WHERE execution_id = ?1",
                params![execution_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|err| db_error(&err))?;
        if let Some((current_holder, current_expiry)) = current
            && current_holder != holder
            && current_expiry > now_ticks
        {
            return Err(SqliteStoreError::Locked {
                execution_id: execution_id.to_string(),
                holder: current_holder,
            });
        }
        tx.execute(
            "INSERT INTO run_locks (execution_id, holder, expires_at) VALUES (?1, ?2, ?3) ON \
             CONFLICT(execution_id) DO UPDATE SET holder = excluded.holder, expires_at = \
             excluded.expires_at",
            params![execution_id.as_str(), holder, expires_at],
        )
        .map_err(|err| db_error(&err))?;
        tx.commit().map_err(|err| db_error(&err))?;
        drop(guard);
        Ok(())
    }

    /// Releases a run lease held by `holder`.
    fn release(&self, execution_id: &ExecutionId, holder: &str) -> Result<(), SqliteStoreError> {
        let guard = self.connection()?;
        guard
            .execute(
                "DELETE FROM run_locks WHERE execution_id = ?1 AND holder = ?2",
                params![execution_id.as_str(), holder],
            )
            .map_err(|err| db_error(&err))?;
        drop(guard);
        Ok(())
    }
}

impl ValidationStateStore for SqliteValidationStore {
    fn load(&self, execution_id: &ExecutionId) -> Result<Option<RunSnapshot>, StoreError> {
        self.load_snapshot(execution_id).map_err(StoreError::from)
    }

    fn commit(
        &self,
        run: &ExecutionRun,
        outcomes: &[QueryOutcome],
        lease: &LeaseClaim,
    ) -> Result<(), StoreError> {
        self.commit_snapshot(run, outcomes, lease).map_err(StoreError::from)
    }

    fn latest_incomplete(&self) -> Result<Option<ExecutionId>, StoreError> {
        self.latest_with_status(&["RUNNING", "ABORTED"]).map_err(StoreError::from)
    }

    fn latest(&self) -> Result<Option<ExecutionId>, StoreError> {
        self.latest_with_status(&[]).map_err(StoreError::from)
    }

    fn list_runs(&self, limit: usize) -> Result<Vec<ExecutionRun>, StoreError> {
        self.list_run_headers(limit).map_err(StoreError::from)
    }

    fn acquire_lock(
        &self,
        execution_id: &ExecutionId,
        holder: &str,
        now: Timestamp,
        ttl_ms: u64,
    ) -> Result<(), StoreError> {
        self.acquire(execution_id, holder, now, ttl_ms).map_err(StoreError::from)
    }

    fn release_lock(&self, execution_id: &ExecutionId, holder: &str) -> Result<(), StoreError> {
        self.release(execution_id, holder).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Transaction Helpers
// ============================================================================

/// Verifies the committing holder still owns the lease and extends it.
fn renew_lease(
    tx: &Transaction<'_>,
    execution_id: &str,
    lease: &LeaseClaim,
) -> Result<(), SqliteStoreError> {
    let current: Option<String> = tx
        .query_row(
            "SELECT holder FROM run_locks WHERE execution_id = ?1",
            params![execution_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|err| db_error(&err))?;
    match current {
        Some(holder) if holder == lease.holder => {}
        Some(holder) => {
            return Err(SqliteStoreError::Locked {
                execution_id: execution_id.to_string(),
                holder,
            });
        }
        None => {
            return Err(SqliteStoreError::Locked {
                execution_id: execution_id.to_string(),
                holder: RELEASED_LEASE_HOLDER.to_string(),
            });
        }
    }
    tx.execute(
        "UPDATE run_locks SET expires_at = ?2 WHERE execution_id = ?1",
        params![execution_id, lease.expires_at()],
    )
    .map_err(|err| db_error(&err))?;
    Ok(())
}

/// Upserts one outcome and appends it to the version table.
fn write_outcome(
    tx: &Transaction<'_>,
    execution_id: &str,
    outcome: &QueryOutcome,
    payload: &PreparedPayload,
    saved_at: i64,
) -> Result<(), SqliteStoreError> {
    let latest_version: Option<i64> = tx
        .query_row(
            "SELECT version FROM outcomes WHERE execution_id = ?1 AND query_id = ?2",
            params![execution_id, outcome.query_id.as_str()],
            |row| row.get(0),
        )
        .optional()
        .map_err(|err| db_error(&err))?;
    let next_version = match latest_version {
        None => 1,
        Some(value) if value < 1 => {
            return Err(SqliteStoreError::Corrupt(format!(
                "invalid outcome version for {execution_id}/{}",
                outcome.query_id
            )));
        }
        Some(value) => value.checked_add(1).ok_or_else(|| {
            SqliteStoreError::Corrupt(format!(
                "outcome version overflow for {execution_id}/{}",
                outcome.query_id
            ))
        })?,
    };
    tx.execute(
        "INSERT INTO outcomes (execution_id, query_id, status, version, outcome_json, \
         outcome_hash, hash_algorithm) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) ON \
         CONFLICT(execution_id, query_id) DO UPDATE SET status = excluded.status, version = \
         excluded.version, outcome_json = excluded.outcome_json, outcome_hash = \
         excluded.outcome_hash, hash_algorithm = excluded.hash_algorithm",
        params![
            execution_id,
            outcome.query_id.as_str(),
            outcome.status.as_str(),
            next_version,
            payload.bytes.as_slice(),
            payload.hash.as_str(),
            DEFAULT_HASH_ALGORITHM.as_str()
        ],
    )
    .map_err(|err| db_error(&err))?;
    tx.execute(
        "INSERT INTO outcome_versions (execution_id, query_id, version, status, outcome_json, \
         outcome_hash, hash_algorithm, saved_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            execution_id,
            outcome.query_id.as_str(),
            next_version,
            outcome.status.as_str(),
            payload.bytes.as_slice(),
            payload.hash.as_str(),
            DEFAULT_HASH_ALGORITHM.as_str(),
            saved_at
        ],
    )
    .map_err(|err| db_error(&err))?;
    Ok(())
}

/// Enforces outcome version retention if configured.
fn enforce_retention(
    tx: &Transaction<'_>,
    execution_id: &str,
    query_id: &str,
    max_versions: Option<u64>,
) -> Result<(), SqliteStoreError> {
    let Some(max_versions) = max_versions else {
        return Ok(());
    };
    let max_versions = i64::try_from(max_versions)
        .map_err(|_| SqliteStoreError::Invalid("max_versions too large".to_string()))?;
    tx.execute(
        "DELETE FROM outcome_versions WHERE execution_id = ?1 AND query_id = ?2 AND version <= \
         (SELECT version FROM outcomes WHERE execution_id = ?1 AND query_id = ?2) - ?3",
        params![execution_id, query_id, max_versions],
    )
    .map_err(|err| db_error(&err))?;
    Ok(())
}

// ============================================================================
// SECTION: Payload Helpers
// ============================================================================

/// Serializes a value canonically and hashes it.
fn prepare_payload<T: Serialize>(value: &T) -> Result<PreparedPayload, SqliteStoreError> {
    let bytes =
        canonical_json_bytes(value).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if bytes.len() > MAX_STATE_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_STATE_BYTES,
            actual_bytes: bytes.len(),
        });
    }
    let hash = hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes).value;
    Ok(PreparedPayload {
        bytes,
        hash,
    })
}

/// Verifies a stored payload hash and deserializes it.
fn decode_verified<T: for<'de> Deserialize<'de>>(
    payload: &StoredPayload,
    label: &str,
) -> Result<T, SqliteStoreError> {
    if payload.bytes.len() > MAX_STATE_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_STATE_BYTES,
            actual_bytes: payload.bytes.len(),
        });
    }
    let algorithm = parse_hash_algorithm(&payload.hash_algorithm)?;
    let expected = hash_bytes(algorithm, &payload.bytes);
    if expected.value != payload.hash_value {
        return Err(SqliteStoreError::Corrupt(format!("hash mismatch for {label}")));
    }
    serde_json::from_slice(&payload.bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

/// Parses a hash algorithm label.
fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, SqliteStoreError> {
    HashAlgorithm::parse(label)
        .ok_or_else(|| SqliteStoreError::Invalid(format!("unsupported hash algorithm: {label}")))
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

// ============================================================================
// SECTION: Connection Setup
// ============================================================================

/// Creates the parent directory of the store path.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with durable defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection =
        Connection::open_with_flags(&config.path, flags).map_err(|err| db_error(&err))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(|err| db_error(&err))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| db_error(&err))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| db_error(&err))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| db_error(&err))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| db_error(&err))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| db_error(&err))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS runs (
                    execution_id TEXT NOT NULL PRIMARY KEY,
                    run_seq INTEGER NOT NULL,
                    status TEXT NOT NULL,
                    header_json BLOB NOT NULL,
                    header_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_runs_seq ON runs (run_seq);
                CREATE TABLE IF NOT EXISTS outcomes (
                    execution_id TEXT NOT NULL,
                    query_id TEXT NOT NULL,
                    status TEXT NOT NULL,
                    version INTEGER NOT NULL,
                    outcome_json BLOB NOT NULL,
                    outcome_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    PRIMARY KEY (execution_id, query_id),
                    FOREIGN KEY (execution_id) REFERENCES runs(execution_id) ON DELETE CASCADE
                );
                CREATE TABLE IF NOT EXISTS outcome_versions (
                    execution_id TEXT NOT NULL,
                    query_id TEXT NOT NULL,
                    version INTEGER NOT NULL,
                    status TEXT NOT NULL,
                    outcome_json BLOB NOT NULL,
                    outcome_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    saved_at INTEGER NOT NULL,
                    PRIMARY KEY (execution_id, query_id, version),
                    FOREIGN KEY (execution_id, query_id)
                        REFERENCES outcomes(execution_id, query_id) ON DELETE CASCADE
                );
                CREATE TABLE IF NOT EXISTS run_locks (
                    execution_id TEXT NOT NULL PRIMARY KEY,
                    holder TEXT NOT NULL,
                    expires_at INTEGER NOT NULL
                );",
            )
            .map_err(|err| db_error(&err))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| db_error(&err))?;
    Ok(())
}
