// crates/parity-report/src/ledger.rs
// ============================================================================
// Module: Hash-Chained Ledger
// Description: Append-only JSON-lines ledger of outcomes and run summaries.
// Purpose: Provide a tamper-evident execution record that outlives a crash.
// Dependencies: parity-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`LedgerSink`] appends one JSON line per committed query outcome and per
//! completed run to `<root>/<execution_id>.jsonl`. Each entry carries the
//! hash of its predecessor and its own hash over the canonical JSON body, so
//! [`verify_ledger`] can detect edits, reordering, and truncation in the
//! middle of the file.
//!
//! Every execution owns its own chain. The run lease keeps a single writer
//! per execution, so concurrent runs of different executions never share a
//! chain head. A chain is verified and its head loaded the first time a sink
//! touches it, which lets a resumed run continue the chain it left behind.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use parity_core::ExecutionId;
use parity_core::ExecutionRun;
use parity_core::QueryId;
use parity_core::QueryOutcome;
use parity_core::ReportSink;
use parity_core::RunSummary;
use parity_core::SinkError;
use parity_core::hashing::DEFAULT_HASH_ALGORITHM;
use parity_core::hashing::canonical_json_bytes;
use parity_core::hashing::hash_chained;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Hashed portion of a ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerBody {
    /// Zero-based position in the ledger.
    pub sequence: u64,
    /// Entry kind (`query_completed` or `run_completed`).
    pub kind: String,
    /// Execution identifier.
    pub execution_id: String,
    /// Entry payload.
    pub payload: Value,
}

/// One ledger line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Hashed body.
    #[serde(flatten)]
    pub body: LedgerBody,
    /// Hash of the previous entry, absent for the first entry.
    pub prev_hash: Option<String>,
    /// Hash of this entry.
    pub hash: String,
}

/// Result of a successful ledger verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerVerification {
    /// Number of verified entries.
    pub entries: u64,
    /// Hash of the final entry.
    pub last_hash: Option<String>,
}

/// Ledger errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Ledger I/O failed.
    #[error("ledger io error: {0}")]
    Io(String),
    /// A ledger line is not a valid entry.
    #[error("ledger parse error at line {line}: {reason}")]
    Parse {
        /// One-based line number.
        line: u64,
        /// Parse failure detail.
        reason: String,
    },
    /// The hash chain does not verify.
    #[error("ledger chain broken at line {line}: {reason}")]
    Broken {
        /// One-based line number.
        line: u64,
        /// Verification failure detail.
        reason: String,
    },
}

// ============================================================================
// SECTION: Sink
// ============================================================================

/// Chain position after the last appended entry.
struct ChainHead {
    /// Open file handle in append mode.
    file: File,
    /// Next sequence number.
    next_sequence: u64,
    /// Hash of the last entry.
    last_hash: Option<String>,
}

/// Report sink appending to one hash-chained JSON-lines ledger per execution.
pub struct LedgerSink {
    /// Directory holding the per-execution ledgers.
    root: PathBuf,
    /// Open chains keyed by execution id.
    heads: Mutex<BTreeMap<String, ChainHead>>,
}

impl LedgerSink {
    /// Opens a ledger directory, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] when the directory cannot be created.
    pub fn open(root: &Path) -> Result<Self, LedgerError> {
        std::fs::create_dir_all(root).map_err(|err| LedgerError::Io(err.to_string()))?;
        Ok(Self {
            root: root.to_path_buf(),
            heads: Mutex::new(BTreeMap::new()),
        })
    }

    /// Returns the ledger file for an execution.
    #[must_use]
    pub fn ledger_path(&self, execution_id: &ExecutionId) -> PathBuf {
        ledger_file(&self.root, execution_id)
    }

    /// Appends one entry and advances the chain on success.
    fn append(&self, kind: &str, execution_id: &ExecutionId, payload: Value) -> Result<(), SinkError> {
        let mut heads =
            self.heads.lock().map_err(|_| SinkError::Io("ledger mutex poisoned".to_string()))?;
        let key = execution_id.to_string();
        if !heads.contains_key(&key) {
            let head = open_chain(&self.ledger_path(execution_id))
                .map_err(|err| SinkError::Io(err.to_string()))?;
            heads.insert(key.clone(), head);
        }
        let head = heads
            .get_mut(&key)
            .ok_or_else(|| SinkError::Io(format!("ledger chain missing for {key}")))?;
        let body = LedgerBody {
            sequence: head.next_sequence,
            kind: kind.to_string(),
            execution_id: key.clone(),
            payload,
        };
        let hash = entry_hash(&body, head.last_hash.as_deref())
            .map_err(|err| SinkError::Serialization(err.to_string()))?;
        let entry = LedgerEntry {
            body,
            prev_hash: head.last_hash.clone(),
            hash: hash.clone(),
        };
        let line = serde_json::to_string(&entry)
            .map_err(|err| SinkError::Serialization(err.to_string()))?;
        writeln!(head.file, "{line}").map_err(|err| SinkError::Io(err.to_string()))?;
        head.file.flush().map_err(|err| SinkError::Io(err.to_string()))?;
        head.next_sequence += 1;
        head.last_hash = Some(hash);
        if kind == RUN_COMPLETED {
            heads.remove(&key);
        }
        drop(heads);
        Ok(())
    }
}

/// Entry kind closing a run; its chain head is released afterwards.
const RUN_COMPLETED: &str = "run_completed";

/// Returns the ledger file for an execution under `root`.
#[must_use]
pub fn ledger_file(root: &Path, execution_id: &ExecutionId) -> PathBuf {
    root.join(format!("{execution_id}.jsonl"))
}

/// Verifies an existing chain and opens it for appending.
fn open_chain(path: &Path) -> Result<ChainHead, LedgerError> {
    let verification = if path.exists() {
        verify_ledger(path)?
    } else {
        LedgerVerification {
            entries: 0,
            last_hash: None,
        }
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| LedgerError::Io(err.to_string()))?;
    Ok(ChainHead {
        file,
        next_sequence: verification.entries,
        last_hash: verification.last_hash,
    })
}

impl ReportSink for LedgerSink {
    fn on_query_completed(
        &self,
        execution_id: &ExecutionId,
        outcome: &QueryOutcome,
    ) -> Result<(), SinkError> {
        let payload =
            serde_json::to_value(outcome).map_err(|err| SinkError::Serialization(err.to_string()))?;
        self.append("query_completed", execution_id, payload)
    }

    fn on_run_completed(
        &self,
        execution_id: &ExecutionId,
        run: &ExecutionRun,
        outcomes: &BTreeMap<QueryId, QueryOutcome>,
    ) -> Result<(), SinkError> {
        let payload = serde_json::json!({
            "run": run,
            "summary": RunSummary::from_outcomes(outcomes),
        });
        self.append(RUN_COMPLETED, execution_id, payload)
    }
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Computes the chained hash for an entry body.
fn entry_hash(body: &LedgerBody, previous: Option<&str>) -> Result<String, LedgerError> {
    let bytes = canonical_json_bytes(body).map_err(|err| LedgerError::Io(err.to_string()))?;
    Ok(hash_chained(DEFAULT_HASH_ALGORITHM, previous, &bytes).value)
}

/// Verifies a ledger file end to end.
///
/// # Errors
///
/// Returns [`LedgerError`] describing the first line that fails to parse or
/// verify.
pub fn verify_ledger(path: &Path) -> Result<LedgerVerification, LedgerError> {
    let file = File::open(path).map_err(|err| LedgerError::Io(err.to_string()))?;
    let reader = BufReader::new(file);
    let mut entries = 0_u64;
    let mut last_hash: Option<String> = None;
    for (index, line) in reader.lines().enumerate() {
        let line_number = index as u64 + 1;
        let line = line.map_err(|err| LedgerError::Io(err.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: LedgerEntry = serde_json::from_str(&line).map_err(|err| LedgerError::Parse {
            line: line_number,
            reason: err.to_string(),
        })?;
        let broken = |reason: String| LedgerError::Broken {
            line: line_number,
            reason,
        };
        if entry.body.sequence != entries {
            return Err(broken(format!(
                "expected sequence {entries}, found {}",
                entry.body.sequence
            )));
        }
        if entry.prev_hash != last_hash {
            return Err(broken("previous hash does not match".to_string()));
        }
        let expected = entry_hash(&entry.body, last_hash.as_deref())?;
        if expected != entry.hash {
            return Err(broken("entry hash mismatch".to_string()));
        }
        entries += 1;
        last_hash = Some(entry.hash);
    }
    Ok(LedgerVerification {
        entries,
        last_hash,
    })
}
