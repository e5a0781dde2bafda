// crates/parity-core/src/runtime/store.rs
// ============================================================================
// Module: Parity In-Memory Store
// Description: In-memory validation state store for tests and embedding hosts.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides an in-memory [`ValidationStateStore`] for tests and
//! embedding hosts. Commits are applied under one mutex so the lease check,
//! the header, and the outcomes change together.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::ExecutionId;
use crate::core::ExecutionRun;
use crate::core::QueryOutcome;
use crate::core::RunSnapshot;
use crate::core::Timestamp;
use crate::interfaces::LeaseClaim;
use crate::interfaces::RELEASED_LEASE_HOLDER;
use crate::interfaces::StoreError;
use crate::interfaces::ValidationStateStore;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Persisted run plus its creation sequence number.
#[derive(Debug, Clone)]
struct StoredRun {
    /// Creation order across runs.
    sequence: u64,
    /// Latest snapshot.
    snapshot: RunSnapshot,
}

/// Advisory lease on one execution.
#[derive(Debug, Clone)]
struct Lease {
    /// Lease holder.
    holder: String,
    /// Expiry tick.
    expires_at: i64,
}

/// Store contents guarded by one mutex.
#[derive(Debug, Default)]
struct StoreState {
    /// Runs keyed by execution id.
    runs: BTreeMap<ExecutionId, StoredRun>,
    /// Active leases.
    leases: BTreeMap<ExecutionId, Lease>,
    /// Next creation sequence number.
    next_sequence: u64,
}

/// In-memory validation state store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryValidationStore {
    /// Store state protected by a mutex.
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryValidationStore {
    /// Creates a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the store state.
    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Store("validation state store mutex poisoned".to_string()))
    }

    /// Returns the most recent run matching a predicate.
    fn latest_matching(
        &self,
        predicate: impl Fn(&ExecutionRun) -> bool,
    ) -> Result<Option<ExecutionId>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .runs
            .values()
            .filter(|stored| predicate(&stored.snapshot.run))
            .max_by_key(|stored| stored.sequence)
            .map(|stored| stored.snapshot.run.execution_id.clone()))
    }
}

impl ValidationStateStore for InMemoryValidationStore {
    fn load(&self, execution_id: &ExecutionId) -> Result<Option<RunSnapshot>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.runs.get(execution_id).map(|stored| stored.snapshot.clone()))
    }

    fn commit(
        &self,
        run: &ExecutionRun,
        outcomes: &[QueryOutcome],
        lease: &LeaseClaim,
    ) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        match state.leases.get_mut(&run.execution_id) {
            Some(current) if current.holder == lease.holder => {
                current.expires_at = lease.expires_at();
            }
            Some(current) => {
                return Err(StoreError::Locked {
                    execution_id: run.execution_id.to_string(),
                    holder: current.holder.clone(),
                });
            }
            None => {
                return Err(StoreError::Locked {
                    execution_id: run.execution_id.to_string(),
                    holder: RELEASED_LEASE_HOLDER.to_string(),
                });
            }
        }
        if !state.runs.contains_key(&run.execution_id) {
            let sequence = state.next_sequence;
            state.next_sequence += 1;
            state.runs.insert(run.execution_id.clone(), StoredRun {
                sequence,
                snapshot: RunSnapshot {
                    run: run.clone(),
                    outcomes: BTreeMap::new(),
                },
            });
        }
        if let Some(stored) = state.runs.get_mut(&run.execution_id) {
            stored.snapshot.run = run.clone();
            for outcome in outcomes {
                stored.snapshot.outcomes.insert(outcome.query_id.clone(), outcome.clone());
            }
        }
        drop(guard);
        Ok(())
    }

    fn latest_incomplete(&self) -> Result<Option<ExecutionId>, StoreError> {
        self.latest_matching(|run| run.status.is_incomplete())
    }

    fn latest(&self) -> Result<Option<ExecutionId>, StoreError> {
        self.latest_matching(|_| true)
    }

    fn list_runs(&self, limit: usize) -> Result<Vec<ExecutionRun>, StoreError> {
        let guard = self.lock()?;
        let mut runs: Vec<&StoredRun> = guard.runs.values().collect();
        runs.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        Ok(runs.into_iter().take(limit).map(|stored| stored.snapshot.run.clone()).collect())
    }

    fn acquire_lock(
        &self,
        execution_id: &ExecutionId,
        holder: &str,
        now: Timestamp,
        ttl_ms: u64,
    ) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        if let Some(lease) = guard.leases.get(execution_id)
            && lease.holder != holder
            && lease.expires_at > now.ticks()
        {
            return Err(StoreError::Locked {
                execution_id: execution_id.to_string(),
                holder: lease.holder.clone(),
            });
        }
        let claim = LeaseClaim::new(holder, now, ttl_ms);
        guard.leases.insert(execution_id.clone(), Lease {
            expires_at: claim.expires_at(),
            holder: claim.holder,
        });
        drop(guard);
        Ok(())
    }

    fn release_lock(&self, execution_id: &ExecutionId, holder: &str) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        if guard.leases.get(execution_id).is_some_and(|lease| lease.holder == holder) {
            guard.leases.remove(execution_id);
        }
        drop(guard);
        Ok(())
    }
}
