// crates/parity-store-sqlite/src/lib.rs
// ============================================================================
// Module: Parity SQLite Store
// Description: Durable ValidationStateStore backend using SQLite WAL.
// Purpose: Provide crash-safe persistence for validation run state.
// Dependencies: parity-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`ValidationStateStore`] that persists
//! run headers and per-query outcomes as canonical JSON with stored hashes,
//! plus a versioned outcome history and advisory run leases. Every commit is
//! one transaction, so a crash never leaves a header and its outcomes out of
//! step.
//!
//! [`ValidationStateStore`]: parity_core::ValidationStateStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_STATE_BYTES;
pub use store::OutcomeVersionSummary;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::SqliteValidationStore;
