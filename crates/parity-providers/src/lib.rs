// crates/parity-providers/src/lib.rs
// ============================================================================
// Module: Parity Providers
// Description: Built-in executor adapters and runtime selection.
// Purpose: Materialize source and target datasets for the run engine.
// Dependencies: parity-core, rusqlite, serde, serde_json, tokio
// ============================================================================

//! ## Overview
//! This crate ships the reference [`QueryExecutor`] adapters: a `SQLite`
//! executor that runs query SQL against two database files, and a JSON
//! fixture executor that reads pre-materialized result sets. Adapters never
//! retry; they classify failures and let the engine own retry policy.
//! Invariants:
//! - Every failure is reported as a classified [`ExecutorError`] tagged with
//!   the failing side.
//! - Inputs are size-limited and fail closed.
//!
//! [`QueryExecutor`]: parity_core::QueryExecutor
//! [`ExecutorError`]: parity_core::ExecutorError

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod fixture;
pub mod registry;
pub mod sqlite;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use fixture::JsonFixtureConfig;
pub use fixture::JsonFixtureExecutor;
pub use registry::ProviderExecutor;
pub use sqlite::SqliteExecutorConfig;
pub use sqlite::SqliteQueryExecutor;
pub use sqlite::SqliteStreamDataset;
