// crates/parity-report/src/lib.rs
// ============================================================================
// Module: Parity Report
// Description: Reference report and artifact sinks for the run engine.
// Purpose: Persist outcomes beyond the state store for review and audit.
// Dependencies: parity-core, serde, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! Sinks in this crate consume committed outcomes. They are advisory: the
//! engine logs sink errors and carries on, so nothing here can change a
//! run's result.
//!
//! - [`LedgerSink`] appends a hash-chained JSON-lines ledger per execution.
//! - [`SummaryFileSink`] writes one summary document per finished run.
//! - [`FileArtifactSink`] writes one report per finished query.
//! - [`ChannelSink`] forwards events to an async consumer.
//! - [`CompositeSink`] fans callbacks out to several sinks.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod artifact;
pub mod channel;
pub mod composite;
pub mod ledger;
pub mod summary;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use artifact::FileArtifactSink;
pub use artifact::QueryReport;
pub use artifact::recommendations;
pub use channel::ChannelSink;
pub use channel::ReportEvent;
pub use composite::CompositeSink;
pub use ledger::LedgerEntry;
pub use ledger::LedgerError;
pub use ledger::LedgerSink;
pub use ledger::LedgerVerification;
pub use ledger::ledger_file;
pub use ledger::verify_ledger;
pub use summary::QuerySummaryLine;
pub use summary::RunSummaryReport;
pub use summary::SummaryFileSink;
