// crates/parity-core/src/core/mod.rs
// ============================================================================
// Module: Parity Core Types
// Description: Canonical query definitions, run headers, and outcome records.
// Purpose: Provide stable, serializable types for validation runs and ledgers.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Core types describe what a validation run checks ([`QueryDefinition`]),
//! how far it has progressed ([`ExecutionRun`]), and what each query produced
//! ([`QueryOutcome`]). These types are the canonical source of truth for the
//! persisted state layout and every derived report.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod dataset;
pub mod hashing;
pub mod identifiers;
pub mod outcome;
pub mod query;
pub mod run;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dataset::ColumnSchema;
pub use dataset::ColumnType;
pub use dataset::Dataset;
pub use dataset::DatasetError;
pub use dataset::MaterializedDataset;
pub use dataset::Row;
pub use dataset::RowOrder;
pub use dataset::RowStream;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use identifiers::ExecutionId;
pub use identifiers::QueryId;
pub use outcome::ArtifactRef;
pub use outcome::ColumnStats;
pub use outcome::ComparisonResult;
pub use outcome::ExecutionTimings;
pub use outcome::FailureKind;
pub use outcome::OutcomeError;
pub use outcome::OutcomeStatus;
pub use outcome::QueryOutcome;
pub use outcome::SampleDifference;
pub use query::ComparisonParams;
pub use query::ComparisonStrategy;
pub use query::DefinitionError;
pub use query::Priority;
pub use query::QueryCategory;
pub use query::QueryDefinition;
pub use run::ExecutionRun;
pub use run::RunSnapshot;
pub use run::RunStatus;
pub use run::RunSummary;
pub use time::Timestamp;
