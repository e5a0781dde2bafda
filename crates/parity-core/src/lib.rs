// crates/parity-core/src/lib.rs
// ============================================================================
// Module: Parity Core Library
// Description: Public API surface for the Parity validation run engine.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Parity core validates that a source and a target dataset agree across a
//! batch of queries. The run engine sequences query execution, enforces
//! dependency ordering, retries transient failures, dispatches comparators,
//! and checkpoints every transition through a durable state store so an
//! interrupted run resumes without duplicate work or lost results.
//!
//! The core is backend-agnostic: warehouses, state persistence, and report
//! rendering integrate through the traits in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ArtifactError;
pub use interfaces::ArtifactSink;
pub use interfaces::Clock;
pub use interfaces::ExecutorError;
pub use interfaces::ExecutorErrorKind;
pub use interfaces::LeaseClaim;
pub use interfaces::QueryExecutor;
pub use interfaces::RELEASED_LEASE_HOLDER;
pub use interfaces::ReportSink;
pub use interfaces::SinkError;
pub use interfaces::StoreError;
pub use interfaces::TargetSide;
pub use interfaces::ValidationStateStore;
pub use runtime::CompareSettings;
pub use runtime::Comparator;
pub use runtime::ComparatorError;
pub use runtime::EngineConfig;
pub use runtime::EngineError;
pub use runtime::ExecutionPlan;
pub use runtime::InMemoryValidationStore;
pub use runtime::LogicalClock;
pub use runtime::PlanError;
pub use runtime::RetryPolicy;
pub use runtime::RunAuditEvent;
pub use runtime::RunAuditSink;
pub use runtime::RunReport;
pub use runtime::RunRequest;
pub use runtime::StopSignal;
pub use runtime::SystemClock;
pub use runtime::ValidationEngine;
pub use runtime::compare_datasets;
