// crates/parity-core/src/runtime/mod.rs
// ============================================================================
// Module: Parity Runtime
// Description: Engine, planning, comparison, and in-process adapters.
// Purpose: Group the runtime pieces that drive validation runs.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Runtime modules implement run orchestration on top of the core types and
//! interfaces: plan construction, dataset comparison, retry backoff, audit
//! logging, clocks, and an in-memory state store.

pub mod audit;
pub mod clock;
pub mod comparator;
pub mod engine;
pub mod plan;
pub mod retry;
pub mod store;

pub use audit::FileAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::RunAuditEvent;
pub use audit::RunAuditSink;
pub use audit::StderrAuditSink;
pub use clock::LogicalClock;
pub use clock::SystemClock;
pub use comparator::CompareSettings;
pub use comparator::Comparator;
pub use comparator::ComparatorError;
pub use comparator::DEFAULT_SAMPLE_DIFFERENCES_LIMIT;
pub use comparator::compare_datasets;
pub use engine::EngineConfig;
pub use engine::EngineError;
pub use engine::RunReport;
pub use engine::RunRequest;
pub use engine::StopSignal;
pub use engine::ValidationEngine;
pub use plan::ExecutionPlan;
pub use plan::PlanError;
pub use plan::validate_catalog;
pub use retry::RetryPolicy;
pub use store::InMemoryValidationStore;
