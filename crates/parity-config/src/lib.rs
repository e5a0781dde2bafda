// crates/parity-config/src/lib.rs
// ============================================================================
// Module: Parity Config Library
// Description: Public surface for the Parity configuration model.
// Purpose: Load, validate, and convert `parity.toml` into engine inputs.
// Dependencies: crate::config, crate::generate
// ============================================================================

//! ## Overview
//! Configuration is a TOML document with `[engine]`, `[store]`, `[output]`,
//! `[logging]`, `[executor]`, and `[[queries]]` sections. Loading is
//! fail-closed: path, size, and encoding limits apply before parsing, unknown
//! keys are rejected, and the query catalog is validated as a dependency
//! graph before any engine is built. [`generate_catalog`] drafts a starter
//! catalog from a list of tables.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod generate;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::EngineSection;
pub use config::ExecutorKind;
pub use config::ExecutorSection;
pub use config::LogSinkKind;
pub use config::LoggingSection;
pub use config::OutputSection;
pub use config::ParityConfig;
pub use config::QueryConfig;
pub use config::StoreSection;
pub use generate::DEFAULT_SAMPLE_ROWS;
pub use generate::TableSpec;
pub use generate::generate_catalog;
pub use generate::render_catalog;
