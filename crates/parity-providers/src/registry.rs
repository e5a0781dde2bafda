// crates/parity-providers/src/registry.rs
// ============================================================================
// Module: Provider Executor
// Description: Closed set of built-in executor adapters.
// Purpose: Let hosts pick an adapter at runtime behind one concrete type.
// Dependencies: parity-core
// ============================================================================

//! ## Overview
//! [`ProviderExecutor`] wraps the built-in adapters so a host can select one
//! from configuration while the engine stays generic over a single executor
//! type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use parity_core::Dataset;
use parity_core::ExecutorError;
use parity_core::QueryDefinition;
use parity_core::QueryExecutor;
use parity_core::TargetSide;

use crate::fixture::JsonFixtureConfig;
use crate::fixture::JsonFixtureExecutor;
use crate::sqlite::SqliteExecutorConfig;
use crate::sqlite::SqliteQueryExecutor;

// ============================================================================
// SECTION: Provider Executor
// ============================================================================

/// Built-in executor adapter selected at runtime.
#[derive(Debug, Clone)]
pub enum ProviderExecutor {
    /// `SQLite` database files.
    Sqlite(SqliteQueryExecutor),
    /// JSON fixture directories.
    JsonFixture(JsonFixtureExecutor),
}

impl ProviderExecutor {
    /// Creates a `SQLite`-backed executor.
    #[must_use]
    pub const fn sqlite(config: SqliteExecutorConfig) -> Self {
        Self::Sqlite(SqliteQueryExecutor::new(config))
    }

    /// Creates a fixture-backed executor.
    #[must_use]
    pub const fn json_fixture(config: JsonFixtureConfig) -> Self {
        Self::JsonFixture(JsonFixtureExecutor::new(config))
    }

    /// Returns the adapter label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::JsonFixture(_) => "json_fixture",
        }
    }
}

#[async_trait]
impl QueryExecutor for ProviderExecutor {
    async fn materialize(
        &self,
        query: &QueryDefinition,
        side: TargetSide,
    ) -> Result<Box<dyn Dataset>, ExecutorError> {
        match self {
            Self::Sqlite(executor) => executor.materialize(query, side).await,
            Self::JsonFixture(executor) => executor.materialize(query, side).await,
        }
    }
}
