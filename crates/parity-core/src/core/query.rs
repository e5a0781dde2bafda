// crates/parity-core/src/core/query.rs
// ============================================================================
// Module: Parity Query Definitions
// Description: Immutable validation query definitions and comparison parameters.
// Purpose: Describe what each query checks and how its datasets are compared.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`QueryDefinition`] is the immutable unit of work in a validation run:
//! the SQL executed against both sides, the comparison strategy with its
//! parameters, and the scheduling metadata (priority, timeout, retry budget,
//! and dependencies). Definitions are validated before a plan is built;
//! validation fails closed on any parameter combination the comparator
//! cannot honor.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::QueryId;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default per-query materialization timeout (milliseconds).
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;
/// Default maximum number of attempts per query.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Query category used for grouping and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    /// Schema-level checks (columns, types, object presence).
    #[serde(alias = "schema_validation")]
    Schema,
    /// Volume checks (row counts, partition sizes).
    #[serde(alias = "data_volume")]
    Volume,
    /// Content checks (values, aggregates).
    #[serde(alias = "data_content")]
    Content,
    /// Business rule checks.
    BusinessLogic,
}

impl QueryCategory {
    /// Returns the stable label for this category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Volume => "volume",
            Self::Content => "content",
            Self::BusinessLogic => "business_logic",
        }
    }
}

/// Query priority; more urgent priorities sort first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Must run first.
    Critical,
    /// High priority.
    High,
    /// Default priority.
    #[default]
    Medium,
    /// Low priority.
    Low,
}

impl Priority {
    /// Returns the stable label for this priority.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

// ============================================================================
// SECTION: Comparison Parameters
// ============================================================================

/// Comparison strategy selected for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonStrategy {
    /// Datasets must be value-identical.
    ExactMatch,
    /// Numeric differences within an absolute tolerance are accepted.
    Tolerance,
    /// Keyed row-level set comparison with optional sampling.
    #[serde(alias = "reladiff")]
    RowDiff,
}

impl ComparisonStrategy {
    /// Returns the stable label for this strategy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExactMatch => "exact_match",
            Self::Tolerance => "tolerance",
            Self::RowDiff => "row_diff",
        }
    }
}

/// Strategy parameters shared by all comparators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonParams {
    /// Absolute numeric tolerance (tolerance strategy only).
    #[serde(default)]
    pub tolerance: f64,
    /// Key columns identifying a row.
    #[serde(default)]
    pub key_columns: Vec<String>,
    /// Columns excluded from equality checks.
    #[serde(default)]
    pub ignore_columns: Vec<String>,
    /// Number of leading keys evaluated before a full comparison (row diff only).
    #[serde(default)]
    pub sample_size: Option<u64>,
    /// Forces a full comparison even when a sample matches.
    #[serde(default = "default_full_validation")]
    pub full_validation: bool,
}

impl Default for ComparisonParams {
    fn default() -> Self {
        Self {
            tolerance: 0.0,
            key_columns: Vec::new(),
            ignore_columns: Vec::new(),
            sample_size: None,
            full_validation: default_full_validation(),
        }
    }
}

/// Returns the default full-validation flag.
const fn default_full_validation() -> bool {
    true
}

// ============================================================================
// SECTION: Query Definition
// ============================================================================

/// Immutable validation query definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDefinition {
    /// Unique, stable query identifier.
    pub id: QueryId,
    /// Human-readable display name.
    pub name: String,
    /// Query category.
    pub category: QueryCategory,
    /// Scheduling priority.
    #[serde(default)]
    pub priority: Priority,
    /// SQL executed against both sides.
    pub sql: String,
    /// Comparison strategy.
    pub strategy: ComparisonStrategy,
    /// Strategy parameters.
    #[serde(default)]
    pub params: ComparisonParams,
    /// Materialization timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum attempts for retryable failures.
    pub max_attempts: u32,
    /// Queries that must succeed before this one is eligible.
    #[serde(default)]
    pub dependencies: Vec<QueryId>,
    /// Whether the migration is blocked when this query fails.
    pub required_for_migration: bool,
}

impl QueryDefinition {
    /// Creates a definition with default scheduling and comparison parameters.
    #[must_use]
    pub fn new(
        id: impl Into<QueryId>,
        category: QueryCategory,
        strategy: ComparisonStrategy,
        sql: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            category,
            priority: Priority::Medium,
            sql: sql.into(),
            strategy,
            params: ComparisonParams::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            dependencies: Vec::new(),
            required_for_migration: true,
        }
    }

    /// Validates the definition in isolation.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError`] when the definition cannot be executed or
    /// compared as declared.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let invalid = |reason: String| DefinitionError::Invalid {
            query_id: self.id.to_string(),
            reason,
        };
        if self.id.as_str().trim().is_empty() {
            return Err(invalid("query id must be non-empty".to_string()));
        }
        if self.sql.trim().is_empty() {
            return Err(invalid("sql must be non-empty".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(invalid("timeout must be greater than zero".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(invalid("max attempts must be greater than zero".to_string()));
        }
        if !self.params.tolerance.is_finite() || self.params.tolerance < 0.0 {
            return Err(invalid("tolerance must be a finite, non-negative number".to_string()));
        }
        if self.params.sample_size == Some(0) {
            return Err(invalid("sample size must be greater than zero".to_string()));
        }
        if self.strategy == ComparisonStrategy::RowDiff && self.params.key_columns.is_empty() {
            return Err(DefinitionError::MissingKeyColumns(self.id.to_string()));
        }
        if self.params.sample_size.is_some() && self.strategy != ComparisonStrategy::RowDiff {
            return Err(invalid("sample size is only supported by row_diff".to_string()));
        }
        let mut seen = BTreeSet::new();
        for column in &self.params.key_columns {
            if !seen.insert(column.as_str()) {
                return Err(invalid(format!("duplicate key column: {column}")));
            }
            if self.params.ignore_columns.contains(column) {
                return Err(invalid(format!("key column cannot be ignored: {column}")));
            }
        }
        if self.dependencies.contains(&self.id) {
            return Err(invalid("query cannot depend on itself".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Query definition validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// Row diff was requested without key columns.
    #[error("query {0}: row_diff requires at least one key column")]
    MissingKeyColumns(String),
    /// Definition violates a parameter constraint.
    #[error("query {query_id}: {reason}")]
    Invalid {
        /// Offending query identifier.
        query_id: String,
        /// Human-readable reason.
        reason: String,
    },
}

// ============================================================================
// SECTION: Tests
// ============================================================================
