// crates/parity-core/src/core/identifiers.rs
// ============================================================================
// Module: Parity Identifiers
// Description: Canonical opaque identifiers for validation runs and queries.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: rand, serde, time
// ============================================================================

//! ## Overview
//! Identifiers are opaque strings on the wire. Execution identifiers are
//! generated from a caller-supplied timestamp plus a random suffix so two
//! runs started in the same second never collide.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix shared by every generated execution identifier.
const EXECUTION_ID_PREFIX: &str = "validation";
/// Number of random bytes appended to generated execution identifiers.
const EXECUTION_ID_RANDOM_BYTES: usize = 3;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Execution identifier for one validation run.
///
/// # Invariants
/// - Stable across process restarts; a resumed run keeps its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Creates a new execution identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh execution identifier for the provided start time.
    ///
    /// Unix timestamps render as `validation_YYYYMMDD_HHMMSS_<hex>` (UTC).
    /// Logical timestamps render as `validation_t<value>_<hex>`.
    #[must_use]
    pub fn generate(started_at: Timestamp) -> Self {
        let stamp = match started_at {
            Timestamp::UnixMillis(millis) => format_unix_millis(millis),
            Timestamp::Logical(value) => format!("t{value}"),
        };
        let mut suffix = [0_u8; EXECUTION_ID_RANDOM_BYTES];
        rand::thread_rng().fill(&mut suffix[..]);
        let suffix: String = suffix.iter().map(|byte| format!("{byte:02x}")).collect();
        Self(format!("{EXECUTION_ID_PREFIX}_{stamp}_{suffix}"))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ExecutionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ExecutionId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Query identifier within a validation catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(String);

impl QueryId {
    /// Creates a new query identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for QueryId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for QueryId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Formats unix milliseconds as a compact UTC stamp (`YYYYMMDD_HHMMSS`).
fn format_unix_millis(millis: i64) -> String {
    let nanos = i128::from(millis) * 1_000_000;
    let format = format_description!("[year][month][day]_[hour][minute][second]");
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|value| value.format(&format).ok())
        .unwrap_or_else(|| format!("ms{millis}"))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use super::ExecutionId;
    use crate::core::time::Timestamp;

    #[test]
    fn generated_execution_id_embeds_utc_stamp() {
        // 2024-03-05T07:08:09Z
        let id = ExecutionId::generate(Timestamp::UnixMillis(1_709_622_489_000));
        assert!(id.as_str().starts_with("validation_20240305_070809_"));
        assert_eq!(id.as_str().len(), "validation_20240305_070809_".len() + 6);
    }

    #[test]
    fn generated_execution_ids_differ_for_same_instant() {
        let first = ExecutionId::generate(Timestamp::Logical(7));
        let second = ExecutionId::generate(Timestamp::Logical(7));
        assert!(first.as_str().starts_with("validation_t7_"));
        assert_ne!(first, second);
    }
}
