// crates/parity-core/src/core/time.rs
// ============================================================================
// Module: Parity Time Model
// Description: Canonical timestamp representations for run headers and outcomes.
// Purpose: Provide deterministic, replayable time values across persisted records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Parity records explicit time values in run headers, outcomes, and audit
//! events. The core engine never reads wall-clock time directly; hosts supply
//! timestamps through a [`crate::interfaces::Clock`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in run headers, outcomes, and audit events.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads wall-clock time.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds.
    UnixMillis(i64),
    /// Monotonic logical time value.
    Logical(u64),
}

impl Timestamp {
    /// Returns the timestamp as unix milliseconds when available.
    #[must_use]
    pub const fn as_unix_millis(&self) -> Option<i64> {
        match self {
            Self::UnixMillis(value) => Some(*value),
            Self::Logical(_) => None,
        }
    }

    /// Returns the timestamp as logical time when available.
    #[must_use]
    pub const fn as_logical(&self) -> Option<u64> {
        match self {
            Self::UnixMillis(_) => None,
            Self::Logical(value) => Some(*value),
        }
    }

    /// Returns the raw tick value used for ordering and lease arithmetic.
    ///
    /// Unix timestamps tick in milliseconds; logical timestamps tick in
    /// caller-defined units.
    #[must_use]
    pub fn ticks(&self) -> i64 {
        match self {
            Self::UnixMillis(value) => *value,
            Self::Logical(value) => i64::try_from(*value).unwrap_or(i64::MAX),
        }
    }

    /// Returns the elapsed ticks from `self` to `later`, saturating at zero.
    ///
    /// Returns `None` when the two timestamps use different time domains.
    #[must_use]
    pub fn elapsed_until(&self, later: &Self) -> Option<u64> {
        match (self, later) {
            (Self::UnixMillis(start), Self::UnixMillis(end)) => {
                Some(u64::try_from(end.saturating_sub(*start)).unwrap_or(0))
            }
            (Self::Logical(start), Self::Logical(end)) => Some(end.saturating_sub(*start)),
            _ => None,
        }
    }
}
