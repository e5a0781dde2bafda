// crates/parity-core/src/runtime/clock.rs
// ============================================================================
// Module: Parity Clocks
// Description: Wall-clock and logical implementations of the Clock interface.
// Purpose: Keep time reads at the host boundary and make tests deterministic.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`SystemClock`] reads unix milliseconds and is what hosts install in
//! production. [`LogicalClock`] returns a monotonically increasing counter so
//! persisted timestamps are reproducible in tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::core::Timestamp;
use crate::interfaces::Clock;

// ============================================================================
// SECTION: Clocks
// ============================================================================

/// Wall clock reporting unix milliseconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Timestamp::UnixMillis(i64::try_from(millis).unwrap_or(i64::MAX))
    }
}

/// Logical clock that advances by one on every read.
#[derive(Debug, Default)]
pub struct LogicalClock {
    /// Next value to return.
    next: AtomicU64,
}

impl LogicalClock {
    /// Creates a logical clock starting at `start`.
    #[must_use]
    pub const fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl Clock for LogicalClock {
    fn now(&self) -> Timestamp {
        Timestamp::Logical(self.next.fetch_add(1, Ordering::SeqCst))
    }
}
