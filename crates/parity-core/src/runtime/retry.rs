// crates/parity-core/src/runtime/retry.rs
// ============================================================================
// Module: Parity Retry Policy
// Description: Exponential backoff schedule for retryable query failures.
// Purpose: Compute deterministic, capped delays between materialization attempts.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The engine retries retryable executor failures in an explicit loop. The
//! delay before attempt `n + 1` is `base_delay_ms * 2^(n - 1)`, capped at
//! `max_delay_ms`. A zero base disables waiting (used by tests).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default base delay (ms); matches a one-second first backoff.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;
/// Default delay cap (ms).
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 60_000;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Exponential backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay after the first failed attempt.
    pub base_delay_ms: u64,
    /// Upper bound on any single delay.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: DEFAULT_BACKOFF_BASE_MS,
            max_delay_ms: DEFAULT_BACKOFF_MAX_MS,
        }
    }
}

impl RetryPolicy {
    /// Policy that retries immediately.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Returns the delay (ms) after `failed_attempt` (1-based) fails.
    #[must_use]
    pub fn delay_ms(&self, failed_attempt: u32) -> u64 {
        let exponent = failed_attempt.max(1) - 1;
        let factor = 1_u64.checked_shl(exponent).unwrap_or(u64::MAX);
        self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms)
    }

    /// Returns the delay after `failed_attempt` as a [`Duration`].
    #[must_use]
    pub fn delay(&self, failed_attempt: u32) -> Duration {
        Duration::from_millis(self.delay_ms(failed_attempt))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::RetryPolicy;

    #[test]
    fn delays_double_until_capped() {
        let policy = RetryPolicy {
            base_delay_ms: 1_000,
            max_delay_ms: 5_000,
        };
        let delays: Vec<u64> = (1 ..= 5).map(|attempt| policy.delay_ms(attempt)).collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 5_000, 5_000]);
    }

    #[test]
    fn huge_attempt_numbers_saturate() {
        let policy = RetryPolicy {
            base_delay_ms: 1_000,
            max_delay_ms: u64::MAX,
        };
        assert_eq!(policy.delay_ms(200), u64::MAX);
        assert_eq!(RetryPolicy::immediate().delay_ms(3), 0);
    }
}
