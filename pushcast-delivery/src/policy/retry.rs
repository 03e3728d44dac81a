//! Retry policy for transient send failures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::backoff::calculate_retry_delay;

/// How often, and how patiently, a transiently failing send is retried.
///
/// Only temporary failures are retried. The provider may retry internally as
/// well, so the defaults stay small.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts per target, the first one included.
    ///
    /// Default: 3 attempts
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failed attempt (in milliseconds).
    ///
    /// Doubles with every further attempt: `base * 2^(attempts - 1)`
    ///
    /// Default: 200 milliseconds
    #[serde(default = "defaults::base_retry_delay_ms")]
    pub base_retry_delay_ms: u64,

    /// Maximum retry delay (in milliseconds).
    ///
    /// Default: 5000 milliseconds
    #[serde(default = "defaults::max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,

    /// Jitter factor for randomizing retry delays.
    ///
    /// Keeps many targets failing together from retrying in lockstep.
    ///
    /// Default: 0.1 (±10%)
    #[serde(default = "defaults::retry_jitter_factor")]
    pub retry_jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            base_retry_delay_ms: defaults::base_retry_delay_ms(),
            max_retry_delay_ms: defaults::max_retry_delay_ms(),
            retry_jitter_factor: defaults::retry_jitter_factor(),
        }
    }
}

impl RetryPolicy {
    /// A policy that sends exactly once.
    #[must_use]
    pub fn never() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Check if another attempt is allowed after `attempt_count` attempts.
    #[must_use]
    pub const fn should_retry(&self, attempt_count: u32) -> bool {
        attempt_count < self.max_attempts
    }

    /// How long to wait after `attempt_count` failed attempts.
    #[must_use]
    pub fn retry_delay(&self, attempt_count: u32) -> Duration {
        calculate_retry_delay(
            attempt_count,
            self.base_retry_delay_ms,
            self.max_retry_delay_ms,
            self.retry_jitter_factor,
        )
    }

    /// Returns `0` if max attempts has been reached.
    #[must_use]
    pub const fn remaining_attempts(&self, attempt_count: u32) -> u32 {
        self.max_attempts.saturating_sub(attempt_count)
    }
}

mod defaults {
    pub const fn max_attempts() -> u32 {
        3
    }

    pub const fn base_retry_delay_ms() -> u64 {
        200
    }

    pub const fn max_retry_delay_ms() -> u64 {
        5_000
    }

    pub const fn retry_jitter_factor() -> f64 {
        0.1 // ±10%
    }
}
