//! Reconnect backoff policy.

use std::time::Duration;

/// Linear backoff with a hard cap on automatic attempts.
///
/// Attempt `n` (1-based) waits `base_delay * n`. Once `max_attempts`
/// retries have been scheduled without a successful connect, automatic
/// reconnection stops until the caller connects explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay unit multiplied by the attempt number.
    ///
    /// Default: 3 seconds
    pub base_delay: Duration,

    /// Number of automatic retries before giving up.
    ///
    /// Default: 3 attempts
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(3),
            max_attempts: 3,
        }
    }
}

impl ReconnectPolicy {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
        }
    }

    /// Policy that never retries on its own.
    pub fn disabled() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_attempts: 0,
        }
    }

    /// Delay before the given 1-based attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.max(1))
    }

    /// Whether another automatic attempt is allowed after `attempts_made`.
    pub fn allows_attempt(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}
