//! Retry policy for transient matching-service failures

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which statuses are retried, how often, and how long to wait in between
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// HTTP statuses treated as transient
    pub retry_statuses: Vec<u16>,
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after that
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_statuses: vec![429, 502, 503, 504],
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Policy that never waits between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Whether `status` is worth another attempt
    pub fn is_transient(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// Whether another attempt is allowed after `attempt` (0-based) failed with `status`
    pub fn should_retry(&self, attempt: u32, status: u16) -> bool {
        self.is_transient(status) && attempt + 1 < self.max_attempts
    }

    /// Backoff before retrying after the 0-based `attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}
