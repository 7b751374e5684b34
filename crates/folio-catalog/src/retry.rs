//! Bounded retry with exponential backoff for optimistic commits.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Retry cap and backoff shape for watch/commit loops.
///
/// Attempt `n` (1-based) that loses its commit race sleeps for a random
/// duration in `[0, min(max_delay, base_delay * 2^(n-1))]` before
/// re-reading. After `max_attempts` lost races the update fails with
/// [`CatalogError::ConcurrencyConflict`](crate::CatalogError::ConcurrencyConflict).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 16,
            base_delay_ms: 2,
            max_delay_ms: 100,
        }
    }
}

impl RetryPolicy {
    /// Retry up to `max_attempts` times with no sleep in between.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Upper bound of the sleep after losing attempt `attempt`.
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(32);
        let millis = self
            .base_delay_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_delay_ms);
        Duration::from_millis(millis)
    }

    /// Sleep for a jittered delay after losing attempt `attempt`.
    pub(crate) async fn pause(&self, attempt: u32) {
        let ceiling = self.ceiling(attempt).as_millis() as u64;
        if ceiling == 0 {
            tokio::task::yield_now().await;
            return;
        }
        let millis = rand::thread_rng().gen_range(0..=ceiling);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_doubles_then_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay_ms: 2,
            max_delay_ms: 20,
        };
        assert_eq!(policy.ceiling(1), Duration::from_millis(2));
        assert_eq!(policy.ceiling(2), Duration::from_millis(4));
        assert_eq!(policy.ceiling(4), Duration::from_millis(16));
        assert_eq!(policy.ceiling(5), Duration::from_millis(20));
        assert_eq!(policy.ceiling(200), Duration::from_millis(20));
    }

    #[test]
    fn immediate_never_sleeps() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.ceiling(1), Duration::ZERO);
        assert_eq!(policy.ceiling(3), Duration::ZERO);
    }

    #[tokio::test]
    async fn pause_stays_under_ceiling() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay_ms: 1,
            max_delay_ms: 5,
        };
        let start = tokio::time::Instant::now();
        policy.pause(3).await;
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}
