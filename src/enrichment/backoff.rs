//! Bounded backoff for the rate-limited guide API
//!
//! The number of attempts is capped, so the total time spent waiting for a
//! single guide never exceeds [`BackoffPolicy::max_total_wait_time`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{FixError, Result};

/// How the wait grows between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Same delay before every retry
    Fixed,
    /// `base * 2^(retry - 1)`, capped at `max_delay_ms`
    Exponential,
}

/// Retry bound and wait schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    /// Total attempts including the first request
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub strategy: BackoffStrategy,
    /// Add up to ±25% random variation to each wait
    pub jitter: bool,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 5000,
            max_delay_ms: 20000,
            strategy: BackoffStrategy::Fixed,
            jitter: false,
        }
    }
}

impl BackoffPolicy {
    /// Fixed-delay policy, mostly useful for tests
    pub fn fixed(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            strategy: BackoffStrategy::Fixed,
            jitter: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(FixError::ConfigError(
                "enrichment.backoff.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(FixError::ConfigError(
                "enrichment.backoff.max_delay_ms must not be below base_delay_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether another attempt is allowed after `attempt` attempts were made
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Wait before retry number `retry` (1-based), without jitter
    fn base_delay(&self, retry: u32) -> u64 {
        let delay = match self.strategy {
            BackoffStrategy::Fixed => self.base_delay_ms,
            BackoffStrategy::Exponential => {
                let shift = retry.saturating_sub(1).min(32);
                self.base_delay_ms.saturating_mul(1u64 << shift)
            }
        };
        delay.min(self.max_delay_ms)
    }

    /// Wait before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let delay_ms = self.base_delay(retry);

        let final_delay = if self.jitter {
            let jitter = (delay_ms / 4) as f64;
            let offset = (rand::random::<f64>() * 2.0 - 1.0) * jitter;
            ((delay_ms as f64) + offset).max(0.0) as u64
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay)
    }

    /// Upper bound of the time spent sleeping for one guide, ignoring jitter
    pub fn max_total_wait_time(&self) -> Duration {
        let total_ms: u64 = (1..self.max_attempts).map(|retry| self.base_delay(retry)).sum();
        Duration::from_millis(total_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay() {
        let policy = BackoffPolicy::fixed(4, 5000);
        assert_eq!(policy.delay_for(1), Duration::from_millis(5000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(5000));
        assert_eq!(policy.max_total_wait_time(), Duration::from_millis(15000));
    }

    #[test]
    fn test_exponential_delay() {
        let policy = BackoffPolicy {
            max_attempts: 5,
            base_delay_ms: 1000,
            max_delay_ms: 16000,
            strategy: BackoffStrategy::Exponential,
            jitter: false,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(8000));
        assert_eq!(policy.max_total_wait_time(), Duration::from_millis(15000));
    }

    #[test]
    fn test_delay_cap() {
        let policy = BackoffPolicy {
            max_attempts: 40,
            base_delay_ms: 1000,
            max_delay_ms: 16000,
            strategy: BackoffStrategy::Exponential,
            jitter: false,
        };
        assert_eq!(policy.delay_for(10), Duration::from_millis(16000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(16000));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = BackoffPolicy {
            jitter: true,
            ..BackoffPolicy::fixed(3, 1000)
        };
        for _ in 0..50 {
            let delay = policy.delay_for(1).as_millis();
            assert!((750..=1250).contains(&delay));
        }
    }

    #[test]
    fn test_allows_retry() {
        let policy = BackoffPolicy::fixed(3, 10);
        assert!(policy.allows_retry(1));
        assert!(policy.allows_retry(2));
        assert!(!policy.allows_retry(3));
    }

    #[test]
    fn test_validate() {
        assert!(BackoffPolicy::default().validate().is_ok());
        assert!(BackoffPolicy::fixed(0, 10).validate().is_err());
    }
}
