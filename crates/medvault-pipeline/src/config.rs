//! Pipeline configuration and retry policy
//!
//! All knobs live here so deployments configure one struct. The retry
//! policy computes its own delays, which keeps backoff testable against a
//! paused clock instead of being buried in call sites.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default upload ceiling: 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Bounded exponential backoff with jitter for retryable failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts before giving up, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay_ms: u64,
    /// Ceiling on any single delay.
    pub max_delay_ms: u64,
    /// Multiplier applied per attempt (2.0 doubles).
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 100,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after the failed attempt numbered `attempt` (1-based),
    /// with up to 25% random jitter added so retrying callers spread out.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let raw = self.base_delay_ms as f64 * self.backoff_multiplier.powi(exponent as i32);
        let capped = raw.min(self.max_delay_ms as f64) as u64;
        let jitter = rand::thread_rng().gen_range(0..=capped / 4);
        Duration::from_millis(capped + jitter)
    }

    /// Whether another attempt is allowed after `attempt` failures.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Configuration for one pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Reject uploads larger than this many bytes.
    pub max_upload_bytes: u64,
    /// Timeout applied to every blob store, key service, and ledger call.
    pub upstream_timeout_ms: u64,
    /// Retry policy for lifecycle event publishing.
    pub publish_retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upstream_timeout_ms: 10_000,
            publish_retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Upstream call timeout as a `Duration`.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_and_stay_bounded() {
        let policy = RetryPolicy {
            max_attempts: 6,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
            backoff_multiplier: 2.0,
        };
        // Jitter adds at most 25%, so compare against the capped base.
        assert!(policy.delay_after(1) >= Duration::from_millis(100));
        assert!(policy.delay_after(1) <= Duration::from_millis(125));
        assert!(policy.delay_after(3) >= Duration::from_millis(400));
        assert!(policy.delay_after(10) <= Duration::from_millis(1_250));
    }

    #[test]
    fn retry_ceiling_is_respected() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(3));
        assert!(!policy.should_retry(4));
    }

    #[test]
    fn config_round_trips_through_serde() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_upload_bytes, config.max_upload_bytes);
        assert_eq!(back.publish_retry.max_attempts, 4);
    }
}
