//! Orchestrator-level tunables that are not owned by any single collaborator
//! crate (§4.6 step 6, §4.6.1).

use llm_resilience_core::LogicalModel;
use std::time::Duration;

/// Retry policy for the orchestrator's dispatch envelope (§4.6 step 6):
/// exponential backoff starting at `initial_delay`, doubling each attempt,
/// capped at `max_delay`, up to `max_retries` attempts. Only
/// `ErrorKind::is_retryable()` errors are retried.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
        }
    }

    /// Delay before the given 1-indexed attempt, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(16);
        let scaled = self.initial_delay.saturating_mul(1u32 << doublings);
        scaled.min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(30))
    }
}

/// Bounds and defaults the orchestrator's fan-out methods apply (spec
/// §4.6.1): the short health-probe timeout, the RAG context budget, and the
/// default model set for "node palette"-style fan-out.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub retry: RetryConfig,
    pub probe_timeout: Duration,
    pub max_context_length: usize,
    /// Default fan-out set, chosen for complementary throughput rather than
    /// every registered model (§4.6.1: "excludes providers with narrow
    /// concurrency caps unless explicitly requested").
    pub default_fanout: Vec<LogicalModel>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            probe_timeout: Duration::from_secs(5),
            max_context_length: 4000,
            default_fanout: vec![
                LogicalModel::new("qwen"),
                LogicalModel::new("deepseek"),
                LogicalModel::new("kimi"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_up_to_the_cap() {
        let retry = RetryConfig::new(5, Duration::from_secs(1), Duration::from_secs(5));
        assert_eq!(retry.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(retry.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(retry.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(retry.delay_for_attempt(4), Duration::from_secs(5));
        assert_eq!(retry.delay_for_attempt(5), Duration::from_secs(5));
    }

    proptest::proptest! {
        /// Backoff is always within `[initial_delay, max_delay]` and never
        /// decreases as the attempt number grows, for any configuration.
        #[test]
        fn delay_is_bounded_and_nondecreasing(
            max_retries in 1u32..20,
            initial_ms in 1u64..5_000,
            max_ms in 5_000u64..120_000,
        ) {
            let retry = RetryConfig::new(max_retries, Duration::from_millis(initial_ms), Duration::from_millis(max_ms));
            let mut previous = Duration::ZERO;
            for attempt in 1..=max_retries {
                let delay = retry.delay_for_attempt(attempt);
                proptest::prop_assert!(delay >= Duration::from_millis(initial_ms));
                proptest::prop_assert!(delay <= Duration::from_millis(max_ms));
                proptest::prop_assert!(delay >= previous);
                previous = delay;
            }
        }
    }
}
