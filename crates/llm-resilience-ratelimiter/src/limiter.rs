//! Per-[`RateLimiterKey`] concurrency + QPM enforcement (§4.2).
//!
//! The concurrency bound is dual-enforced: a process-local
//! `tokio::sync::Semaphore` (grounded on
//! `tower_resilience_bulkhead::service::Bulkhead`) so a single worker never
//! oversubscribes even if the cache round-trip stalls, and a cache-backed
//! inflight token set so other workers can see this worker's load. QPM is
//! enforced purely through the cache's atomic `incr_and_check` so it is
//! correct across every worker sharing the key.

use crate::error::RateLimiterError;
use crate::permit::Permit;
use chrono::Utc;
use llm_resilience_cache::CacheClient;
use llm_resilience_core::RateLimiterKey;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// TTL on the per-minute QPM counter key (§6: "TTL = 70s").
const QPM_COUNTER_TTL: Duration = Duration::from_secs(70);

/// TTL margin added to the request timeout for inflight tokens (§6:
/// "per-member TTL ≥ request timeout + margin").
const INFLIGHT_TTL: Duration = Duration::from_secs(90);

pub struct RateLimiter {
    key: RateLimiterKey,
    qpm_limit: i64,
    enabled: bool,
    cache: Arc<dyn CacheClient>,
    local_semaphore: Arc<Semaphore>,
    /// Cached snapshot of the last observed QPM usage, used by the load
    /// balancer's `rate_aware` strategy without a cache round trip on the
    /// hot path.
    last_qpm_observed: AtomicI64,
}

impl RateLimiter {
    pub fn new(
        key: RateLimiterKey,
        qpm_limit: i64,
        concurrent_limit: usize,
        enabled: bool,
        cache: Arc<dyn CacheClient>,
    ) -> Self {
        Self {
            key,
            qpm_limit,
            enabled,
            cache,
            local_semaphore: Arc::new(Semaphore::new(concurrent_limit.max(1))),
            last_qpm_observed: AtomicI64::new(0),
        }
    }

    fn qpm_key(&self) -> String {
        let minute = Utc::now().format("%Y%m%d%H%M");
        format!("{}:qpm:{}", self.key.cache_prefix(), minute)
    }

    fn inflight_key(&self) -> String {
        format!("{}:inflight", self.key.cache_prefix())
    }

    /// Blocks until both the QPM window and the concurrency semaphore admit
    /// this caller, or returns [`RateLimiterError::Cancelled`] if `cancel`
    /// resolves first.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<Permit, RateLimiterError> {
        if !self.enabled {
            return Ok(Permit::noop());
        }

        loop {
            if cancel.is_cancelled() {
                return Err(RateLimiterError::Cancelled);
            }

            let qpm_key = self.qpm_key();
            match self
                .cache
                .incr_and_check(&qpm_key, self.qpm_limit, QPM_COUNTER_TTL)
                .await
            {
                Ok(check) => {
                    self.last_qpm_observed.store(check.value, Ordering::Relaxed);
                    if check.within_limit {
                        break;
                    }
                    #[cfg(feature = "tracing")]
                    tracing::debug!(key = %self.key, value = check.value, limit = self.qpm_limit, "qpm window exhausted, waiting for next minute");
                }
                Err(e) => {
                    // Cache outage must not turn into a hard failure for every
                    // in-flight request (§7: "bypass QPM enforcement... and
                    // log a warning" rather than fail the call).
                    #[cfg(feature = "tracing")]
                    tracing::warn!(key = %self.key, error = %e, "qpm cache unavailable, bypassing rate limit for this acquisition");
                    #[cfg(not(feature = "tracing"))]
                    let _ = &e;
                    break;
                }
            }

            let wait = seconds_until_next_minute();
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancel.cancelled() => return Err(RateLimiterError::Cancelled),
            }
        }

        let local = Arc::clone(&self.local_semaphore)
            .acquire_owned()
            .await
            .map_err(|_| RateLimiterError::Cancelled)?;

        Ok(Permit::new(local, Arc::clone(&self.cache), self.inflight_key(), INFLIGHT_TTL))
    }

    /// Local semaphore slots currently free — used by the load balancer's
    /// `rate_aware` strategy as a cheap, in-process headroom signal.
    pub fn available_slots(&self) -> usize {
        self.local_semaphore.available_permits()
    }

    /// Last observed post-increment QPM counter value.
    pub fn qpm_used(&self) -> i64 {
        self.last_qpm_observed.load(Ordering::Relaxed)
    }

    pub fn qpm_limit(&self) -> i64 {
        self.qpm_limit
    }

    pub fn key(&self) -> &RateLimiterKey {
        &self.key
    }
}

fn seconds_until_next_minute() -> Duration {
    let now = Utc::now();
    let secs_into_minute = now.timestamp() % 60;
    Duration::from_secs((60 - secs_into_minute).max(1) as u64)
}
