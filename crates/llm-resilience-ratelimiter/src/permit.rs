//! RAII permit returned by [`crate::limiter::RateLimiter::acquire`].
//!
//! Grounded on `tower_resilience_bulkhead::service::Bulkhead`'s
//! `OwnedSemaphorePermit` shape, generalized to additionally own a
//! cache-backed inflight-token membership so concurrency is visible
//! cross-worker (§4.2: "Orderings across workers are fair only at
//! per-acquisition granularity").

use llm_resilience_cache::CacheClient;
use std::sync::Arc;
use tokio::sync::OwnedSemaphorePermit;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Held for the duration of a single provider call. Dropping it releases
/// both the local semaphore slot and (best-effort, via a spawned task) the
/// cache-side inflight token.
pub struct Permit {
    _local: Option<OwnedSemaphorePermit>,
    keepalive: Option<JoinHandle<()>>,
    release: Option<ReleaseHandle>,
}

struct ReleaseHandle {
    cache: Arc<dyn CacheClient>,
    inflight_key: String,
    token_key: String,
    token: String,
}

impl Permit {
    /// A permit that enforces nothing, used when rate limiting is disabled
    /// for this key (§4.2: "When disabled... `acquire` returns
    /// immediately").
    pub fn noop() -> Self {
        Self {
            _local: None,
            keepalive: None,
            release: None,
        }
    }

    pub(crate) fn new(
        local: OwnedSemaphorePermit,
        cache: Arc<dyn CacheClient>,
        inflight_key: String,
        ttl: std::time::Duration,
    ) -> Self {
        let token = Uuid::new_v4().to_string();
        let token_key = format!("{inflight_key}:{token}");

        let keepalive = {
            let cache = Arc::clone(&cache);
            let inflight_key = inflight_key.clone();
            let token_key = token_key.clone();
            let token = token.clone();
            tokio::spawn(async move {
                let _ = cache.sadd(&inflight_key, &token).await;
                let refresh = ttl / 3;
                let mut interval = tokio::time::interval(refresh.max(std::time::Duration::from_millis(100)));
                loop {
                    interval.tick().await;
                    if cache.set_ex(&token_key, "1", ttl).await.is_err() {
                        break;
                    }
                }
            })
        };

        Self {
            _local: Some(local),
            keepalive: Some(keepalive),
            release: Some(ReleaseHandle {
                cache,
                inflight_key,
                token_key,
                token,
            }),
        }
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if let Some(handle) = self.keepalive.take() {
            handle.abort();
        }
        if let Some(release) = self.release.take() {
            tokio::spawn(async move {
                let _ = release.cache.del(&release.token_key).await;
                let _ = release.cache.srem(&release.inflight_key, &release.token).await;
            });
        }
    }
}
