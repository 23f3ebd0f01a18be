//! The [`CacheClient`] trait: the minimal Redis-like surface every higher
//! layer (rate limiter, circuit breaker, session manager, user/org cache,
//! token usage tracker) is built against (§4.1).

use crate::error::CacheError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// A held distributed lock. Released on `Drop` (best-effort) or explicitly
/// via [`CacheClient::unlock`].
pub struct Lock {
    pub key: String,
    pub token: String,
}

/// Typed operations over a remote key/value store (§4.1).
///
/// All operations fail fast with [`CacheError`]; callers decide the
/// fallback (fail-open vs fail-closed per component, §7). Implementors
/// MUST be safe for concurrent use from multiple tasks/workers.
#[async_trait]
pub trait CacheClient: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
    async fn del(&self, key: &str) -> Result<bool, CacheError>;
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;

    /// Atomically increments `key` by 1 and returns the new value. Creates
    /// the key at 1 if absent.
    async fn incr(&self, key: &str) -> Result<i64, CacheError>;

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError>;
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, CacheError>;

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, CacheError>;
    async fn smembers(&self, key: &str) -> Result<HashSet<String>, CacheError>;
    async fn sismember(&self, key: &str, member: &str) -> Result<bool, CacheError>;
    async fn srem(&self, key: &str, member: &str) -> Result<bool, CacheError>;

    /// Atomic increment-and-check: increments `key` (creating it with the
    /// given TTL if absent) and returns `true` iff the post-increment value
    /// is within `limit`. This is the single server-side script the rate
    /// limiter's QPM window needs (§4.2: "increment-and-check MUST be
    /// atomic... to be correct across workers").
    async fn incr_and_check(
        &self,
        key: &str,
        limit: i64,
        ttl: Duration,
    ) -> Result<IncrAndCheck, CacheError>;

    /// Attempts to acquire a distributed lock with the given TTL. Returns
    /// `None` if already held by someone else.
    async fn try_lock(&self, key: &str, ttl: Duration) -> Result<Option<Lock>, CacheError>;

    /// Releases a lock previously returned by [`CacheClient::try_lock`], only
    /// if the token still matches (so a lock cannot be released by a holder
    /// that lost it to expiry and someone else re-acquiring it).
    async fn unlock(&self, lock: &Lock) -> Result<(), CacheError>;

    /// Probe used by all higher layers to degrade gracefully (§4.1).
    fn is_available(&self) -> bool;
}

/// Result of an atomic increment-and-check (§4.2).
#[derive(Debug, Clone, Copy)]
pub struct IncrAndCheck {
    pub value: i64,
    pub within_limit: bool,
}
