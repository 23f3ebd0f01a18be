//! In-memory [`CacheClient`] implementation.
//!
//! Same TTL-entry shape as a typical in-process cache store, generalized
//! from a single LRU value store to the full §4.1 operation set. Used for
//! local development and tests, and as a single-process fallback: a real
//! deployment should use [`crate::redis_client::RedisCacheClient`] instead.

use crate::client::{CacheClient, IncrAndCheck, Lock};
use crate::error::CacheError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.map(|at| Instant::now() >= at).unwrap_or(false)
    }
}

#[derive(Default)]
struct State {
    strings: HashMap<String, Entry>,
    hashes: HashMap<String, HashMap<String, String>>,
    sets: HashMap<String, HashSet<String>>,
    locks: HashMap<String, (String, Instant)>,
}

/// A process-local, `Mutex`-guarded stand-in for a Redis-like cache.
pub struct InMemoryCacheClient {
    state: Mutex<State>,
}

impl InMemoryCacheClient {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    fn expire_key(state: &mut State, key: &str) {
        if state.strings.get(key).map(Entry::is_expired).unwrap_or(false) {
            state.strings.remove(key);
        }
    }
}

impl Default for InMemoryCacheClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheClient for InMemoryCacheClient {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut state = self.state.lock().unwrap();
        Self::expire_key(&mut state, key);
        Ok(state.strings.get(key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut state = self.state.lock().unwrap();
        state.strings.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut state = self.state.lock().unwrap();
        state.strings.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, CacheError> {
        let mut state = self.state.lock().unwrap();
        let removed_string = state.strings.remove(key).is_some();
        let removed_set = state.sets.remove(key).is_some();
        let removed_hash = state.hashes.remove(key).is_some();
        Ok(removed_string || removed_set || removed_hash)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut state = self.state.lock().unwrap();
        Self::expire_key(&mut state, key);
        if let Some(entry) = state.strings.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
            return Ok(true);
        }
        Ok(false)
    }

    async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        let mut state = self.state.lock().unwrap();
        Self::expire_key(&mut state, key);
        let entry = state.strings.entry(key.to_string()).or_insert(Entry {
            value: "0".to_string(),
            expires_at: None,
        });
        let current: i64 = entry.value.parse().unwrap_or(0);
        let next = current + 1;
        entry.value = next.to_string();
        Ok(next)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError> {
        let mut state = self.state.lock().unwrap();
        state
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, CacheError> {
        let state = self.state.lock().unwrap();
        Ok(state.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let mut state = self.state.lock().unwrap();
        Ok(state
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    async fn smembers(&self, key: &str) -> Result<HashSet<String>, CacheError> {
        let state = self.state.lock().unwrap();
        Ok(state.sets.get(key).cloned().unwrap_or_default())
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .sets
            .get(key)
            .map(|set| set.contains(member))
            .unwrap_or(false))
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let mut state = self.state.lock().unwrap();
        Ok(state
            .sets
            .get_mut(key)
            .map(|set| set.remove(member))
            .unwrap_or(false))
    }

    async fn incr_and_check(
        &self,
        key: &str,
        limit: i64,
        ttl: Duration,
    ) -> Result<IncrAndCheck, CacheError> {
        let mut state = self.state.lock().unwrap();
        Self::expire_key(&mut state, key);
        let is_new = !state.strings.contains_key(key);
        let entry = state.strings.entry(key.to_string()).or_insert(Entry {
            value: "0".to_string(),
            expires_at: None,
        });
        let current: i64 = entry.value.parse().unwrap_or(0);
        let next = current + 1;
        entry.value = next.to_string();
        if is_new {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(IncrAndCheck {
            value: next,
            within_limit: next <= limit,
        })
    }

    async fn try_lock(&self, key: &str, ttl: Duration) -> Result<Option<Lock>, CacheError> {
        let mut state = self.state.lock().unwrap();
        let now = Instant::now();
        if let Some((_, expires_at)) = state.locks.get(key) {
            if *expires_at > now {
                return Ok(None);
            }
        }
        let token = Uuid::new_v4().to_string();
        state
            .locks
            .insert(key.to_string(), (token.clone(), now + ttl));
        Ok(Some(Lock {
            key: key.to_string(),
            token,
        }))
    }

    async fn unlock(&self, lock: &Lock) -> Result<(), CacheError> {
        let mut state = self.state.lock().unwrap();
        if let Some((token, _)) = state.locks.get(&lock.key) {
            if token == &lock.token {
                state.locks.remove(&lock.key);
            }
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_and_get_roundtrip() {
        let client = InMemoryCacheClient::new();
        client.set("k", "v").await.unwrap();
        assert_eq!(client.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn set_ex_expires() {
        let client = InMemoryCacheClient::new();
        client.set_ex("k", "v", Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(client.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn incr_and_check_enforces_limit() {
        let client = InMemoryCacheClient::new();
        for _ in 0..3 {
            let result = client
                .incr_and_check("qpm:1", 3, Duration::from_secs(70))
                .await
                .unwrap();
            assert!(result.within_limit);
        }
        let result = client
            .incr_and_check("qpm:1", 3, Duration::from_secs(70))
            .await
            .unwrap();
        assert!(!result.within_limit);
        assert_eq!(result.value, 4);
    }

    #[tokio::test]
    async fn set_operations() {
        let client = InMemoryCacheClient::new();
        assert!(client.sadd("s", "a").await.unwrap());
        assert!(!client.sadd("s", "a").await.unwrap());
        assert!(client.sismember("s", "a").await.unwrap());
        assert!(client.srem("s", "a").await.unwrap());
        assert!(!client.sismember("s", "a").await.unwrap());
    }

    #[tokio::test]
    async fn lock_is_exclusive_until_released() {
        let client = InMemoryCacheClient::new();
        let lock = client.try_lock("resource", Duration::from_secs(5)).await.unwrap();
        assert!(lock.is_some());
        assert!(client
            .try_lock("resource", Duration::from_secs(5))
            .await
            .unwrap()
            .is_none());
        client.unlock(&lock.unwrap()).await.unwrap();
        assert!(client
            .try_lock("resource", Duration::from_secs(5))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn is_available_always_true() {
        let client = InMemoryCacheClient::new();
        assert!(client.is_available());
    }
}
