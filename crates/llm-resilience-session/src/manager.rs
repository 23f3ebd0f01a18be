//! Single/multi-session enforcement (§4.8), grounded directly on
//! `RedisSessionManager` in the original `services/redis_session_manager.py`:
//! same key schema, same fail-open-on-cache-outage semantics, same
//! invalidate-before-store ordering contract.

use crate::keys::{hash_token, invalidation_key, session_key, session_set_key};
use crate::notice::InvalidationNotice;
use llm_resilience_cache::{CacheClient, CacheError};
use std::sync::Arc;
use std::time::Duration;

pub struct SessionManager {
    cache: Arc<dyn CacheClient>,
    /// Session TTL, driven by `JWT_EXPIRY_HOURS` (§6).
    ttl: Duration,
}

impl SessionManager {
    pub fn new(cache: Arc<dyn CacheClient>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    pub async fn store_session(
        &self,
        user_id: &str,
        token: &str,
        allow_multiple: bool,
    ) -> Result<(), CacheError> {
        let token_hash = hash_token(token);

        if allow_multiple {
            let set_key = session_set_key(user_id);
            self.cache.sadd(&set_key, &token_hash).await?;
            self.cache.expire(&set_key, self.ttl).await?;
        } else {
            self.cache
                .set_ex(&session_key(user_id), &token_hash, self.ttl)
                .await?;
        }

        Ok(())
    }

    pub async fn delete_session(&self, user_id: &str, token: Option<&str>) -> Result<bool, CacheError> {
        let set_key = session_set_key(user_id);
        let members = self.cache.smembers(&set_key).await?;

        if !members.is_empty() {
            return match token {
                Some(token) => {
                    let hash = hash_token(token);
                    self.cache.srem(&set_key, &hash).await
                }
                None => self.cache.del(&set_key).await,
            };
        }

        self.cache.del(&session_key(user_id)).await
    }

    /// Fail-open when the cache is unavailable so authentication survives
    /// a cache outage (§4.8); fail-closed otherwise.
    pub async fn is_session_valid(&self, user_id: &str, token: &str) -> bool {
        if !self.cache.is_available() {
            return true;
        }

        let token_hash = hash_token(token);
        let set_key = session_set_key(user_id);

        let multi_mode_members = match self.cache.smembers(&set_key).await {
            Ok(members) => members,
            Err(_) => return true,
        };

        if !multi_mode_members.is_empty() {
            return match self.cache.sismember(&set_key, &token_hash).await {
                Ok(is_member) => is_member,
                Err(_) => true,
            };
        }

        match self.cache.get(&session_key(user_id)).await {
            Ok(Some(stored_hash)) => stored_hash == token_hash,
            Ok(None) => false,
            Err(_) => true,
        }
    }

    /// Invalidates every active session for `user_id`, leaving an
    /// [`InvalidationNotice`] behind for each one. Callers MUST complete
    /// this before returning a freshly issued token to the client (spec
    /// §4.8 ordering guarantee).
    pub async fn invalidate_user_sessions(
        &self,
        user_id: &str,
        ip_address: Option<String>,
        allow_multiple: bool,
    ) -> Result<(), CacheError> {
        if allow_multiple {
            return Ok(());
        }

        let set_key = session_set_key(user_id);
        let members = self.cache.smembers(&set_key).await?;

        if !members.is_empty() {
            for hash in &members {
                self.create_invalidation_notification(user_id, hash, ip_address.clone())
                    .await?;
            }
            self.cache.del(&set_key).await?;
            return Ok(());
        }

        if let Some(old_hash) = self.cache.get(&session_key(user_id)).await? {
            self.create_invalidation_notification(user_id, &old_hash, ip_address)
                .await?;
            self.cache.del(&session_key(user_id)).await?;
        }

        Ok(())
    }

    pub async fn create_invalidation_notification(
        &self,
        user_id: &str,
        old_token_hash: &str,
        ip_address: Option<String>,
    ) -> Result<(), CacheError> {
        let notice = InvalidationNotice::new(ip_address);
        let payload = serde_json::to_string(&notice).map_err(|e| CacheError::Codec(e.to_string()))?;
        self.cache
            .set_ex(&invalidation_key(user_id, old_token_hash), &payload, self.ttl)
            .await
    }

    /// A displaced session polling `/session-status` receives its notice
    /// at most once (§4.8).
    pub async fn check_invalidation_notification(
        &self,
        user_id: &str,
        token_hash: &str,
    ) -> Result<Option<InvalidationNotice>, CacheError> {
        let key = invalidation_key(user_id, token_hash);
        match self.cache.get(&key).await? {
            Some(payload) => {
                let notice = serde_json::from_str(&payload).map_err(|e| CacheError::Codec(e.to_string()))?;
                Ok(Some(notice))
            }
            None => Ok(None),
        }
    }

    pub async fn clear_invalidation_notification(&self, user_id: &str, token_hash: &str) -> Result<bool, CacheError> {
        self.cache.del(&invalidation_key(user_id, token_hash)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_resilience_cache::InMemoryCacheClient;

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(InMemoryCacheClient::new()), Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn single_session_store_and_validate_roundtrip() {
        let mgr = manager();
        mgr.store_session("42", "tok-a", false).await.unwrap();
        assert!(mgr.is_session_valid("42", "tok-a").await);
        assert!(!mgr.is_session_valid("42", "tok-b").await);
    }

    #[tokio::test]
    async fn new_login_invalidates_previous_session_and_leaves_notice() {
        let mgr = manager();
        mgr.store_session("42", "tok-a", false).await.unwrap();
        let old_hash = hash_token("tok-a");

        mgr.invalidate_user_sessions("42", Some("10.0.0.1".to_string()), false)
            .await
            .unwrap();
        mgr.store_session("42", "tok-b", false).await.unwrap();

        assert!(mgr.is_session_valid("42", "tok-b").await);
        assert!(!mgr.is_session_valid("42", "tok-a").await);

        let notice = mgr
            .check_invalidation_notification("42", &old_hash)
            .await
            .unwrap();
        assert!(notice.is_some());
        assert_eq!(notice.unwrap().ip_address, "10.0.0.1");
    }

    #[tokio::test]
    async fn notification_is_cleared_after_acknowledgement() {
        let mgr = manager();
        let old_hash = hash_token("tok-a");
        mgr.create_invalidation_notification("42", &old_hash, None)
            .await
            .unwrap();

        assert!(mgr.clear_invalidation_notification("42", &old_hash).await.unwrap());
        assert!(mgr
            .check_invalidation_notification("42", &old_hash)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn multi_session_mode_allows_several_concurrent_tokens() {
        let mgr = manager();
        mgr.store_session("shared", "tok-a", true).await.unwrap();
        mgr.store_session("shared", "tok-b", true).await.unwrap();

        assert!(mgr.is_session_valid("shared", "tok-a").await);
        assert!(mgr.is_session_valid("shared", "tok-b").await);
        assert!(!mgr.is_session_valid("shared", "tok-c").await);
    }

    #[tokio::test]
    async fn is_session_valid_fails_open_when_cache_unavailable() {
        struct UnavailableCache(InMemoryCacheClient);

        #[async_trait::async_trait]
        impl CacheClient for UnavailableCache {
            async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
                self.0.get(key).await
            }
            async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
                self.0.set(key, value).await
            }
            async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
                self.0.set_ex(key, value, ttl).await
            }
            async fn del(&self, key: &str) -> Result<bool, CacheError> {
                self.0.del(key).await
            }
            async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
                self.0.expire(key, ttl).await
            }
            async fn incr(&self, key: &str) -> Result<i64, CacheError> {
                self.0.incr(key).await
            }
            async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError> {
                self.0.hset(key, field, value).await
            }
            async fn hgetall(&self, key: &str) -> Result<std::collections::HashMap<String, String>, CacheError> {
                self.0.hgetall(key).await
            }
            async fn sadd(&self, key: &str, member: &str) -> Result<bool, CacheError> {
                self.0.sadd(key, member).await
            }
            async fn smembers(&self, key: &str) -> Result<std::collections::HashSet<String>, CacheError> {
                self.0.smembers(key).await
            }
            async fn sismember(&self, key: &str, member: &str) -> Result<bool, CacheError> {
                self.0.sismember(key, member).await
            }
            async fn srem(&self, key: &str, member: &str) -> Result<bool, CacheError> {
                self.0.srem(key, member).await
            }
            async fn incr_and_check(
                &self,
                key: &str,
                limit: i64,
                ttl: Duration,
            ) -> Result<llm_resilience_cache::IncrAndCheck, CacheError> {
                self.0.incr_and_check(key, limit, ttl).await
            }
            async fn try_lock(&self, key: &str, ttl: Duration) -> Result<Option<llm_resilience_cache::Lock>, CacheError> {
                self.0.try_lock(key, ttl).await
            }
            async fn unlock(&self, lock: &llm_resilience_cache::Lock) -> Result<(), CacheError> {
                self.0.unlock(lock).await
            }
            fn is_available(&self) -> bool {
                false
            }
        }

        let mgr = SessionManager::new(
            Arc::new(UnavailableCache(InMemoryCacheClient::new())),
            Duration::from_secs(3600),
        );
        assert!(mgr.is_session_valid("42", "any-token").await);
    }
}
