//! Redis-backed [`CacheClient`].
//!
//! Grounded on `Admin12121-Paayo-Nepal`'s `CacheService` (wraps
//! `redis::aio::ConnectionManager`, clones the handle per call since it is
//! itself cheaply cloneable and multiplexes over one connection). The atomic
//! operations (`incr_and_check`, lock acquire/release) are expressed as
//! `redis::Script` so the increment, the TTL-on-create, and the
//! compare-and-delete each happen as a single round trip (§4.2: "MUST
//! be atomic... to be correct across workers").

use crate::client::{CacheClient, IncrAndCheck, Lock};
use crate::error::CacheError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// `INCR` the key; if it didn't exist before this call, set its TTL.
/// Returns the post-increment value.
const INCR_AND_CHECK_SCRIPT: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return current
"#;

/// Deletes a key only if its current value matches the caller's token
/// (so a lock can't be released by a holder who lost it to expiry and
/// whose slot was re-acquired by someone else).
const UNLOCK_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
else
    return 0
end
"#;

#[derive(Clone)]
pub struct RedisCacheClient {
    conn: ConnectionManager,
    /// Set false by the first failed round trip, true by the next success.
    /// `is_available` reads this instead of assuming the connection is up,
    /// since `ConnectionManager` reconnects silently in the background and
    /// gives no other synchronous signal (§4.1: "MUST track real connection
    /// health for fail-open decisions").
    healthy: Arc<AtomicBool>,
}

impl RedisCacheClient {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            healthy: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Connects to `redis_url` (e.g. `redis://127.0.0.1:6379`) and wraps the
    /// connection in a [`ConnectionManager`], which reconnects transparently
    /// on connection loss.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(Self::new(conn))
    }

    /// Records the outcome of a round trip against `healthy` and passes the
    /// result through unchanged.
    fn observe<T>(&self, result: Result<T, redis::RedisError>) -> Result<T, CacheError> {
        match result {
            Ok(value) => {
                self.healthy.store(true, Ordering::Relaxed);
                Ok(value)
            }
            Err(e) => {
                self.healthy.store(false, Ordering::Relaxed);
                Err(op_err(e))
            }
        }
    }
}

fn op_err(e: redis::RedisError) -> CacheError {
    CacheError::Operation(e.to_string())
}

#[async_trait]
impl CacheClient for RedisCacheClient {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        self.observe(conn.get(key).await)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        self.observe(conn.set::<_, _, ()>(key, value).await)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        self.observe(conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1)).await)
    }

    async fn del(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let removed: i64 = self.observe(conn.del(key).await)?;
        Ok(removed > 0)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        self.observe(conn.expire(key, ttl.as_secs().max(1) as i64).await)
    }

    async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();
        self.observe(conn.incr(key, 1).await)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        self.observe(conn.hset::<_, _, _, ()>(key, field, value).await)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, CacheError> {
        let mut conn = self.conn.clone();
        self.observe(conn.hgetall(key).await)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let added: i64 = self.observe(conn.sadd(key, member).await)?;
        Ok(added > 0)
    }

    async fn smembers(&self, key: &str) -> Result<HashSet<String>, CacheError> {
        let mut conn = self.conn.clone();
        self.observe(conn.smembers(key).await)
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        self.observe(conn.sismember(key, member).await)
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let removed: i64 = self.observe(conn.srem(key, member).await)?;
        Ok(removed > 0)
    }

    async fn incr_and_check(
        &self,
        key: &str,
        limit: i64,
        ttl: Duration,
    ) -> Result<IncrAndCheck, CacheError> {
        let mut conn = self.conn.clone();
        let script = redis::Script::new(INCR_AND_CHECK_SCRIPT);
        let value: i64 = self.observe(
            script
                .key(key)
                .arg(ttl.as_secs().max(1))
                .invoke_async(&mut conn)
                .await,
        )?;
        Ok(IncrAndCheck {
            value,
            within_limit: value <= limit,
        })
    }

    async fn try_lock(&self, key: &str, ttl: Duration) -> Result<Option<Lock>, CacheError> {
        let mut conn = self.conn.clone();
        let token = Uuid::new_v4().to_string();
        let acquired: Option<String> = self.observe(
            redis::cmd("SET")
                .arg(key)
                .arg(&token)
                .arg("NX")
                .arg("EX")
                .arg(ttl.as_secs().max(1))
                .query_async(&mut conn)
                .await,
        )?;

        if acquired.is_some() {
            Ok(Some(Lock {
                key: key.to_string(),
                token,
            }))
        } else {
            Ok(None)
        }
    }

    async fn unlock(&self, lock: &Lock) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let script = redis::Script::new(UNLOCK_SCRIPT);
        let _: i64 = self.observe(
            script
                .key(&lock.key)
                .arg(&lock.token)
                .invoke_async(&mut conn)
                .await,
        )?;
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }
}
