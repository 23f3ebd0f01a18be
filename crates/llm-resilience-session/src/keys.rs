//! Key schema (§4.8, §6), carried over verbatim from the original
//! `services/redis_session_manager.py`'s `SESSION_PREFIX` /
//! `SESSION_SET_PREFIX` / `INVALIDATION_NOTIFICATION_PREFIX` constants.

use sha2::{Digest, Sha256};

pub fn session_key(user_id: &str) -> String {
    format!("session:user:{user_id}")
}

pub fn session_set_key(user_id: &str) -> String {
    format!("session:user:set:{user_id}")
}

pub fn invalidation_key(user_id: &str, token_hash: &str) -> String {
    format!("session_invalidated:{user_id}:{token_hash}")
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
