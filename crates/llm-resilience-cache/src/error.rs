//! Cache-layer errors.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("cache operation failed: {0}")]
    Operation(String),

    #[error("failed to serialize/deserialize cache payload: {0}")]
    Codec(String),

    #[error("distributed lock {key:?} already held")]
    LockContended { key: String },

    #[error("timed out after {0:?} waiting on cache")]
    Timeout(Duration),
}
