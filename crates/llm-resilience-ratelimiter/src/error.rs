use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum RateLimiterError {
    #[error("rate limited: retry after {retry_after_secs}s")]
    Limited { retry_after_secs: u64 },

    #[error("cancelled while waiting for a permit")]
    Cancelled,

    #[error("cache backend error: {0}")]
    Cache(String),
}

impl From<llm_resilience_cache::CacheError> for RateLimiterError {
    fn from(e: llm_resilience_cache::CacheError) -> Self {
        RateLimiterError::Cache(e.to_string())
    }
}
