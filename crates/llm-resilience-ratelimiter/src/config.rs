//! Per-key rate limiter configuration, read from the `<PROVIDER>_QPM_LIMIT` /
//! `<PROVIDER>_CONCURRENT_LIMIT` / `<PROVIDER>_RATE_LIMITING_ENABLED`
//! environment variables named in §6.

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub qpm_limit: i64,
    pub concurrent_limit: usize,
    pub enabled: bool,
}

impl RateLimiterConfig {
    pub fn new(qpm_limit: i64, concurrent_limit: usize, enabled: bool) -> Self {
        Self {
            qpm_limit,
            concurrent_limit,
            enabled,
        }
    }
}
