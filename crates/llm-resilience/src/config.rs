//! Environment-driven configuration (§6).
//!
//! The fixed-name settings (load balancing, session TTL, cache connection)
//! are loaded through the `config` crate's builder so a future config file
//! source can be layered in without touching call sites. The per-provider
//! rate-limit settings are keyed by a provider name the crate cannot know
//! ahead of time (`<PROVIDER>_QPM_LIMIT` etc.), so those are scanned
//! directly out of the process environment instead, the way
//! `Admin12121-Paayo-Nepal`'s `Settings::new` reads each variable by hand.

use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Source(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
struct RawAppSettings {
    #[serde(default = "default_load_balancing_enabled")]
    load_balancing_enabled: bool,
    #[serde(default = "default_load_balancing_strategy")]
    load_balancing_strategy: String,
    #[serde(default)]
    load_balancing_weights: String,
    #[serde(default = "default_true")]
    load_balancing_rate_limiting_enabled: bool,
    #[serde(default = "default_jwt_expiry_hours")]
    jwt_expiry_hours: u64,
    #[serde(default = "default_cache_host")]
    cache_host: String,
    #[serde(default = "default_cache_port")]
    cache_port: u16,
    #[serde(default)]
    cache_db: u8,
}

fn default_load_balancing_enabled() -> bool {
    true
}
fn default_true() -> bool {
    true
}
fn default_load_balancing_strategy() -> String {
    "weighted".to_string()
}
fn default_jwt_expiry_hours() -> u64 {
    24
}
fn default_cache_host() -> String {
    "localhost".to_string()
}
fn default_cache_port() -> u16 {
    6379
}

/// Per-provider QPM/concurrency limits (§6:
/// `<PROVIDER>_QPM_LIMIT`/`<PROVIDER>_CONCURRENT_LIMIT`/`<PROVIDER>_RATE_LIMITING_ENABLED`).
#[derive(Debug, Clone, Copy)]
pub struct ProviderLimits {
    pub qpm_limit: u32,
    pub concurrent_limit: u32,
    pub rate_limiting_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub load_balancing_enabled: bool,
    pub load_balancing_strategy: String,
    pub load_balancing_weights: HashMap<String, i64>,
    pub load_balancing_rate_limiting_enabled: bool,
    pub jwt_expiry_hours: u64,
    pub cache_host: String,
    pub cache_port: u16,
    pub cache_db: u8,
    pub provider_limits: HashMap<String, ProviderLimits>,
}

impl AppConfig {
    /// Loads configuration from `.env` (if present) and the process
    /// environment, with the defaults documented on each field above.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let raw: RawAppSettings = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()?;

        Ok(Self {
            load_balancing_enabled: raw.load_balancing_enabled,
            load_balancing_strategy: raw.load_balancing_strategy,
            load_balancing_weights: parse_weights(&raw.load_balancing_weights),
            load_balancing_rate_limiting_enabled: raw.load_balancing_rate_limiting_enabled,
            jwt_expiry_hours: raw.jwt_expiry_hours,
            cache_host: raw.cache_host,
            cache_port: raw.cache_port,
            cache_db: raw.cache_db,
            provider_limits: provider_limits_from_env(),
        })
    }
}

/// Parses `LOAD_BALANCING_WEIGHTS`, a comma-separated `provider:weight` list
/// (e.g. `dashscope:3,ark:1`). Malformed entries are skipped rather than
/// failing configuration load.
fn parse_weights(raw: &str) -> HashMap<String, i64> {
    raw.split(',')
        .filter_map(|entry| {
            let (provider, weight) = entry.split_once(':')?;
            let weight: i64 = weight.trim().parse().ok()?;
            Some((provider.trim().to_string(), weight))
        })
        .collect()
}

/// Scans the process environment for `<PROVIDER>_QPM_LIMIT` variables and
/// assembles the matching `<PROVIDER>_CONCURRENT_LIMIT`/
/// `<PROVIDER>_RATE_LIMITING_ENABLED` for each provider name found.
fn provider_limits_from_env() -> HashMap<String, ProviderLimits> {
    let mut limits = HashMap::new();
    for (key, value) in std::env::vars() {
        let Some(provider) = key.strip_suffix("_QPM_LIMIT") else { continue };
        let Ok(qpm_limit) = value.parse::<u32>() else { continue };
        let provider = provider.to_string();

        let concurrent_limit = std::env::var(format!("{provider}_CONCURRENT_LIMIT"))
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        let rate_limiting_enabled = std::env::var(format!("{provider}_RATE_LIMITING_ENABLED"))
            .ok()
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        limits.insert(
            provider.to_lowercase(),
            ProviderLimits { qpm_limit, concurrent_limit, rate_limiting_enabled },
        );
    }
    limits
}
