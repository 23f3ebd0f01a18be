//! Owns one [`RateLimiter`] per [`RateLimiterKey`] and implements the
//! dispatch rule of §4.2 that decides which limiter (if any) a given
//! `(logical_model, physical_model, provider)` triple goes through.

use crate::config::RateLimiterConfig;
use crate::limiter::RateLimiter;
use dashmap::DashMap;
use llm_resilience_cache::CacheClient;
use llm_resilience_core::{LogicalModel, PhysicalModel, Provider, RateLimiterKey};
use std::sync::Arc;

pub struct RateLimiterRegistry {
    cache: Arc<dyn CacheClient>,
    limiters: DashMap<RateLimiterKey, Arc<RateLimiter>>,
}

impl RateLimiterRegistry {
    pub fn new(cache: Arc<dyn CacheClient>) -> Self {
        Self {
            cache,
            limiters: DashMap::new(),
        }
    }

    /// Registers (or replaces) the limiter for `key`, built from `config`.
    pub fn configure(&self, key: RateLimiterKey, config: RateLimiterConfig) {
        let limiter = Arc::new(RateLimiter::new(
            key.clone(),
            config.qpm_limit,
            config.concurrent_limit,
            config.enabled,
            Arc::clone(&self.cache),
        ));
        self.limiters.insert(key, limiter);
    }

    pub fn get(&self, key: &RateLimiterKey) -> Option<Arc<RateLimiter>> {
        self.limiters.get(key).map(|entry| Arc::clone(&entry))
    }

    /// The limiter, if any, that governs a call dispatched as
    /// `(logical, physical, provider)` — implements §4.2's routing
    /// table verbatim, grounded on `_get_rate_limiter` in the original
    /// `services/llm/llm_service.py`.
    pub fn resolve(
        &self,
        logical: &LogicalModel,
        physical: &PhysicalModel,
        provider: &Provider,
    ) -> Option<Arc<RateLimiter>> {
        let key = Self::resolve_key(logical, physical, provider)?;
        self.get(&key)
    }

    fn resolve_key(
        logical: &LogicalModel,
        physical: &PhysicalModel,
        provider: &Provider,
    ) -> Option<RateLimiterKey> {
        if logical.as_str() == "deepseek" && physical.as_str().starts_with("ark-") {
            return Some(RateLimiterKey::new(
                Provider::new("volcengine"),
                Some("load-balancer".to_string()),
            ));
        }

        if logical.as_str() == "deepseek" && physical.as_str() == "deepseek" {
            return Some(RateLimiterKey::new(Provider::new("dashscope"), None));
        }

        if matches!(logical.as_str(), "kimi" | "doubao") {
            return Some(RateLimiterKey::new(
                Provider::new("volcengine"),
                Some(logical.as_str().to_string()),
            ));
        }

        if provider.as_str() == "dashscope" {
            return Some(RateLimiterKey::new(Provider::new("dashscope"), None));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_resilience_cache::InMemoryCacheClient;

    fn registry() -> RateLimiterRegistry {
        RateLimiterRegistry::new(Arc::new(InMemoryCacheClient::new()))
    }

    #[test]
    fn deepseek_on_ark_routes_to_volcengine_load_balancer_limiter() {
        let key = RateLimiterRegistry::resolve_key(
            &LogicalModel::new("deepseek"),
            &PhysicalModel::new("ark-deepseek-v3"),
            &Provider::new("volcengine"),
        )
        .unwrap();
        assert_eq!(key.provider, Provider::new("volcengine"));
        assert_eq!(key.endpoint.as_deref(), Some("load-balancer"));
    }

    #[test]
    fn deepseek_on_deepseek_routes_to_shared_dashscope_limiter() {
        let key = RateLimiterRegistry::resolve_key(
            &LogicalModel::new("deepseek"),
            &PhysicalModel::new("deepseek"),
            &Provider::new("dashscope"),
        )
        .unwrap();
        assert_eq!(key.provider, Provider::new("dashscope"));
        assert_eq!(key.endpoint, None);
    }

    #[test]
    fn kimi_and_doubao_get_dedicated_endpoint_limiters() {
        let kimi = RateLimiterRegistry::resolve_key(
            &LogicalModel::new("kimi"),
            &PhysicalModel::new("kimi-k1.5"),
            &Provider::new("volcengine"),
        )
        .unwrap();
        assert_eq!(kimi.endpoint.as_deref(), Some("kimi"));

        let doubao = RateLimiterRegistry::resolve_key(
            &LogicalModel::new("doubao"),
            &PhysicalModel::new("doubao-pro"),
            &Provider::new("volcengine"),
        )
        .unwrap();
        assert_eq!(doubao.endpoint.as_deref(), Some("doubao"));
    }

    #[test]
    fn unmatched_combination_has_no_limiter() {
        let result = RateLimiterRegistry::resolve_key(
            &LogicalModel::new("qwen"),
            &PhysicalModel::new("qwen-max"),
            &Provider::new("custom-provider"),
        );
        assert!(result.is_none());
    }

    #[test]
    fn registry_round_trips_configure_and_resolve() {
        let registry = registry();
        let key = RateLimiterKey::new(Provider::new("dashscope"), None);
        registry.configure(key.clone(), RateLimiterConfig::new(1000, 5, true));

        let resolved = registry.resolve(
            &LogicalModel::new("qwen"),
            &PhysicalModel::new("qwen-max"),
            &Provider::new("dashscope"),
        );
        assert!(resolved.is_some());
    }
}
