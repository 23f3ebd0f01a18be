//! The public façade (§4.6) wiring load balancer, circuit breaker,
//! rate limiter, and provider clients behind one dispatch envelope.

use crate::config::OrchestratorConfig;
use crate::context::{ContextProvider, NoopContextProvider};
use chrono::Utc;
use dashmap::DashMap;
use llm_resilience_circuitbreaker::PerformanceTracker;
use llm_resilience_core::{ErrorKind, LogicalModel, OrchestrationError, PhysicalModel, Provider};
use llm_resilience_loadbalancer::LoadBalancer;
use llm_resilience_providers::{ProviderClient, TokenUsage};
use llm_resilience_ratelimiter::{Permit, RateLimiterError, RateLimiterRegistry};
use llm_resilience_usage::{RawUsage, TokenUsageRecord, TokenUsageTracker};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cheap to clone: every field is an `Arc` (or, for `providers`, an `Arc`-
/// wrapped map), so fan-out methods can hand each spawned task its own
/// owned handle instead of threading lifetimes through `tokio::spawn`.
#[derive(Clone)]
pub struct LlmOrchestrator {
    pub(crate) load_balancer: Arc<LoadBalancer>,
    pub(crate) performance: Arc<PerformanceTracker>,
    pub(crate) rate_limiters: Arc<RateLimiterRegistry>,
    pub(crate) usage: Arc<TokenUsageTracker>,
    pub(crate) providers: Arc<DashMap<PhysicalModel, Arc<dyn ProviderClient>>>,
    pub(crate) context: Arc<dyn ContextProvider>,
    pub(crate) config: Arc<OrchestratorConfig>,
}

/// The collaborators a model call needed to be admitted (§4.6 steps
/// 1-4). Dropping it (after `finish` has recorded the outcome) releases the
/// rate-limiter permit.
pub(crate) struct Dispatch {
    pub physical: PhysicalModel,
    pub provider: Provider,
    pub client: Arc<dyn ProviderClient>,
    pub permit: Permit,
    pub start: Instant,
}

impl LlmOrchestrator {
    pub fn new(
        load_balancer: Arc<LoadBalancer>,
        performance: Arc<PerformanceTracker>,
        rate_limiters: Arc<RateLimiterRegistry>,
        usage: Arc<TokenUsageTracker>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            load_balancer,
            performance,
            rate_limiters,
            usage,
            providers: Arc::new(DashMap::new()),
            context: Arc::new(NoopContextProvider),
            config: Arc::new(config),
        }
    }

    pub fn with_context_provider(mut self, context: Arc<dyn ContextProvider>) -> Self {
        self.context = context;
        self
    }

    /// Registers a logical→physical route plus the adapter that serves it.
    /// Wires the load balancer's routing table and this orchestrator's
    /// provider map in one call so the two can never drift apart.
    pub fn register_model(
        &self,
        logical: LogicalModel,
        physical: PhysicalModel,
        provider: Provider,
        weight: i64,
        client: Arc<dyn ProviderClient>,
    ) {
        self.load_balancer
            .register_route(logical, physical.clone(), weight, provider);
        self.providers.insert(physical, client);
    }

    pub fn config(&self) -> &OrchestratorConfig {
        self.config.as_ref()
    }

    /// Cloned handles for collaborators that outlive a single dispatch, e.g.
    /// a streaming generator that records metrics after `begin_dispatch` has
    /// already returned.
    pub(crate) fn performance_handle(&self) -> Arc<PerformanceTracker> {
        Arc::clone(&self.performance)
    }

    pub(crate) fn load_balancer_handle(&self) -> Arc<LoadBalancer> {
        Arc::clone(&self.load_balancer)
    }

    pub(crate) fn usage_handle(&self) -> Arc<TokenUsageTracker> {
        Arc::clone(&self.usage)
    }

    pub(crate) fn physical_for(&self, logical: &LogicalModel, physical_hint: Option<PhysicalModel>) -> PhysicalModel {
        physical_hint.unwrap_or_else(|| self.load_balancer.map_model(logical))
    }

    pub(crate) fn client_for(&self, physical: &PhysicalModel) -> Option<Arc<dyn ProviderClient>> {
        self.providers.get(physical).map(|entry| Arc::clone(&entry))
    }

    /// Steps 1-4 of the dispatch envelope: map the model, consult the
    /// breaker, resolve and acquire the rate limiter.
    pub(crate) async fn begin_dispatch(
        &self,
        logical: &LogicalModel,
        physical_hint: Option<PhysicalModel>,
        cancel: &CancellationToken,
    ) -> Result<Dispatch, OrchestrationError> {
        let physical = self.physical_for(logical, physical_hint);

        // Checked before the breaker so an unregistered model never mutates
        // circuit state (§7 boundary behavior: "Model name not in registry
        // -> ModelNotFound, no metrics mutation").
        let client = self.client_for(&physical).ok_or_else(|| {
            OrchestrationError::new(ErrorKind::ModelNotFound, format!("no provider client registered for {physical}"))
        })?;

        if !self.performance.can_call_model(&physical) {
            return Err(OrchestrationError::circuit_open());
        }

        let provider = self
            .load_balancer
            .get_provider(&physical)
            .unwrap_or_else(|| Provider::new(physical.as_str()));

        let permit = match self.rate_limiters.resolve(logical, &physical, &provider) {
            Some(limiter) => limiter.acquire(cancel).await.map_err(map_rate_limiter_error)?,
            None => Permit::noop(),
        };

        Ok(Dispatch {
            physical,
            provider,
            client,
            permit,
            start: Instant::now(),
        })
    }

    /// Step 7: record performance/usage under the **physical** model, then
    /// let the permit drop (releasing the rate limiter slot).
    pub(crate) fn finish_dispatch(
        &self,
        dispatch: Dispatch,
        logical: &LogicalModel,
        user_id: Option<&str>,
        success: bool,
        usage: Option<TokenUsage>,
    ) {
        let duration = dispatch.start.elapsed();
        self.performance.record_request(&dispatch.physical, duration, success, None);
        self.load_balancer
            .record_provider_metrics(&dispatch.provider, success, duration);

        if let Some(usage) = usage {
            let raw = RawUsage {
                input_tokens: Some(usage.input_tokens),
                output_tokens: Some(usage.output_tokens),
                total_tokens: Some(usage.total_tokens),
                ..Default::default()
            };
            let record = TokenUsageRecord::new(
                user_id.map(str::to_string),
                logical,
                &dispatch.physical,
                &dispatch.provider,
                raw,
                Utc::now(),
            );
            self.usage.track_usage(record);
        }
        // `dispatch` drops here, releasing its permit.
    }

    /// Records a cancelled (not failed) outcome, so the breaker is never
    /// biased against a route that was merely beaten by a faster sibling
    /// (§4.6.2).
    pub(crate) fn record_cancelled(&self, dispatch: Dispatch) {
        let duration = dispatch.start.elapsed();
        self.performance
            .record_request(&dispatch.physical, duration, true, Some(ErrorKind::Cancelled));
    }
}

#[cfg(test)]
mod tests {
    use crate::config::OrchestratorConfig;
    use crate::test_support::orchestrator_with_clients;
    use llm_resilience_core::{ErrorKind, LogicalModel};
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn unregistered_model_is_model_not_found_and_leaves_circuit_untouched() {
        let orch = orchestrator_with_clients(vec![]);
        let cancel = CancellationToken::new();

        let result = orch.begin_dispatch(&LogicalModel::new("ghost"), None, &cancel).await;
        assert_eq!(result.err().unwrap().kind, ErrorKind::ModelNotFound);

        // The breaker must never have been consulted for this physical
        // model, so it reports the fresh-model default rather than any
        // state a stray `can_call_model` insert would have produced.
        let physical = llm_resilience_core::PhysicalModel::new("ghost");
        assert!(orch.performance.can_call_model(&physical));
        let metrics = orch.performance.get_metrics(&physical);
        assert_eq!(metrics.samples, 0);
    }

    #[test]
    fn default_fanout_has_three_complementary_models() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.default_fanout.len(), 3);
    }
}

pub(crate) fn map_rate_limiter_error(error: RateLimiterError) -> OrchestrationError {
    match error {
        RateLimiterError::Cancelled => OrchestrationError::cancelled(),
        RateLimiterError::Limited { retry_after_secs } => {
            OrchestrationError::new(ErrorKind::RateLimit, "qpm window exhausted")
                .with_retry_after(std::time::Duration::from_secs(retry_after_secs))
        }
        RateLimiterError::Cache(detail) => OrchestrationError::new(ErrorKind::Provider, detail),
    }
}
