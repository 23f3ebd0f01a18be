//! Test doubles shared by this crate's unit tests. Not part of the public
//! API; kept out of `#[cfg(test)]` so multiple sibling test modules can
//! import it without each redefining its own fakes.
#![cfg(test)]

use crate::config::OrchestratorConfig;
use crate::orchestrator::LlmOrchestrator;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use llm_resilience_cache::InMemoryCacheClient;
use llm_resilience_circuitbreaker::PerformanceTracker;
use llm_resilience_loadbalancer::{LoadBalancer, LoadBalancerPolicy};
use llm_resilience_providers::{ChatCompletion, ChatRequest, ProviderClient, ProviderError, StreamChunk, StreamResult, TokenUsage};
use llm_resilience_ratelimiter::RateLimiterRegistry;
use llm_resilience_usage::{InMemoryUsageSink, TokenUsageTracker};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A provider client that answers after an optional delay, useful for
/// exercising `generate_race`'s "first success wins" behavior.
pub struct DelayedClient {
    delay: Duration,
    content: &'static str,
}

impl DelayedClient {
    pub fn immediate(content: &'static str) -> Arc<dyn ProviderClient> {
        Arc::new(Self { delay: Duration::ZERO, content })
    }

    pub fn after(delay: Duration, content: &'static str) -> Arc<dyn ProviderClient> {
        Arc::new(Self { delay, content })
    }
}

#[async_trait]
impl ProviderClient for DelayedClient {
    async fn chat_completion(&self, _request: ChatRequest) -> Result<ChatCompletion, ProviderError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(ChatCompletion {
            content: self.content.to_string(),
            usage: TokenUsage::default(),
        })
    }

    async fn stream_chat_completion(&self, _request: ChatRequest) -> Result<BoxStream<'static, StreamResult>, ProviderError> {
        let chunks = vec![Ok(StreamChunk::Token(self.content.to_string())), Ok(StreamChunk::Usage(TokenUsage::default()))];
        Ok(stream::iter(chunks).boxed())
    }
}

/// A provider client that always fails, used to exercise failure paths.
pub struct FailingClient;

#[async_trait]
impl ProviderClient for FailingClient {
    async fn chat_completion(&self, _request: ChatRequest) -> Result<ChatCompletion, ProviderError> {
        Err(ProviderError::new(llm_resilience_core::ErrorKind::Provider, "simulated failure"))
    }

    async fn stream_chat_completion(&self, _request: ChatRequest) -> Result<BoxStream<'static, StreamResult>, ProviderError> {
        Err(ProviderError::new(llm_resilience_core::ErrorKind::Provider, "simulated failure"))
    }
}

/// A provider client that fails its first `flaky_attempts` calls with a
/// retryable error, then succeeds. Used to exercise the orchestrator's
/// per-attempt retry loop.
pub struct FlakyClient {
    flaky_attempts: usize,
    attempts: AtomicUsize,
    content: &'static str,
}

impl FlakyClient {
    pub fn new(flaky_attempts: usize, content: &'static str) -> Arc<dyn ProviderClient> {
        Arc::new(Self { flaky_attempts, attempts: AtomicUsize::new(0), content })
    }
}

#[async_trait]
impl ProviderClient for FlakyClient {
    async fn chat_completion(&self, _request: ChatRequest) -> Result<ChatCompletion, ProviderError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.flaky_attempts {
            Err(ProviderError::new(llm_resilience_core::ErrorKind::Provider, "transient failure"))
        } else {
            Ok(ChatCompletion {
                content: self.content.to_string(),
                usage: TokenUsage::default(),
            })
        }
    }

    async fn stream_chat_completion(&self, _request: ChatRequest) -> Result<BoxStream<'static, StreamResult>, ProviderError> {
        Err(ProviderError::new(llm_resilience_core::ErrorKind::Provider, "not used"))
    }
}

/// Builds an [`LlmOrchestrator`] with load balancing disabled (so
/// `logical == physical` for every registered route) and one in-memory
/// backed collaborator per dependency, registering the given
/// `(logical, physical, client)` triples.
pub fn orchestrator_with_clients(
    models: Vec<(llm_resilience_core::LogicalModel, llm_resilience_core::PhysicalModel, Arc<dyn ProviderClient>)>,
) -> LlmOrchestrator {
    let cache: Arc<dyn llm_resilience_cache::CacheClient> = Arc::new(InMemoryCacheClient::new());
    let load_balancer = Arc::new(LoadBalancer::new(true, LoadBalancerPolicy::Weighted, None));
    let performance = Arc::new(PerformanceTracker::new());
    let rate_limiters = Arc::new(RateLimiterRegistry::new(Arc::clone(&cache)));
    let usage = Arc::new(TokenUsageTracker::new(Arc::new(InMemoryUsageSink::new())));

    let orchestrator = LlmOrchestrator::new(load_balancer, performance, rate_limiters, usage, OrchestratorConfig::default());
    for (logical, physical, client) in models {
        orchestrator.register_model(logical, physical, llm_resilience_core::Provider::new("test"), 1, client);
    }
    orchestrator
}

/// Like [`orchestrator_with_clients`] but with a caller-supplied
/// [`OrchestratorConfig`], for tests that need a fast retry backoff.
pub fn orchestrator_with_clients_and_config(
    models: Vec<(llm_resilience_core::LogicalModel, llm_resilience_core::PhysicalModel, Arc<dyn ProviderClient>)>,
    config: OrchestratorConfig,
) -> LlmOrchestrator {
    let cache: Arc<dyn llm_resilience_cache::CacheClient> = Arc::new(InMemoryCacheClient::new());
    let load_balancer = Arc::new(LoadBalancer::new(true, LoadBalancerPolicy::Weighted, None));
    let performance = Arc::new(PerformanceTracker::new());
    let rate_limiters = Arc::new(RateLimiterRegistry::new(Arc::clone(&cache)));
    let usage = Arc::new(TokenUsageTracker::new(Arc::new(InMemoryUsageSink::new())));

    let orchestrator = LlmOrchestrator::new(load_balancer, performance, rate_limiters, usage, config);
    for (logical, physical, client) in models {
        orchestrator.register_model(logical, physical, llm_resilience_core::Provider::new("test"), 1, client);
    }
    orchestrator
}
