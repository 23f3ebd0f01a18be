//! Multi-provider LLM orchestration and streaming resilience.
//!
//! Each concern lives in its own crate and is re-exported here behind a
//! matching feature, the way `tower-resilience` composes its pattern
//! crates:
//!
//! ```toml
//! [dependencies]
//! llm-resilience = { version = "0.1", features = ["orchestrator"] }
//! ```
//!
//! - **[cache]** — the shared `CacheClient` trait and in-memory/Redis
//!   implementations behind a read-through pattern.
//! - **[ratelimiter]** — per-provider QPM/concurrency enforcement.
//! - **[circuitbreaker]** — per-physical-model failure tracking.
//! - **[loadbalancer]** — logical-to-physical model routing.
//! - **[providers]** — the `ProviderClient` trait and HTTP/SSE adapter
//!   scaffolding.
//! - **[usage]** — buffered token usage tracking.
//! - **[session]** — single/multi-session JWT invalidation tracking.
//! - **[identity]** — generic read-through user/org caching.
//! - **[orchestrator]** — the public `chat`/`generate_*`/`health_check`
//!   facade wiring all of the above together.
//!
//! [cache]: mod@cache
//! [ratelimiter]: mod@ratelimiter
//! [circuitbreaker]: mod@circuitbreaker
//! [loadbalancer]: mod@loadbalancer
//! [providers]: mod@providers
//! [usage]: mod@usage
//! [session]: mod@session
//! [identity]: mod@identity
//! [orchestrator]: mod@orchestrator

mod config;

pub use llm_resilience_core as core;
pub use config::{AppConfig, ConfigError, ProviderLimits};

#[cfg(feature = "cache")]
pub use llm_resilience_cache as cache;

#[cfg(feature = "ratelimiter")]
pub use llm_resilience_ratelimiter as ratelimiter;

#[cfg(feature = "circuitbreaker")]
pub use llm_resilience_circuitbreaker as circuitbreaker;

#[cfg(feature = "loadbalancer")]
pub use llm_resilience_loadbalancer as loadbalancer;

#[cfg(feature = "providers")]
pub use llm_resilience_providers as providers;

#[cfg(feature = "usage")]
pub use llm_resilience_usage as usage;

#[cfg(feature = "session")]
pub use llm_resilience_session as session;

#[cfg(feature = "identity")]
pub use llm_resilience_identity as identity;

#[cfg(feature = "orchestrator")]
pub use llm_resilience_orchestrator as orchestrator;
