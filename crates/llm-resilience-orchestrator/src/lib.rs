//! Public façade wiring the load balancer, circuit breaker, rate limiter,
//! and provider adapters behind one orchestration API (§4.6):
//! `chat`, `chat_with_usage`, `chat_stream`, `generate_multi`,
//! `generate_progressive`, `stream_progressive`, `generate_race`, and
//! `health_check`.

mod args;
mod chat;
mod config;
mod context;
mod fanout;
mod health;
mod orchestrator;
mod progressive;
mod result;
#[cfg(test)]
mod test_support;

pub use args::ChatArgs;
pub use chat::ChatStreamChunk;
pub use config::{OrchestratorConfig, RetryConfig};
pub use context::{inject_context, ContextProvider, NoopContextProvider};
pub use health::HealthStatus;
pub use orchestrator::LlmOrchestrator;
pub use result::{ModelCallOutcome, StreamEvent};
