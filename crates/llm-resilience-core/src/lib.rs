//! Core infrastructure shared by every crate in the LLM orchestration workspace.
//!
//! This crate provides:
//! - [`ErrorKind`] / [`OrchestrationError`]: the provider-agnostic error taxonomy
//!   every layer (cache, rate limiter, circuit breaker, provider client,
//!   orchestrator) converts into.
//! - [`events`]: a small observer system used for metrics/tracing hooks without
//!   coupling every pattern crate to a specific backend.
//! - [`model`]: the `LogicalModel` / `PhysicalModel` / `Provider` newtypes that
//!   keep routing identifiers from being confused with one another.

pub mod error;
pub mod events;
pub mod model;

pub use error::{ErrorKind, OrchestrationError};
pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
pub use model::{LogicalModel, PhysicalModel, Provider, RateLimiterKey};
