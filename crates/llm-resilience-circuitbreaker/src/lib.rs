//! Per-physical-model circuit breaker and rolling performance tracker
//! (§4.3).

pub mod circuit;
pub mod tracker;

pub use circuit::{CircuitMetrics, CircuitState};
pub use tracker::PerformanceTracker;
