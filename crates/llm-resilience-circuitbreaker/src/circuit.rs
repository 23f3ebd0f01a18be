//! Single-model circuit breaker state machine.
//!
//! Directly modeled on
//! `tower_resilience_circuitbreaker::circuit::Circuit`: an `AtomicU8` shadow
//! of the state for lock-free reads, count-based sliding window, and the
//! same closed/open/half-open transition shape. Generalized from a
//! configurable window/threshold pair to a fixed "last 100 samples, 5
//! consecutive failures or 50% over >=20 samples" policy (§4.3).

use llm_resilience_core::ErrorKind;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const RING_CAPACITY: usize = 100;
const OPEN_THRESHOLD: usize = 5;
const FAILURE_RATE_THRESHOLD: f64 = 0.5;
const MIN_SAMPLES_FOR_RATE: usize = 20;
const COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    success: bool,
    duration: Duration,
}

/// Point-in-time view of one physical model's breaker (§4.3:
/// `get_metrics`).
#[derive(Debug, Clone)]
pub struct CircuitMetrics {
    pub state: CircuitState,
    pub samples: usize,
    pub success_rate: f64,
    pub p50: Duration,
    pub p95: Duration,
}

pub(crate) struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    consecutive_failures: usize,
    open_until: Option<Instant>,
    half_open_probe_inflight: bool,
    half_open_backoff_factor: u32,
    ring: VecDeque<Sample>,
}

impl Default for Circuit {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            state_atomic: Arc::new(AtomicU8::new(CircuitState::Closed as u8)),
            consecutive_failures: 0,
            open_until: None,
            half_open_probe_inflight: false,
            half_open_backoff_factor: 1,
            ring: VecDeque::with_capacity(RING_CAPACITY),
        }
    }
}

impl Circuit {
    /// Lock-free read of the current state, usable from a hot path that
    /// does not want to take the circuit's mutex.
    pub fn state_shadow(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(Ordering::Relaxed))
    }

    /// Non-mutating view of whether a call would currently be admitted,
    /// without consuming the one probe slot a half-open circuit grants.
    /// Used by read-only callers like [`PerformanceTracker::get_fastest_model`]
    /// that score candidates without actually dispatching to them — scoring
    /// must never itself spend the half-open probe.
    pub fn would_admit(&self) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => match self.open_until {
                Some(open_until) => Instant::now() >= open_until,
                None => true,
            },
            CircuitState::HalfOpen => !self.half_open_probe_inflight,
        }
    }

    pub fn can_call_model(&mut self) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let Some(open_until) = self.open_until else {
                    return true;
                };
                if Instant::now() >= open_until {
                    self.transition_to(CircuitState::HalfOpen);
                    self.half_open_probe_inflight = true;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if self.half_open_probe_inflight {
                    false
                } else {
                    self.half_open_probe_inflight = true;
                    true
                }
            }
        }
    }

    pub fn record_request(&mut self, duration: Duration, success: bool, _error: Option<ErrorKind>) {
        self.ring.push_back(Sample { success, duration });
        if self.ring.len() > RING_CAPACITY {
            self.ring.pop_front();
        }

        match self.state {
            CircuitState::HalfOpen => {
                self.half_open_probe_inflight = false;
                if success {
                    self.consecutive_failures = 0;
                    self.half_open_backoff_factor = 1;
                    self.transition_to(CircuitState::Closed);
                } else {
                    self.consecutive_failures += 1;
                    self.half_open_backoff_factor = (self.half_open_backoff_factor * 2).min(8);
                    self.open(self.half_open_backoff_factor);
                }
            }
            _ => {
                if success {
                    self.consecutive_failures = 0;
                } else {
                    self.consecutive_failures += 1;
                    if self.should_open() {
                        self.open(1);
                    }
                }
            }
        }
    }

    fn should_open(&self) -> bool {
        if self.consecutive_failures >= OPEN_THRESHOLD {
            return true;
        }

        if self.ring.len() >= MIN_SAMPLES_FOR_RATE {
            let failures = self.ring.iter().filter(|s| !s.success).count();
            let rate = failures as f64 / self.ring.len() as f64;
            if rate > FAILURE_RATE_THRESHOLD {
                return true;
            }
        }

        false
    }

    fn open(&mut self, backoff_factor: u32) {
        self.open_until = Some(Instant::now() + COOLDOWN * backoff_factor);
        self.transition_to(CircuitState::Open);
    }

    fn transition_to(&mut self, state: CircuitState) {
        if self.state == state {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(from = ?self.state, to = ?state, "circuit breaker state transition");

        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Relaxed);

        #[cfg(feature = "metrics")]
        metrics::gauge!("circuitbreaker_state").set(state as u8 as f64);
    }

    pub fn metrics(&self) -> CircuitMetrics {
        let samples = self.ring.len();
        let successes = self.ring.iter().filter(|s| s.success).count();
        let success_rate = if samples > 0 {
            successes as f64 / samples as f64
        } else {
            1.0
        };

        let mut durations: Vec<Duration> = self.ring.iter().map(|s| s.duration).collect();
        durations.sort();

        CircuitMetrics {
            state: self.state,
            samples,
            success_rate,
            p50: percentile(&durations, 0.50),
            p95: percentile(&durations, 0.95),
        }
    }
}

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
