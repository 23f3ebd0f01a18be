//! Per-process registry of one [`Circuit`] per physical model (§4.3).

use crate::circuit::{Circuit, CircuitMetrics};
use dashmap::DashMap;
use llm_resilience_core::{ErrorKind, PhysicalModel};
use std::sync::Mutex;
use std::time::Duration;

/// Breaker keys exclusively by [`PhysicalModel`] — never the logical name —
/// so a failing physical route cannot suppress a healthy sibling chosen by
/// the load balancer (§4.3 critical invariant, enforced here by the
/// type signature rather than convention).
#[derive(Default)]
pub struct PerformanceTracker {
    circuits: DashMap<PhysicalModel, Mutex<Circuit>>,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_call_model(&self, physical: &PhysicalModel) -> bool {
        let entry = self
            .circuits
            .entry(physical.clone())
            .or_insert_with(|| Mutex::new(Circuit::default()));
        entry.lock().unwrap().can_call_model()
    }

    pub fn record_request(
        &self,
        physical: &PhysicalModel,
        duration: Duration,
        success: bool,
        error: Option<ErrorKind>,
    ) {
        let entry = self
            .circuits
            .entry(physical.clone())
            .or_insert_with(|| Mutex::new(Circuit::default()));
        entry.lock().unwrap().record_request(duration, success, error);
    }

    pub fn get_metrics(&self, physical: &PhysicalModel) -> CircuitMetrics {
        let entry = self
            .circuits
            .entry(physical.clone())
            .or_insert_with(|| Mutex::new(Circuit::default()));
        entry.lock().unwrap().metrics()
    }

    /// Picks the candidate with the lowest `p50` among those the breaker
    /// currently admits; if none are admissible, falls back to the lowest
    /// `p50` overall so the caller always gets a candidate to try (spec
    /// §4.3: `get_fastest_model`). This is a read API: scoring peeks at
    /// admissibility via [`Circuit::would_admit`] rather than
    /// `can_call_model`, so merely scoring candidates never consumes a
    /// half-open circuit's one probe slot.
    pub fn get_fastest_model(&self, candidates: &[PhysicalModel]) -> Option<PhysicalModel> {
        if candidates.is_empty() {
            return None;
        }

        let mut scored: Vec<(PhysicalModel, CircuitMetrics, bool)> = candidates
            .iter()
            .map(|model| {
                let metrics = self.get_metrics(model);
                let admissible = self
                    .circuits
                    .entry(model.clone())
                    .or_insert_with(|| Mutex::new(Circuit::default()))
                    .lock()
                    .unwrap()
                    .would_admit();
                (model.clone(), metrics, admissible)
            })
            .collect();

        scored.sort_by(|a, b| a.1.p50.cmp(&b.1.p50));

        scored
            .iter()
            .find(|(_, _, admissible)| *admissible)
            .or_else(|| scored.first())
            .map(|(model, _, _)| model.clone())
    }
}
