//! Provider-level telemetry feeding the `rate_aware` strategy (§4.4:
//! `record_provider_metrics`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct ProviderMetrics {
    calls: AtomicU64,
    failures: AtomicU64,
    total_latency_micros: AtomicU64,
}

impl ProviderMetrics {
    pub fn record(&self, success: bool, duration: Duration) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn success_rate(&self) -> f64 {
        let calls = self.calls.load(Ordering::Relaxed);
        if calls == 0 {
            return 1.0;
        }
        let failures = self.failures.load(Ordering::Relaxed);
        1.0 - (failures as f64 / calls as f64)
    }

    pub fn average_latency(&self) -> Duration {
        let calls = self.calls.load(Ordering::Relaxed);
        if calls == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(self.total_latency_micros.load(Ordering::Relaxed) / calls)
    }
}
