//! `LoadBalancer`: maps a logical model onto one of its candidate physical
//! models (§4.4).
//!
//! `weighted` is a deterministic smooth weighted round robin (each pick
//! raises every candidate's running weight by its configured weight, picks
//! the maximum, then subtracts the total — the same shape `nginx`/`envoy`
//! use for weighted round robin, chosen here because an adaptive limiter
//! in this style tracks a per-candidate running counter with
//! `AtomicUsize`/`AtomicU64` in exactly this style
//! (`tower_resilience_adaptive::algorithm`), generalized from one counter
//! to one per candidate). `round_robin` reuses that counter directly, unweighted.
//! `rate_aware` asks an injected [`RateLimiterRegistry`] for headroom.

use crate::metrics::ProviderMetrics;
use crate::policy::LoadBalancerPolicy;
use dashmap::DashMap;
use llm_resilience_core::{LogicalModel, PhysicalModel, Provider};
use llm_resilience_ratelimiter::RateLimiterRegistry;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Candidate {
    physical: PhysicalModel,
    weight: i64,
}

pub struct LoadBalancer {
    enabled: bool,
    policy: LoadBalancerPolicy,
    routes: DashMap<LogicalModel, Vec<Candidate>>,
    providers: DashMap<PhysicalModel, Provider>,
    provider_metrics: DashMap<Provider, Arc<ProviderMetrics>>,
    weighted_state: DashMap<LogicalModel, Mutex<Vec<i64>>>,
    round_robin_counters: DashMap<LogicalModel, AtomicUsize>,
    rate_limiters: Option<Arc<RateLimiterRegistry>>,
}

impl LoadBalancer {
    pub fn new(enabled: bool, policy: LoadBalancerPolicy, rate_limiters: Option<Arc<RateLimiterRegistry>>) -> Self {
        Self {
            enabled,
            policy,
            routes: DashMap::new(),
            providers: DashMap::new(),
            provider_metrics: DashMap::new(),
            weighted_state: DashMap::new(),
            round_robin_counters: DashMap::new(),
            rate_limiters,
        }
    }

    pub fn register_route(&self, logical: LogicalModel, physical: PhysicalModel, weight: i64, provider: Provider) {
        self.providers.insert(physical.clone(), provider);
        self.routes
            .entry(logical)
            .or_default()
            .push(Candidate { physical, weight: weight.max(1) });
    }

    /// Identity when load balancing is disabled (§4.4).
    pub fn map_model(&self, logical: &LogicalModel) -> PhysicalModel {
        if !self.enabled {
            return PhysicalModel::new(logical.as_str());
        }

        let Some(candidates) = self.routes.get(logical) else {
            return PhysicalModel::new(logical.as_str());
        };

        if candidates.is_empty() {
            return PhysicalModel::new(logical.as_str());
        }

        match self.policy {
            LoadBalancerPolicy::Weighted => self.pick_weighted(logical, &candidates),
            LoadBalancerPolicy::RoundRobin => self.pick_round_robin(logical, &candidates),
            LoadBalancerPolicy::RateAware => self.pick_rate_aware(logical, &candidates),
        }
    }

    pub fn get_provider(&self, physical: &PhysicalModel) -> Option<Provider> {
        self.providers.get(physical).map(|entry| entry.clone())
    }

    pub fn record_provider_metrics(&self, provider: &Provider, success: bool, duration: Duration) {
        self.provider_metrics
            .entry(provider.clone())
            .or_insert_with(|| Arc::new(ProviderMetrics::default()))
            .record(success, duration);
    }

    fn pick_weighted(&self, logical: &LogicalModel, candidates: &[Candidate]) -> PhysicalModel {
        let state_lock = self
            .weighted_state
            .entry(logical.clone())
            .or_insert_with(|| Mutex::new(vec![0; candidates.len()]));
        let mut running = state_lock.lock().unwrap();

        if running.len() != candidates.len() {
            *running = vec![0; candidates.len()];
        }

        let total_weight: i64 = candidates.iter().map(|c| c.weight).sum();
        for (i, c) in candidates.iter().enumerate() {
            running[i] += c.weight;
        }

        let (best_idx, _) = running
            .iter()
            .enumerate()
            .max_by_key(|(_, w)| **w)
            .expect("candidates non-empty checked by caller");

        running[best_idx] -= total_weight;

        candidates[best_idx].physical.clone()
    }

    fn pick_round_robin(&self, logical: &LogicalModel, candidates: &[Candidate]) -> PhysicalModel {
        let counter = self
            .round_robin_counters
            .entry(logical.clone())
            .or_insert_with(|| AtomicUsize::new(0));
        let idx = counter.fetch_add(1, Ordering::Relaxed) % candidates.len();
        candidates[idx].physical.clone()
    }

    fn pick_rate_aware(&self, logical: &LogicalModel, candidates: &[Candidate]) -> PhysicalModel {
        let Some(registry) = &self.rate_limiters else {
            return self.pick_weighted(logical, candidates);
        };

        let mut with_headroom = Vec::new();
        for c in candidates {
            let Some(provider) = self.get_provider(&c.physical) else {
                with_headroom.push(c.clone());
                continue;
            };
            match registry.resolve(logical, &c.physical, &provider) {
                None => with_headroom.push(c.clone()),
                Some(limiter) => {
                    if limiter.available_slots() > 0 && limiter.qpm_used() < limiter.qpm_limit() {
                        with_headroom.push(c.clone());
                    }
                }
            }
        }

        if with_headroom.is_empty() {
            // No headroom anywhere: fall back to the candidate whose QPM
            // window will reset soonest, approximated by the one with the
            // smallest weight (least loaded configuration) as a tiebreaker.
            return candidates
                .iter()
                .min_by_key(|c| c.weight)
                .expect("candidates non-empty checked by caller")
                .physical
                .clone();
        }

        self.pick_weighted(logical, &with_headroom)
    }
}
