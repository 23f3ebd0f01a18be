//! Load balancing strategies (§4.4).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBalancerPolicy {
    /// Deterministic smooth weighted round robin among integer weights.
    Weighted,
    /// Prefer candidates with rate-limiter headroom, weighted among ties.
    RateAware,
    /// Per-process counter modulo candidate count.
    RoundRobin,
}

impl LoadBalancerPolicy {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "weighted" => Some(Self::Weighted),
            "rate_aware" => Some(Self::RateAware),
            "round_robin" => Some(Self::RoundRobin),
            _ => None,
        }
    }
}
