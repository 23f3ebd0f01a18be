//! Buffered token usage tracking (§4.7).

pub mod record;
pub mod sink;
pub mod tracker;

pub use record::{RawUsage, TokenUsageRecord};
pub use sink::{InMemoryUsageSink, UsageSink};
pub use tracker::TokenUsageTracker;
