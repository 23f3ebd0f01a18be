//! The authoritative store the flusher writes batches to. Left abstract so
//! this crate does not depend on a concrete SQL/analytics backend (spec
//! §1's framing of persistence as an external collaborator).

use crate::record::TokenUsageRecord;
use async_trait::async_trait;

#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn write_batch(&self, records: &[TokenUsageRecord]) -> Result<(), String>;
}

/// Test/dev sink that just accumulates records in memory.
#[derive(Default)]
pub struct InMemoryUsageSink {
    written: std::sync::Mutex<Vec<TokenUsageRecord>>,
}

impl InMemoryUsageSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> Vec<TokenUsageRecord> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl UsageSink for InMemoryUsageSink {
    async fn write_batch(&self, records: &[TokenUsageRecord]) -> Result<(), String> {
        self.written.lock().unwrap().extend_from_slice(records);
        Ok(())
    }
}
