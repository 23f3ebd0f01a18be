//! Buffered token usage tracker (§4.7).
//!
//! The buffer is protected by a single mutex; the flusher swaps the
//! buffer under lock then writes outside the lock, the same
//! store/background-eviction split a cache-store/background-flusher pair
//! typically uses for a mutex-guarded buffer serviced by a spawned task.

use crate::record::TokenUsageRecord;
use crate::sink::UsageSink;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_FLUSH_THRESHOLD: usize = 200;

pub struct TokenUsageTracker {
    buffer: Arc<Mutex<Vec<TokenUsageRecord>>>,
    sink: Arc<dyn UsageSink>,
    flush_threshold: usize,
    flusher: Option<JoinHandle<()>>,
}

impl TokenUsageTracker {
    pub fn new(sink: Arc<dyn UsageSink>) -> Self {
        Self::with_config(sink, DEFAULT_FLUSH_INTERVAL, DEFAULT_FLUSH_THRESHOLD)
    }

    pub fn with_config(sink: Arc<dyn UsageSink>, flush_interval: Duration, flush_threshold: usize) -> Self {
        let buffer: Arc<Mutex<Vec<TokenUsageRecord>>> = Arc::new(Mutex::new(Vec::new()));

        let flusher = {
            let buffer = Arc::clone(&buffer);
            let sink = Arc::clone(&sink);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(flush_interval);
                loop {
                    interval.tick().await;
                    flush_buffer(&buffer, sink.as_ref()).await;
                }
            })
        };

        Self {
            buffer,
            sink,
            flush_threshold,
            flusher: Some(flusher),
        }
    }

    /// Appends a usage record. Never fails the caller — a tracking failure
    /// (buffer poisoned, sink unreachable at flush time) is logged, not
    /// propagated (§4.7: "Tracking failure MUST never fail the user
    /// request").
    pub fn track_usage(&self, record: TokenUsageRecord) {
        let should_flush_now = {
            let mut buffer = match self.buffer.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            buffer.push(record);
            buffer.len() >= self.flush_threshold
        };

        if should_flush_now {
            let buffer = Arc::clone(&self.buffer);
            let sink = Arc::clone(&self.sink);
            tokio::spawn(async move {
                flush_buffer(&buffer, sink.as_ref()).await;
            });
        }
    }

    /// Drains the buffer synchronously. Called on shutdown so no buffered
    /// usage is lost.
    pub async fn flush(&self) {
        flush_buffer(&self.buffer, self.sink.as_ref()).await;
    }
}

impl Drop for TokenUsageTracker {
    fn drop(&mut self) {
        if let Some(handle) = self.flusher.take() {
            handle.abort();
        }
    }
}

async fn flush_buffer(buffer: &Mutex<Vec<TokenUsageRecord>>, sink: &dyn UsageSink) {
    let batch = {
        let mut guard = match buffer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::take(&mut *guard)
    };

    if batch.is_empty() {
        return;
    }

    if let Err(_err) = sink.write_batch(&batch).await {
        #[cfg(feature = "tracing")]
        tracing::warn!(batch_size = batch.len(), error = %_err, "failed to flush token usage batch");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawUsage;
    use crate::sink::InMemoryUsageSink;
    use llm_resilience_core::{LogicalModel, PhysicalModel, Provider};

    fn sample_record() -> TokenUsageRecord {
        TokenUsageRecord::new(
            Some("user-1".to_string()),
            &LogicalModel::new("qwen"),
            &PhysicalModel::new("qwen-max"),
            &Provider::new("dashscope"),
            RawUsage {
                prompt_tokens: Some(10),
                completion_tokens: Some(5),
                ..Default::default()
            },
            chrono::Utc::now(),
        )
    }

    #[tokio::test]
    async fn flush_drains_buffer_into_sink() {
        let sink = Arc::new(InMemoryUsageSink::new());
        let tracker = TokenUsageTracker::with_config(sink.clone(), Duration::from_secs(3600), 1_000_000);

        tracker.track_usage(sample_record());
        tracker.track_usage(sample_record());
        tracker.flush().await;

        assert_eq!(sink.written().len(), 2);
    }

    #[tokio::test]
    async fn flush_threshold_triggers_background_flush() {
        let sink = Arc::new(InMemoryUsageSink::new());
        let tracker = TokenUsageTracker::with_config(sink.clone(), Duration::from_secs(3600), 2);

        tracker.track_usage(sample_record());
        tracker.track_usage(sample_record());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sink.written().len(), 2);
    }
}
