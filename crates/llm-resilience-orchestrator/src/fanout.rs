//! `generate_multi`, `generate_progressive`, `generate_race` (§4.6).
//!
//! All three spawn one task per requested model and pair each task with its
//! model identity explicitly, rather than recovering it from task state after
//! the fact (§7: the Python original occasionally confused "which model
//! completed" in `generate_progressive` by inspecting task state after
//! `as_completed`).

use crate::args::ChatArgs;
use crate::orchestrator::{Dispatch, LlmOrchestrator};
use crate::result::ModelCallOutcome;
use futures::stream::{BoxStream, StreamExt};
use llm_resilience_core::{ErrorKind, LogicalModel, OrchestrationError};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

impl LlmOrchestrator {
    /// Falls back to the configured default fan-out set (§4.6.1: "the
    /// default set for node-palette-style fan-out is three models chosen
    /// for complementary throughput; callers MAY override") when the caller
    /// passes no models.
    fn resolve_fanout_models(&self, models: Vec<LogicalModel>) -> Vec<LogicalModel> {
        if models.is_empty() {
            self.config().default_fanout.clone()
        } else {
            models
        }
    }

    /// Spawns one call per model, awaits all, and never lets a single
    /// model's failure fail the whole call (§4.6, invariant 8).
    pub async fn generate_multi(&self, prompt: impl Into<String>, models: Vec<LogicalModel>) -> Vec<ModelCallOutcome> {
        let models = self.resolve_fanout_models(models);
        let prompt = prompt.into();
        let mut handles = Vec::with_capacity(models.len());
        for model in models {
            let args = ChatArgs::new(model.clone(), prompt.clone());
            let this = self.clone();
            handles.push(tokio::spawn(async move { this.call_single_model_with_timing(model, args).await }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(outcome) = handle.await {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    /// Yields one [`ModelCallOutcome`] per model as each completes, in
    /// completion order (§4.6).
    pub fn generate_progressive(
        &self,
        prompt: impl Into<String>,
        models: Vec<LogicalModel>,
    ) -> BoxStream<'static, ModelCallOutcome> {
        let models = self.resolve_fanout_models(models);
        let prompt = prompt.into();
        let (tx, rx) = mpsc::unbounded_channel();

        for model in models {
            let args = ChatArgs::new(model.clone(), prompt.clone());
            let this = self.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = this.call_single_model_with_timing(model, args).await;
                let _ = tx.send(outcome);
            });
        }
        drop(tx);

        UnboundedReceiverStream::new(rx).boxed()
    }

    /// Races concurrent calls to every model; returns the first success and
    /// cancels the rest. Each task hands its in-flight [`Dispatch`] to this
    /// loop through a shared slot; the winner's siblings that are still
    /// running get their dispatch recorded as `Cancelled` (not a failure)
    /// before their task is aborted, releasing their rate-limiter permit in
    /// the process (§4.6.2).
    pub async fn generate_race(&self, prompt: impl Into<String>, models: Vec<LogicalModel>) -> Result<String, OrchestrationError> {
        let models = self.resolve_fanout_models(models);
        let prompt = prompt.into();
        let (tx, mut rx) = mpsc::channel(models.len().max(1));
        let mut handles = Vec::with_capacity(models.len());
        let mut slots: Vec<Arc<Mutex<Option<Dispatch>>>> = Vec::with_capacity(models.len());

        for model in models {
            let args = ChatArgs::new(model, prompt.clone());
            let this = self.clone();
            let tx = tx.clone();
            let slot: Arc<Mutex<Option<Dispatch>>> = Arc::new(Mutex::new(None));
            let slot_for_task = Arc::clone(&slot);
            handles.push(tokio::spawn(async move {
                let result = this.chat_tracked(args, slot_for_task).await;
                let _ = tx.send(result).await;
            }));
            slots.push(slot);
        }
        drop(tx);

        let mut last_error: Option<OrchestrationError> = None;
        let mut remaining = handles.len();
        while remaining > 0 {
            match rx.recv().await {
                Some(Ok(content)) => {
                    for (handle, slot) in handles.iter().zip(slots.iter()) {
                        if let Some(dispatch) = slot.lock().unwrap().take() {
                            self.record_cancelled(dispatch);
                        }
                        handle.abort();
                    }
                    return Ok(content);
                }
                Some(Err(e)) => {
                    last_error = Some(e);
                    remaining -= 1;
                }
                None => break,
            }
        }

        Err(last_error.unwrap_or_else(|| OrchestrationError::new(ErrorKind::Provider, "all race participants failed")))
    }

    /// Wraps [`LlmOrchestrator::chat`] with timing and converts any error
    /// into a [`ModelCallOutcome::failure`], so a failing model never
    /// propagates out of `generate_multi`/`generate_progressive`.
    pub(crate) async fn call_single_model_with_timing(&self, model: LogicalModel, args: ChatArgs) -> ModelCallOutcome {
        let start = Instant::now();
        match self.chat(args).await {
            Ok(content) => ModelCallOutcome::success(model, content, start.elapsed()),
            Err(e) => ModelCallOutcome::failure(model, e, start.elapsed()),
        }
    }
}
