//! `stream_progressive` (§4.6): one task per model, all pushing into a
//! single shared queue; completes once every spawned unit has emitted
//! either `Complete` or `Error`.

use crate::args::ChatArgs;
use crate::chat::ChatStreamChunk;
use crate::orchestrator::LlmOrchestrator;
use crate::result::StreamEvent;
use futures::stream::{BoxStream, StreamExt};
use llm_resilience_core::LogicalModel;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

impl LlmOrchestrator {
    pub fn stream_progressive(&self, prompt: impl Into<String>, models: Vec<LogicalModel>) -> BoxStream<'static, StreamEvent> {
        let prompt = prompt.into();
        let (tx, rx) = mpsc::unbounded_channel();

        for model in models {
            // Pre-map to the physical model and pass `skip_load_balancing`
            // so the inner `chat_stream_structured` call doesn't re-map it
            // (§4.6: keeps circuit-breaker/limiter selection correct).
            let physical = self.load_balancer.map_model(&model);
            let mut args = ChatArgs::new(physical.as_str(), prompt.clone());
            args.skip_load_balancing = true;

            let this = self.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let start = Instant::now();
                let mut token_count = 0usize;
                match this.chat_stream_structured(args).await {
                    Ok(mut stream) => {
                        let mut failed = false;
                        while let Some(chunk) = stream.next().await {
                            match chunk {
                                Ok(ChatStreamChunk::Token(token)) => {
                                    token_count += 1;
                                    let _ = tx.send(StreamEvent::Token { model: model.clone(), token });
                                }
                                Ok(ChatStreamChunk::Thinking(_)) => {}
                                Ok(ChatStreamChunk::Usage(_)) => {}
                                Err(error) => {
                                    failed = true;
                                    let _ = tx.send(StreamEvent::Error {
                                        model: model.clone(),
                                        error,
                                        duration: start.elapsed(),
                                    });
                                    break;
                                }
                            }
                        }
                        if !failed {
                            let _ = tx.send(StreamEvent::Complete {
                                model: model.clone(),
                                duration: start.elapsed(),
                                token_count,
                            });
                        }
                    }
                    Err(error) => {
                        let _ = tx.send(StreamEvent::Error { model: model.clone(), error, duration: start.elapsed() });
                    }
                }
            });
        }
        drop(tx);

        UnboundedReceiverStream::new(rx).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::StreamEvent;
    use crate::test_support::{orchestrator_with_clients, DelayedClient, FailingClient};
    use llm_resilience_core::PhysicalModel;
    use std::sync::Arc;

    #[tokio::test]
    async fn every_model_emits_a_terminal_event() {
        let orch = orchestrator_with_clients(vec![(
            LogicalModel::new("ok"),
            PhysicalModel::new("ok"),
            DelayedClient::immediate("hello"),
        )]);
        orch.register_model(
            LogicalModel::new("broken"),
            PhysicalModel::new("broken"),
            llm_resilience_core::Provider::new("broken"),
            1,
            Arc::new(FailingClient),
        );

        let mut stream = orch.stream_progressive("hi", vec![LogicalModel::new("ok"), LogicalModel::new("broken")]);
        let mut terminal = 0;
        while let Some(event) = stream.next().await {
            if matches!(event, StreamEvent::Complete { .. } | StreamEvent::Error { .. }) {
                terminal += 1;
            }
        }
        assert_eq!(terminal, 2);
    }
}
