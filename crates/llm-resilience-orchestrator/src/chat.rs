//! `chat`, `chat_with_usage`, `chat_stream` (§4.6).

use crate::args::ChatArgs;
use crate::orchestrator::{Dispatch, LlmOrchestrator};
use futures::stream::{BoxStream, StreamExt};
use llm_resilience_core::{ErrorKind, OrchestrationError, PhysicalModel};
use llm_resilience_providers::{ChatRequest, StreamChunk, TokenUsage};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// A single chunk yielded by `chat_stream` in structured mode (§4.6:
/// "Usage MUST be yielded last if structured").
#[derive(Debug, Clone)]
pub enum ChatStreamChunk {
    Token(String),
    Thinking(String),
    Usage(TokenUsage),
}

impl LlmOrchestrator {
    pub async fn chat(&self, args: ChatArgs) -> Result<String, OrchestrationError> {
        let (content, _) = self.chat_with_usage(args).await?;
        Ok(content)
    }

    /// Each retry attempt is a fresh limiter acquisition (§7): a slow
    /// transient failure on one attempt must not hold its concurrency
    /// permit through the backoff sleep leading into the next attempt.
    pub async fn chat_with_usage(&self, args: ChatArgs) -> Result<(String, TokenUsage), OrchestrationError> {
        args.validate()?;
        let cancel = CancellationToken::new();
        let request = self.build_request(&args).await;
        let physical_hint = args.skip_load_balancing.then(|| PhysicalModel::new(args.model.as_str()));
        let retry = self.config().retry.clone();

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let dispatch = self
                .begin_dispatch(&args.model, physical_hint.clone(), &cancel)
                .await?;

            match dispatch.client.chat_completion(request.clone()).await {
                Ok(completion) => {
                    self.finish_dispatch(
                        dispatch,
                        &args.model,
                        args.user_id.as_deref(),
                        true,
                        Some(completion.usage),
                    );
                    return Ok((completion.content, completion.usage));
                }
                Err(e) if e.kind.is_retryable() && attempt <= retry.max_retries => {
                    self.finish_dispatch(dispatch, &args.model, args.user_id.as_deref(), false, None);
                    let delay = e.retry_after.unwrap_or_else(|| retry.delay_for_attempt(attempt));
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => {
                    self.finish_dispatch(dispatch, &args.model, args.user_id.as_deref(), false, None);
                    return Err(provider_error_to_orchestration(e));
                }
            }
        }
    }

    /// Plain-content stream; callers that need structured chunks (thinking
    /// content, terminal usage) should drive [`LlmOrchestrator::chat_stream_structured`]
    /// instead.
    pub async fn chat_stream(&self, args: ChatArgs) -> Result<BoxStream<'static, Result<String, OrchestrationError>>, OrchestrationError> {
        let structured = self.chat_stream_structured(args).await?;
        Ok(structured
            .filter_map(|chunk| async move {
                match chunk {
                    Ok(ChatStreamChunk::Token(token)) => Some(Ok(token)),
                    Ok(_) => None,
                    Err(e) => Some(Err(e)),
                }
            })
            .boxed())
    }

    pub async fn chat_stream_structured(
        &self,
        args: ChatArgs,
    ) -> Result<BoxStream<'static, Result<ChatStreamChunk, OrchestrationError>>, OrchestrationError> {
        args.validate()?;
        let cancel = CancellationToken::new();
        let request = self.build_request(&args).await;
        let physical_hint = args.skip_load_balancing.then(|| PhysicalModel::new(args.model.as_str()));
        let dispatch = self.begin_dispatch(&args.model, physical_hint, &cancel).await?;

        let inner = match dispatch.client.stream_chat_completion(request).await {
            Ok(stream) => stream,
            Err(e) => {
                self.finish_dispatch(dispatch, &args.model, args.user_id.as_deref(), false, None);
                return Err(provider_error_to_orchestration(e));
            }
        };

        let model = args.model.clone();
        let user_id = args.user_id.clone();
        let performance = self.performance_handle();
        let load_balancer = self.load_balancer_handle();
        let usage_tracker = self.usage_handle();
        let physical = dispatch.physical.clone();
        let provider = dispatch.provider.clone();
        let start = dispatch.start;

        // The generator body owns `dispatch.permit`; it is released when the
        // stream is fully driven (or dropped early by the caller) -- never
        // before every chunk has been yielded.
        let permit = dispatch.permit;
        let output = async_stream::stream! {
            let _permit = permit;
            futures::pin_mut!(inner);
            while let Some(chunk) = inner.next().await {
                match chunk {
                    Ok(StreamChunk::Token(t)) => yield Ok(ChatStreamChunk::Token(t)),
                    Ok(StreamChunk::Thinking(t)) => yield Ok(ChatStreamChunk::Thinking(t)),
                    Ok(StreamChunk::Usage(usage)) => {
                        let duration = start.elapsed();
                        performance.record_request(&physical, duration, true, None);
                        load_balancer.record_provider_metrics(&provider, true, duration);
                        let raw = llm_resilience_usage::RawUsage {
                            input_tokens: Some(usage.input_tokens),
                            output_tokens: Some(usage.output_tokens),
                            total_tokens: Some(usage.total_tokens),
                            ..Default::default()
                        };
                        let record = llm_resilience_usage::TokenUsageRecord::new(
                            user_id.clone(),
                            &model,
                            &physical,
                            &provider,
                            raw,
                            chrono::Utc::now(),
                        );
                        usage_tracker.track_usage(record);
                        yield Ok(ChatStreamChunk::Usage(usage));
                    }
                    Err(e) => {
                        let duration = start.elapsed();
                        performance.record_request(&physical, duration, false, Some(e.kind));
                        yield Err(provider_error_to_orchestration(e));
                    }
                }
            }
        };

        Ok(output.boxed())
    }

    /// Used by `generate_race`: exposes the in-flight [`Dispatch`] through
    /// `slot` so the race loop can record a cancelled sample for whichever
    /// sibling task it aborts once a winner is found, instead of recording
    /// an ordinary failure for a call that merely lost the race (§4.6.2).
    pub(crate) async fn chat_tracked(&self, args: ChatArgs, slot: Arc<Mutex<Option<Dispatch>>>) -> Result<String, OrchestrationError> {
        args.validate()?;
        let cancel = CancellationToken::new();
        let request = self.build_request(&args).await;
        let physical_hint = args.skip_load_balancing.then(|| PhysicalModel::new(args.model.as_str()));
        let retry = self.config().retry.clone();

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let dispatch = self
                .begin_dispatch(&args.model, physical_hint.clone(), &cancel)
                .await?;
            let client = Arc::clone(&dispatch.client);
            *slot.lock().unwrap() = Some(dispatch);

            let result = client.chat_completion(request.clone()).await;

            // If the slot is empty, `generate_race` already took the
            // dispatch to record it as cancelled -- this attempt's result
            // is moot and must not also record a failure/success.
            let dispatch = match slot.lock().unwrap().take() {
                Some(dispatch) => dispatch,
                None => return Err(OrchestrationError::cancelled()),
            };

            match result {
                Ok(completion) => {
                    self.finish_dispatch(dispatch, &args.model, args.user_id.as_deref(), true, Some(completion.usage));
                    return Ok(completion.content);
                }
                Err(e) if e.kind.is_retryable() && attempt <= retry.max_retries => {
                    self.finish_dispatch(dispatch, &args.model, args.user_id.as_deref(), false, None);
                    let delay = e.retry_after.unwrap_or_else(|| retry.delay_for_attempt(attempt));
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => {
                    self.finish_dispatch(dispatch, &args.model, args.user_id.as_deref(), false, None);
                    return Err(provider_error_to_orchestration(e));
                }
            }
        }
    }

    pub(crate) async fn build_request(&self, args: &ChatArgs) -> ChatRequest {
        let rag_chunks = if args.use_knowledge_base {
            match (&args.user_id, args.rag_query()) {
                (Some(user_id), Some(query)) if !query.is_empty() => {
                    self.context.top_k(user_id, &query, 5).await
                }
                _ => Vec::new(),
            }
        } else {
            Vec::new()
        };

        let messages = args.resolve_messages(&rag_chunks, self.config().max_context_length);
        ChatRequest {
            messages,
            temperature: args.temperature,
            max_tokens: args.max_tokens,
        }
    }
}

pub(crate) fn provider_error_to_orchestration(e: llm_resilience_providers::ProviderError) -> OrchestrationError {
    let mut error = OrchestrationError::new(e.kind, e.detail);
    if let Some(retry_after) = e.retry_after {
        error = error.with_retry_after(retry_after);
    }
    error
}

impl From<ErrorKind> for OrchestrationError {
    fn from(kind: ErrorKind) -> Self {
        OrchestrationError::new(kind, kind.as_str())
    }
}
