//! HTTP-backed [`ProviderClient`] for OpenAI-compatible chat completion
//! endpoints (Dashscope, Volcengine/Ark, and similar).
//!
//! The pooled, header-preconfigured `reqwest::Client` mirrors
//! `Platano78-smart-ai-bridge`'s `DeepSeekClient` (`src/deepseek.rs`); the
//! `async_stream`-generated response stream follows the same pattern
//! `mikefaille-adk-rust`'s `adk-model` crate uses in `gemini/client.rs` and
//! `ollama/client.rs` to turn a provider-native stream into this crate's
//! [`StreamChunk`] shape.

use crate::client::{ProviderClient, StreamResult};
use crate::error::ProviderError;
use crate::sse::SseDecoder;
use crate::types::{ChatCompletion, ChatRequest, Message, MessagePart, StreamChunk, TokenUsage};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default per-call timeout, sized for diagram-length prompts (§4.5).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(70);

pub struct HttpProviderClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpProviderClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("reqwest client with static config must build");

        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client with static config must build");
        self
    }

    fn wire_messages(messages: &[Message]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.clone(),
                content: m.as_text(),
                parts: m
                    .parts
                    .iter()
                    .filter(|p| !matches!(p, MessagePart::Text { .. }))
                    .cloned()
                    .collect(),
            })
            .collect()
    }
}

#[derive(Serialize)]
struct WireMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parts: Vec<MessagePart>,
}

#[derive(Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

impl From<WireUsage> for TokenUsage {
    fn from(u: WireUsage) -> Self {
        TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: if u.total_tokens > 0 {
                u.total_tokens
            } else {
                u.prompt_tokens + u.completion_tokens
            },
        }
    }
}

#[derive(Deserialize)]
struct WireChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireChoice {
    #[serde(default)]
    message: Option<WireChoiceMessage>,
    #[serde(default)]
    delta: Option<WireDelta>,
}

#[derive(Deserialize)]
struct WireDelta {
    #[serde(default)]
    content: Option<String>,
    /// Dashscope-style reasoning model quirk (§4.5; grounded on the
    /// original `services/llm/llm_service.py`'s handling of reasoning vs.
    /// displayable content).
    #[serde(default)]
    reasoning_content: Option<String>,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

async fn translate_error_response(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();
    ProviderError::from_http_status(status, &body, retry_after)
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn chat_completion(&self, request: ChatRequest) -> Result<ChatCompletion, ProviderError> {
        let wire = WireRequest {
            model: self.model.clone(),
            messages: Self::wire_messages(&request.messages),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&wire)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(translate_error_response(response).await);
        }

        let body: WireResponse = response.json().await?;
        let content = body
            .choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.clone())
            .unwrap_or_default();

        Ok(ChatCompletion {
            content,
            usage: body.usage.map(TokenUsage::from).unwrap_or_default(),
        })
    }

    async fn stream_chat_completion(
        &self,
        request: ChatRequest,
    ) -> Result<BoxStream<'static, StreamResult>, ProviderError> {
        let wire = WireRequest {
            model: self.model.clone(),
            messages: Self::wire_messages(&request.messages),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: true,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&wire)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(translate_error_response(response).await);
        }

        let stream = async_stream::stream! {
            let mut bytes = response.bytes_stream();
            let mut decoder = SseDecoder::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(ProviderError::from(e));
                        return;
                    }
                };

                for payload in decoder.push(&chunk) {
                    if payload == "[DONE]" {
                        return;
                    }

                    match serde_json::from_str::<WireResponse>(&payload) {
                        Ok(parsed) => {
                            if let Some(choice) = parsed.choices.first() {
                                if let Some(delta) = &choice.delta {
                                    if let Some(reasoning) = &delta.reasoning_content {
                                        if !reasoning.is_empty() {
                                            yield Ok(StreamChunk::Thinking(reasoning.clone()));
                                        }
                                    }
                                    if let Some(content) = &delta.content {
                                        if !content.is_empty() {
                                            yield Ok(StreamChunk::Token(content.clone()));
                                        }
                                    }
                                }
                            }
                            if let Some(usage) = parsed.usage {
                                yield Ok(StreamChunk::Usage(usage.into()));
                            }
                        }
                        Err(e) => {
                            yield Err(ProviderError::new(
                                llm_resilience_core::ErrorKind::Provider,
                                format!("malformed stream frame: {e}"),
                            ));
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
