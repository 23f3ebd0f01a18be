//! WebSocket-based voice model adapter (§4.5, §4.6).
//!
//! Voice models don't speak the chat-completion wire protocol at all, so
//! this adapter only implements the connect/close `probe` dance
//! `health_check` needs (§4.6: "For WebSocket-based voice models, performs
//! a connect/close dance instead"); `chat_completion`/`stream_chat_completion`
//! are not meaningful for this adapter and return `InvalidParameter`.
//!
//! Gated behind the `voice-probe` feature so the `tokio-tungstenite`
//! dependency is only pulled in by callers that actually register a voice
//! model.

use crate::client::{ProviderClient, StreamResult};
use crate::error::ProviderError;
use crate::types::{ChatCompletion, ChatRequest};
use async_trait::async_trait;
use futures::stream::BoxStream;
use llm_resilience_core::ErrorKind;
use tokio_tungstenite::connect_async;

pub struct WsVoiceProviderClient {
    url: String,
}

impl WsVoiceProviderClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl ProviderClient for WsVoiceProviderClient {
    async fn chat_completion(&self, _request: ChatRequest) -> Result<ChatCompletion, ProviderError> {
        Err(ProviderError::new(
            ErrorKind::InvalidParameter,
            "voice models do not support chat_completion",
        ))
    }

    async fn stream_chat_completion(&self, _request: ChatRequest) -> Result<BoxStream<'static, StreamResult>, ProviderError> {
        Err(ProviderError::new(
            ErrorKind::InvalidParameter,
            "voice models do not support stream_chat_completion",
        ))
    }

    /// Connects, then immediately closes, the voice endpoint's WebSocket
    /// to confirm it accepts connections. Never sends or awaits any audio
    /// frames; that protocol is entirely out of this core's scope.
    async fn probe(&self) -> Result<(), ProviderError> {
        let (mut stream, _response) = connect_async(&self.url)
            .await
            .map_err(|e| ProviderError::transport(e.to_string()))?;

        use futures::SinkExt;
        let _ = stream.close(None).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chat_completion_is_not_supported() {
        let client = WsVoiceProviderClient::new("wss://example.invalid/voice");
        let result = client
            .chat_completion(ChatRequest {
                messages: vec![],
                temperature: None,
                max_tokens: None,
            })
            .await;
        assert_eq!(result.unwrap_err().kind, ErrorKind::InvalidParameter);
    }

    #[tokio::test]
    async fn stream_chat_completion_is_not_supported() {
        let client = WsVoiceProviderClient::new("wss://example.invalid/voice");
        let result = client
            .stream_chat_completion(ChatRequest {
                messages: vec![],
                temperature: None,
                max_tokens: None,
            })
            .await;
        assert_eq!(result.err().unwrap().kind, ErrorKind::InvalidParameter);
    }
}
