//! The [`ProviderClient`] trait every adapter implements (§4.5).

use crate::error::ProviderError;
use crate::types::{ChatCompletion, ChatRequest};
use async_trait::async_trait;
use futures::stream::BoxStream;

pub type StreamResult = Result<crate::types::StreamChunk, ProviderError>;

#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn chat_completion(&self, request: ChatRequest) -> Result<ChatCompletion, ProviderError>;

    async fn stream_chat_completion(
        &self,
        request: ChatRequest,
    ) -> Result<BoxStream<'static, StreamResult>, ProviderError>;

    /// A short probe used by `health_check` (§4.6). Default
    /// implementation issues a minimal chat completion; WebSocket-based
    /// voice adapters override this with a connect/close dance instead.
    async fn probe(&self) -> Result<(), ProviderError> {
        self.chat_completion(ChatRequest {
            messages: vec![crate::types::Message::text("user", "ping")],
            temperature: None,
            max_tokens: Some(1),
        })
        .await
        .map(|_| ())
    }
}
