//! Wire types shared by every provider adapter (§4.5).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text { text: String },
    ImageUrl { url: String },
    VideoUrl { url: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    /// Opaque multimodal parts, passed through to the provider untouched
    /// (§4.5: "Multimodal messages... pass through opaquely").
    pub parts: Vec<MessagePart>,
}

impl Message {
    pub fn text(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            parts: vec![MessagePart::Text { text: text.into() }],
        }
    }

    /// The message's plain-text content, concatenating any `Text` parts.
    /// Used by the orchestrator to find/rewrite the RAG query source.
    pub fn as_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub content: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// A single unit of a streamed response (§4.5). The final chunk of a
/// stream MUST be `Usage`.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    Token(String),
    /// Reasoning-model "thinking" content — the provider's
    /// `reasoning_content` quirk, translated here so it never leaks past
    /// the adapter boundary.
    Thinking(String),
    Usage(TokenUsage),
}
