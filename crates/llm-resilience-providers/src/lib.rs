//! Uniform provider adapter interface (§4.5).

pub mod client;
pub mod error;
pub mod http;
pub mod sse;
pub mod types;

#[cfg(feature = "voice-probe")]
pub mod voice;

pub use client::{ProviderClient, StreamResult};
pub use error::ProviderError;
pub use http::HttpProviderClient;
pub use types::{ChatCompletion, ChatRequest, Message, MessagePart, StreamChunk, TokenUsage};

#[cfg(feature = "voice-probe")]
pub use voice::WsVoiceProviderClient;
