//! Provider adapter errors, and the translation table from provider HTTP
//! status/body shapes onto the universal taxonomy (§4.5, §7).

use llm_resilience_core::ErrorKind;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
#[error("{kind}: {detail}")]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub detail: String,
    pub retry_after: Option<Duration>,
}

impl ProviderError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Maps an HTTP status code and response body onto the §7 taxonomy.
    pub fn from_http_status(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        let kind = match status {
            429 => ErrorKind::RateLimit,
            401 | 403 => ErrorKind::AccessDenied,
            404 => ErrorKind::ModelNotFound,
            400 => ErrorKind::InvalidParameter,
            s if s >= 500 => ErrorKind::Provider,
            _ => ErrorKind::Provider,
        };

        let error = Self::new(kind, format!("provider returned {status}: {body}"));
        match retry_after {
            Some(d) => error.with_retry_after(d),
            None => error,
        }
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, detail)
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, detail)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::timeout(e.to_string())
        } else if e.is_connect() {
            ProviderError::transport(e.to_string())
        } else {
            ProviderError::new(ErrorKind::Provider, e.to_string())
        }
    }
}
