//! Provider-agnostic error taxonomy (§7).
//!
//! Every layer of the orchestration core — cache, rate limiter, circuit
//! breaker, provider adapters, session/identity caches — eventually reports
//! one of these kinds. [`OrchestrationError`] wraps the kind together with an
//! internal (never user-facing) detail string, mirroring the role
//! `tower_resilience_core::ResilienceError` plays for the Tower resilience
//! crates, generalized to the richer taxonomy this spec requires.

use std::fmt;
use std::time::Duration;

/// The language-agnostic error kinds from §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Provider rejected for QPM/TPM. Retryable, should respect `retry_after`.
    RateLimit,
    /// Account quota hit. Not retryable.
    QuotaExhausted,
    /// Bad request shape. Not retryable.
    InvalidParameter,
    /// Unknown model name. Not retryable.
    ModelNotFound,
    /// Auth/permission failure. Not retryable.
    AccessDenied,
    /// Provider refused on policy grounds. Not retryable.
    ContentFilter,
    /// No response within deadline. Retryable.
    Timeout,
    /// DNS/TCP/TLS/connection failure. Retryable.
    Transport,
    /// 5xx or malformed response. Retryable.
    Provider,
    /// Local breaker refused dispatch. Not retryable, never retried.
    CircuitOpen,
    /// Context cancelled. Not retryable, surfaced distinctly.
    Cancelled,
    /// Empty/None response. Not retryable.
    Validation,
}

impl ErrorKind {
    /// Whether the orchestrator's retry loop (§4.6 step 6, §7) may retry
    /// an error of this kind. `CircuitOpen` and `Cancelled` are NEVER retried.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimit | ErrorKind::Timeout | ErrorKind::Transport | ErrorKind::Provider
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::QuotaExhausted => "quota_exhausted",
            ErrorKind::InvalidParameter => "invalid_parameter",
            ErrorKind::ModelNotFound => "model_not_found",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::ContentFilter => "content_filter",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Transport => "transport",
            ErrorKind::Provider => "provider",
            ErrorKind::CircuitOpen => "circuit_open",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Validation => "validation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unified orchestration error.
///
/// `detail` is for internal logs only (§7: "internal logs retain full
/// detail"); [`OrchestrationError::user_message`] returns the localized,
/// provider-detail-free string that is safe to hand back to a caller.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct OrchestrationError {
    pub kind: ErrorKind,
    pub detail: String,
    pub retry_after: Option<Duration>,
}

impl OrchestrationError {
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

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    pub fn circuit_open() -> Self {
        Self::new(ErrorKind::CircuitOpen, "circuit breaker open")
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "operation cancelled")
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, detail)
    }

    /// Localized, provider-detail-free message for user-facing surfaces
    /// (§7: "never include raw provider payloads").
    pub fn user_message(&self, locale: Locale) -> String {
        let (en, zh): (&str, &str) = match self.kind {
            ErrorKind::RateLimit => ("The service is busy, please try again shortly.", "服务繁忙，请稍后重试。"),
            ErrorKind::QuotaExhausted => ("Usage quota has been exhausted.", "使用额度已耗尽。"),
            ErrorKind::InvalidParameter => ("The request was invalid.", "请求参数无效。"),
            ErrorKind::ModelNotFound => ("The requested model is not available.", "请求的模型不可用。"),
            ErrorKind::AccessDenied => ("You do not have access to this resource.", "您没有权限访问该资源。"),
            ErrorKind::ContentFilter => ("The request was refused by content policy.", "请求因内容策略被拒绝。"),
            ErrorKind::Timeout => ("The request timed out, please try again.", "请求超时，请重试。"),
            ErrorKind::Transport => ("A network error occurred, please try again.", "网络错误，请重试。"),
            ErrorKind::Provider => ("The upstream service returned an error.", "上游服务出现错误。"),
            ErrorKind::CircuitOpen => ("This model is temporarily unavailable.", "该模型暂时不可用。"),
            ErrorKind::Cancelled => ("The request was cancelled.", "请求已取消。"),
            ErrorKind::Validation => ("The request was empty or invalid.", "请求内容为空或无效。"),
        };
        match locale {
            Locale::En => en.to_string(),
            Locale::Zh => zh.to_string(),
        }
    }
}

/// Supported user-facing locales (§7: "localized (EN/ZH)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    En,
    Zh,
}
