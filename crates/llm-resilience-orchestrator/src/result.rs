//! Shapes returned by the fan-out methods (§4.6).

use llm_resilience_core::{LogicalModel, OrchestrationError};
use std::time::Duration;

/// Outcome of one model's call within `generate_multi`/`generate_progressive`
/// (§4.6: `{response, duration, success, error?}`). A failing model
/// never fails the whole call.
#[derive(Debug, Clone)]
pub struct ModelCallOutcome {
    pub model: LogicalModel,
    pub response: Option<String>,
    pub duration: Duration,
    pub success: bool,
    pub error: Option<OrchestrationError>,
}

impl ModelCallOutcome {
    pub fn success(model: LogicalModel, response: String, duration: Duration) -> Self {
        Self {
            model,
            response: Some(response),
            duration,
            success: true,
            error: None,
        }
    }

    pub fn failure(model: LogicalModel, error: OrchestrationError, duration: Duration) -> Self {
        Self {
            model,
            response: None,
            duration,
            success: false,
            error: Some(error),
        }
    }
}

/// An event from `stream_progressive` (§4.6: `{type, content|usage}`
/// generalized to one event enum per model).
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Token { model: LogicalModel, token: String },
    Complete { model: LogicalModel, duration: Duration, token_count: usize },
    Error { model: LogicalModel, error: OrchestrationError, duration: Duration },
}
