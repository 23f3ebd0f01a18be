//! Token usage record and the field-normalization the tracker applies on
//! ingest (§4.7: accept `prompt_tokens`/`completion_tokens` OR
//! `input_tokens`/`output_tokens`, prefer the provider's authoritative
//! `total_tokens` when present).

use chrono::{DateTime, Utc};
use llm_resilience_core::{LogicalModel, PhysicalModel, Provider};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsageRecord {
    pub request_id: Uuid,
    pub user_id: Option<String>,
    pub logical_model: String,
    pub physical_model: String,
    pub provider: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub recorded_at: DateTime<Utc>,
}

/// Raw usage fields as reported by a provider response, before
/// normalization. Either naming convention is accepted.
#[derive(Debug, Clone, Default)]
pub struct RawUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

impl TokenUsageRecord {
    pub fn new(
        user_id: Option<String>,
        logical: &LogicalModel,
        physical: &PhysicalModel,
        provider: &Provider,
        raw: RawUsage,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        let input = raw.input_tokens.or(raw.prompt_tokens).unwrap_or(0);
        let output = raw.output_tokens.or(raw.completion_tokens).unwrap_or(0);
        let total = raw.total_tokens.unwrap_or(input + output);

        Self {
            request_id: Uuid::new_v4(),
            user_id,
            logical_model: logical.as_str().to_string(),
            physical_model: physical.as_str().to_string(),
            provider: provider.as_str().to_string(),
            input_tokens: input,
            output_tokens: output,
            total_tokens: total,
            recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_ids() -> (LogicalModel, PhysicalModel, Provider) {
        (
            LogicalModel::new("qwen"),
            PhysicalModel::new("qwen-max"),
            Provider::new("dashscope"),
        )
    }

    #[test]
    fn normalizes_prompt_completion_naming() {
        let (logical, physical, provider) = model_ids();
        let record = TokenUsageRecord::new(
            None,
            &logical,
            &physical,
            &provider,
            RawUsage {
                prompt_tokens: Some(10),
                completion_tokens: Some(5),
                ..Default::default()
            },
            Utc::now(),
        );
        assert_eq!(record.input_tokens, 10);
        assert_eq!(record.output_tokens, 5);
        assert_eq!(record.total_tokens, 15);
    }

    #[test]
    fn prefers_authoritative_total_over_sum() {
        let (logical, physical, provider) = model_ids();
        let record = TokenUsageRecord::new(
            None,
            &logical,
            &physical,
            &provider,
            RawUsage {
                input_tokens: Some(10),
                output_tokens: Some(5),
                total_tokens: Some(20),
                ..Default::default()
            },
            Utc::now(),
        );
        assert_eq!(record.total_tokens, 20);
    }
}
