//! Model token usage telemetry.

use serde::{Deserialize, Serialize};

/// Token counts reported by a model call.
///
/// Best-effort telemetry: absence must never block or fail the calling
/// stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// A usage row to persist for one model request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub session_id: String,
    /// Provider-issued response id
    pub request_id: String,
    /// What the call was for: "summarization", "title_generation", ...
    pub request_type: String,
    pub model_used: String,
    #[serde(flatten)]
    pub tokens: TokenUsage,
}

impl UsageRecord {
    pub fn new(
        session_id: impl Into<String>,
        request_id: impl Into<String>,
        request_type: impl Into<String>,
        model_used: impl Into<String>,
        tokens: TokenUsage,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            request_id: request_id.into(),
            request_type: request_type.into(),
            model_used: model_used.into(),
            tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_record_flattens_tokens() {
        let record = UsageRecord::new(
            "s1",
            "resp-1",
            "summarization",
            "gpt-5",
            TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 20,
                total_tokens: 30,
            },
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["total_tokens"], 30);
        assert_eq!(json["request_type"], "summarization");
        assert!(json.get("tokens").is_none());
    }
}
