//! Status update rows for session progress tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One status update row, as persisted and read back by observers.
///
/// Sequence numbers are assigned at write time and are strictly increasing
/// per session with no gaps, so a poller can detect missed intermediate
/// states but never see them out of order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub session_id: String,
    pub status: String,
    pub sequence_number: u64,
    pub timestamp: DateTime<Utc>,
    /// Stage-specific payload: per-medium progress for concurrent
    /// generation, or `{error, stage}` on failure.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub additional_info: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_additional_info_is_optional() {
        let row = StatusUpdate {
            session_id: "s1".to_string(),
            status: "transcribing".to_string(),
            sequence_number: 1,
            timestamp: Utc::now(),
            additional_info: None,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert!(!json.as_object().unwrap().contains_key("additional_info"));

        let parsed: StatusUpdate = serde_json::from_value(serde_json::json!({
            "session_id": "s1",
            "status": "failed",
            "sequence_number": 4,
            "timestamp": "2025-01-01T00:00:00Z",
            "additional_info": {"error": "boom", "stage": "generating_title"}
        }))
        .unwrap();
        assert_eq!(parsed.sequence_number, 4);
        assert_eq!(parsed.additional_info.unwrap()["stage"], "generating_title");
    }
}
