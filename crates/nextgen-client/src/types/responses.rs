/*
[INPUT]:  Diagnostic probe outcomes and /health payloads
[OUTPUT]: Structured, never-failing probe results for display
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When probe result fields or health payload shape change
*/

use serde::{Deserialize, Serialize};

/// Outcome of a lightweight reachability probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PingResult {
    pub fn ok(message: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            detail,
        }
    }

    pub fn failed(message: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            detail,
        }
    }
}

/// Outcome of a `GET /health` probe. `data` carries the raw server payload
/// whenever one could be parsed, including for an unhealthy service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl HealthResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// The fields of the health payload the client interprets. Everything else
/// is passed through untouched in [`HealthResult::data`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HealthSummary {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl HealthSummary {
    pub fn is_unhealthy(&self) -> bool {
        self.status.as_deref() == Some("unhealthy")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_summary_reads_status() {
        let payload = serde_json::json!({
            "status": "unhealthy",
            "worker": { "is_running": false },
            "message": "Worker is not running properly"
        });
        let summary: HealthSummary = serde_json::from_value(payload).unwrap();
        assert!(summary.is_unhealthy());
        assert_eq!(summary.message.as_deref(), Some("Worker is not running properly"));

        let summary: HealthSummary = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(!summary.is_unhealthy());
    }
}
