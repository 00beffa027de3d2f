/*
[INPUT]:  Task JSON objects returned by the generation service
[OUTPUT]: Strictly-typed Task records with named key fallbacks
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
[UPDATE]: Accept naive ISO-8601 timestamps written by the service
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::TaskStatus;

/// One generation request and its outcome, as the service reports it.
///
/// Instances are replaced wholesale on every reconciliation; nothing patches
/// individual fields locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTask")]
pub struct Task {
    pub id: String,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: TaskStatus,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Task as it arrives on the wire. Each field with an older spelling keeps
/// both keys; the primary key wins and the fallback fills in when it is
/// absent or null.
#[derive(Debug, Deserialize)]
struct RawTask {
    id: String,
    prompt: String,
    #[serde(default)]
    negative_prompt: Option<String>,
    #[serde(default, rename = "negativePrompt")]
    negative_prompt_fallback: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    status: TaskStatus,
    #[serde(default, rename = "imageUrl")]
    image_url: Option<String>,
    #[serde(default, rename = "image_url")]
    image_url_fallback: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    completed_at: Option<String>,
}

impl TryFrom<RawTask> for Task {
    type Error = String;

    fn try_from(raw: RawTask) -> Result<Self, Self::Error> {
        let created_raw = raw
            .created_at
            .or(raw.timestamp)
            .ok_or_else(|| "missing field `created_at`".to_string())?;
        let created_at = serde_helpers::parse_timestamp(&created_raw)
            .ok_or_else(|| format!("invalid timestamp: {created_raw}"))?;
        let completed_at = match raw.completed_at {
            Some(completed_raw) => Some(
                serde_helpers::parse_timestamp(&completed_raw)
                    .ok_or_else(|| format!("invalid timestamp: {completed_raw}"))?,
            ),
            None => None,
        };

        Ok(Task {
            id: raw.id,
            prompt: raw.prompt,
            negative_prompt: raw.negative_prompt.or(raw.negative_prompt_fallback),
            created_at,
            status: raw.status,
            image_url: raw.image_url.or(raw.image_url_fallback),
            error: raw.error,
            completed_at,
        })
    }
}

mod serde_helpers {
    use chrono::{DateTime, NaiveDateTime, Utc};

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    /// RFC 3339 first; naive timestamps (no offset) are taken as UTC.
    pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc())
    }
}
