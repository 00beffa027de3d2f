/*
[INPUT]:  Prompt text and optional generation parameters
[OUTPUT]: Serializable POST /tasks request body
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When the service accepts new generation parameters
*/

use serde::{Deserialize, Serialize};

/// Body of `POST /tasks`.
///
/// `negative_prompt` is always sent (as `null` when absent); the tuning
/// parameters are omitted unless set, leaving the service defaults
/// (20 steps, 512x512, cfg 7.5) in charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfg_scale: Option<f32>,
}

impl CreateTaskRequest {
    pub fn new(prompt: impl Into<String>, negative_prompt: Option<String>) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompt,
            steps: None,
            width: None,
            height: None,
            cfg_scale: None,
        }
    }

    pub fn steps(mut self, steps: u32) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn cfg_scale(mut self, cfg_scale: f32) -> Self {
        self.cfg_scale = Some(cfg_scale);
        self
    }
}
