//! Request body types for `generateContent` / `streamGenerateContent`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::Content;
use crate::safety::SafetySetting;
use crate::tools::{Tool, ToolConfig};
use crate::wire_enum::wire_enum;

wire_enum! {
    /// Coarse reasoning effort for models that support thinking levels.
    pub enum ThinkingLevel {
        Unspecified => "THINKING_LEVEL_UNSPECIFIED",
        Minimal => "MINIMAL",
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
    }
    default = Unspecified;
}

wire_enum! {
    /// Resolution used for media inputs.
    pub enum MediaResolution {
        Unspecified => "MEDIA_RESOLUTION_UNSPECIFIED",
        Low => "MEDIA_RESOLUTION_LOW",
        Medium => "MEDIA_RESOLUTION_MEDIUM",
        High => "MEDIA_RESOLUTION_HIGH",
    }
    default = Unspecified;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_thoughts: Option<bool>,
    /// Token budget for thinking. `0` disables thinking, `-1` lets the model decide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_level: Option<ThinkingLevel>,
}

impl ThinkingConfig {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include_thoughts.is_none()
            && self.thinking_budget.is_none()
            && self.thinking_level.is_none()
    }
}

/// Sampling and output options. Unset fields are omitted from the payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_logprobs: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_resolution: Option<MediaResolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
}

impl GenerationConfig {
    /// True when serializing would produce `{}`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: i32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    #[must_use]
    pub fn with_max_output_tokens(mut self, max: i32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }

    #[must_use]
    pub fn with_candidate_count(mut self, count: i32) -> Self {
        self.candidate_count = Some(count);
        self
    }

    #[must_use]
    pub fn with_stop_sequences(mut self, stops: Vec<String>) -> Self {
        self.stop_sequences = Some(stops);
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Requests JSON output, optionally constrained by a schema.
    #[must_use]
    pub fn with_json_output(mut self, schema: Option<Value>) -> Self {
        self.response_mime_type = Some("application/json".to_string());
        self.response_schema = schema;
        self
    }

    #[must_use]
    pub fn with_thinking_budget(mut self, budget: i32) -> Self {
        self.thinking_config
            .get_or_insert_with(ThinkingConfig::default)
            .thinking_budget = Some(budget);
        self
    }

    #[must_use]
    pub fn with_thinking_level(mut self, level: ThinkingLevel) -> Self {
        self.thinking_config
            .get_or_insert_with(ThinkingConfig::default)
            .thinking_level = Some(level);
        self
    }

    #[must_use]
    pub fn with_include_thoughts(mut self, include: bool) -> Self {
        self.thinking_config
            .get_or_insert_with(ThinkingConfig::default)
            .include_thoughts = Some(include);
        self
    }
}

/// The full request body.
///
/// Usually produced by [`PayloadBuilder`](crate::PayloadBuilder), which
/// normalizes empty collections and configs to `None` so they are omitted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_settings: Option<Vec<SafetySetting>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_generation_config_serializes_to_empty_object() {
        let config = GenerationConfig::default();
        assert!(config.is_empty());
        assert_eq!(serde_json::to_value(&config).unwrap(), json!({}));
    }

    #[test]
    fn test_generation_config_camel_case_fields() {
        let config = GenerationConfig::default()
            .with_temperature(0.5)
            .with_max_output_tokens(128)
            .with_thinking_budget(1024)
            .with_json_output(None);
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["temperature"], 0.5);
        assert_eq!(value["maxOutputTokens"], 128);
        assert_eq!(value["thinkingConfig"]["thinkingBudget"], 1024);
        assert_eq!(value["responseMimeType"], "application/json");
        assert!(value.get("responseSchema").is_none());
        assert!(!config.is_empty());
    }

    #[test]
    fn test_thinking_level_wire_value() {
        let config = GenerationConfig::default().with_thinking_level(ThinkingLevel::High);
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["thinkingConfig"]["thinkingLevel"], "HIGH");
    }
}
