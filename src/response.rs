//! Response types and the uniform [`GenerationResult`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::{Content, FunctionCall, Role};
use crate::errors::GenaiError;
use crate::safety::{BlockReason, SafetyRating};
use crate::wire_enum::wire_enum;

wire_enum! {
    /// Why generation stopped.
    pub enum FinishReason {
        Unspecified => "FINISH_REASON_UNSPECIFIED",
        Stop => "STOP",
        MaxTokens => "MAX_TOKENS",
        Safety => "SAFETY",
        Recitation => "RECITATION",
        Language => "LANGUAGE",
        Other => "OTHER",
        Blocklist => "BLOCKLIST",
        ProhibitedContent => "PROHIBITED_CONTENT",
        Spii => "SPII",
        MalformedFunctionCall => "MALFORMED_FUNCTION_CALL",
        ImageSafety => "IMAGE_SAFETY",
        UnexpectedToolCall => "UNEXPECTED_TOOL_CALL",
        ModelArmor => "MODEL_ARMOR",
        /// Set by this crate when the prompt itself was rejected
        /// (`promptFeedback.blockReason`). The service never sends it.
        PromptBlocked => "PROMPT_BLOCKED",
    }
    default = Unspecified;
}

/// Token accounting for one call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: u32,
    pub candidates_token_count: u32,
    pub total_token_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thoughts_token_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_content_token_count: Option<u32>,
}

impl UsageMetadata {
    /// Total tokens, summing prompt and candidates when the service left it at 0.
    #[must_use]
    pub fn total(&self) -> u32 {
        if self.total_token_count > 0 {
            self.total_token_count
        } else {
            self.prompt_token_count
                .saturating_add(self.candidates_token_count)
        }
    }
}

/// Citation and search-source information attached to a grounded answer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub web_search_queries: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub grounding_chunks: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub grounding_supports: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_entry_point: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Candidate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub safety_ratings: Vec<SafetyRating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grounding_metadata: Option<GroundingMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<BlockReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason_message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub safety_ratings: Vec<SafetyRating>,
}

/// One `generateContent` response body, or one streamed frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerateContentResponse {
    pub candidates: Vec<Candidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
}

/// The outcome of one logical call, retries included.
///
/// Every public call returns one of these instead of an error: check
/// [`is_success`](Self::is_success), then read the content or the
/// [`error_message`](Self::error_message) and [`status_code`](Self::status_code).
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationResult {
    success: bool,
    content: Content,
    error_message: String,
    status_code: u16,
    finish_reason: FinishReason,
    input_tokens: u32,
    output_tokens: u32,
    total_tokens: u32,
    grounding_metadata: Option<GroundingMetadata>,
}

impl GenerationResult {
    pub(crate) fn success(
        status_code: u16,
        mut content: Content,
        finish_reason: FinishReason,
        usage: Option<&UsageMetadata>,
        grounding_metadata: Option<GroundingMetadata>,
    ) -> Self {
        content.role = Role::Model;
        let usage = usage.cloned().unwrap_or_default();
        Self {
            success: true,
            content,
            error_message: String::new(),
            status_code,
            finish_reason,
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
            total_tokens: usage.total(),
            grounding_metadata,
        }
    }

    pub(crate) fn failure(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            success: false,
            content: Content::model(),
            error_message: message.into(),
            status_code,
            finish_reason: FinishReason::Unspecified,
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            grounding_metadata: None,
        }
    }

    pub(crate) fn from_error(error: &GenaiError) -> Self {
        Self::failure(error.to_string(), error.status_code())
    }

    #[must_use]
    pub(crate) fn with_finish_reason(mut self, finish_reason: FinishReason) -> Self {
        self.finish_reason = finish_reason;
        self
    }

    #[must_use]
    pub(crate) fn with_usage(mut self, usage: Option<&UsageMetadata>) -> Self {
        if let Some(usage) = usage {
            self.input_tokens = usage.prompt_token_count;
            self.output_tokens = usage.candidates_token_count;
            self.total_tokens = usage.total();
        }
        self
    }

    /// Maps a decoded success-status response to a result.
    ///
    /// A blocked prompt yields [`FinishReason::PromptBlocked`]. Zero
    /// candidates is a failure whose message says whether safety filtering
    /// is the likely cause. Otherwise the first candidate is used.
    pub(crate) fn from_response(status_code: u16, response: GenerateContentResponse) -> Self {
        let GenerateContentResponse {
            candidates,
            prompt_feedback,
            usage_metadata,
            ..
        } = response;
        let usage = usage_metadata.as_ref();

        if let Some(feedback) = &prompt_feedback
            && let Some(reason) = &feedback.block_reason
        {
            let mut message = format!("Prompt blocked by safety filter: {reason}");
            if let Some(detail) = &feedback.block_reason_message {
                message.push_str(&format!(" ({detail})"));
            }
            return Self::failure(message, status_code)
                .with_finish_reason(FinishReason::PromptBlocked)
                .with_usage(usage);
        }

        let Some(candidate) = candidates.into_iter().next() else {
            let safety_flagged = prompt_feedback
                .as_ref()
                .is_some_and(|f| !f.safety_ratings.is_empty());
            let message = if safety_flagged {
                "No candidates returned (likely blocked by safety filtering)"
            } else {
                "No candidates returned (unknown cause)"
            };
            return Self::failure(message, status_code).with_usage(usage);
        };

        let finish_reason = candidate.finish_reason.unwrap_or_default();
        match candidate.content {
            Some(content) => Self::success(
                status_code,
                content,
                finish_reason,
                usage,
                candidate.grounding_metadata,
            ),
            None => Self::failure(
                format!("Candidate has no content (finish reason: {finish_reason})"),
                status_code,
            )
            .with_finish_reason(finish_reason)
            .with_usage(usage),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The model's turn. Empty on failure.
    #[must_use]
    pub fn content(&self) -> &Content {
        &self.content
    }

    #[must_use]
    pub fn into_content(self) -> Content {
        self.content
    }

    /// Human-readable failure description. Empty on success.
    #[must_use]
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// HTTP status of the final attempt, or `0` when no response was received.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    #[must_use]
    pub fn finish_reason(&self) -> &FinishReason {
        &self.finish_reason
    }

    #[must_use]
    pub fn input_tokens(&self) -> u32 {
        self.input_tokens
    }

    #[must_use]
    pub fn output_tokens(&self) -> u32 {
        self.output_tokens
    }

    #[must_use]
    pub fn total_tokens(&self) -> u32 {
        self.total_tokens
    }

    #[must_use]
    pub fn grounding_metadata(&self) -> Option<&GroundingMetadata> {
        self.grounding_metadata.as_ref()
    }

    /// Concatenated non-thought text of the content.
    #[must_use]
    pub fn text(&self) -> String {
        self.content.text()
    }

    #[must_use]
    pub fn thoughts(&self) -> Vec<&str> {
        self.content.thoughts()
    }

    #[must_use]
    pub fn function_calls(&self) -> Vec<&FunctionCall> {
        self.content.function_calls()
    }

    /// Extracts the JSON value embedded in the text.
    ///
    /// Takes the span from the first `{` or `[` to the last `}` or `]`, so
    /// surrounding prose and markdown code fences are tolerated.
    pub fn as_json(&self) -> Result<Value, GenaiError> {
        let text = self.text();
        let start = text.find(['{', '[']);
        let end = text.rfind(['}', ']']);
        match (start, end) {
            (Some(start), Some(end)) if start < end => {
                Ok(serde_json::from_str(&text[start..=end])?)
            }
            _ => Err(GenaiError::MalformedResponse(
                "response text contains no JSON object or array".to_string(),
            )),
        }
    }
}
