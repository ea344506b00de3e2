//! The event-stream call path.
//!
//! Frames come out of [`SseFrameDecoder`](crate::SseFrameDecoder) one JSON
//! payload at a time. Each is decoded independently into a
//! [`GenerateContentResponse`]; a frame that fails to decode is logged and
//! skipped. Text is handed to the caller's sink as it arrives and collected
//! by a [`StreamAccumulator`], which produces the final result.
//!
//! A failed attempt is retried only while nothing has reached the sink.

use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::content::Content;
use crate::engine::RequestEngine;
use crate::errors::GenaiError;
use crate::http::error_helpers::{api_error, format_json_parse_error};
use crate::http::loud_wire;
use crate::http::sse_parser::parse_sse_frames;
use crate::request::GenerateContentRequest;
use crate::response::{
    FinishReason, GenerateContentResponse, GenerationResult, GroundingMetadata, UsageMetadata,
};
use crate::retry::RetryState;

/// Builds one result out of a sequence of streamed frames.
///
/// Later frames overwrite the finish reason, usage, and grounding metadata
/// of earlier ones, since the service usually fills them only on the last
/// frame.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    fragments: usize,
    finish_reason: Option<FinishReason>,
    usage: Option<UsageMetadata>,
    grounding_metadata: Option<GroundingMetadata>,
    block_message: Option<String>,
}

impl StreamAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one frame in, passing each non-empty answer text fragment to `sink`.
    ///
    /// Only the first candidate is read. Parts flagged as thoughts are not
    /// treated as answer text.
    pub fn apply<F>(&mut self, frame: GenerateContentResponse, sink: &mut F)
    where
        F: FnMut(&str) + ?Sized,
    {
        if let Some(usage) = frame.usage_metadata {
            self.usage = Some(usage);
        }

        if let Some(feedback) = &frame.prompt_feedback
            && let Some(reason) = &feedback.block_reason
        {
            self.block_message = Some(format!("Prompt blocked by safety filter: {reason}"));
        }

        let Some(candidate) = frame.candidates.into_iter().next() else {
            return;
        };
        if let Some(reason) = candidate.finish_reason {
            self.finish_reason = Some(reason);
        }
        if let Some(grounding) = candidate.grounding_metadata {
            self.grounding_metadata = Some(grounding);
        }

        for part in candidate.content.iter().flat_map(|c| c.parts.iter()) {
            if part.is_thought() {
                continue;
            }
            if let Some(text) = part.as_text().filter(|t| !t.is_empty()) {
                sink(text);
                self.text.push_str(text);
                self.fragments += 1;
            }
        }
    }

    /// Whether any fragment has reached the sink.
    #[must_use]
    pub fn delivered(&self) -> bool {
        self.fragments > 0
    }

    /// Text accumulated so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The result of a stream that completed with `status`.
    #[must_use]
    pub fn into_result(self, status: u16) -> GenerationResult {
        if let Some(message) = self.block_message {
            return GenerationResult::failure(message, status)
                .with_finish_reason(FinishReason::PromptBlocked)
                .with_usage(self.usage.as_ref());
        }

        let content = if self.text.is_empty() {
            Content::model()
        } else {
            Content::model_text(self.text)
        };
        GenerationResult::success(
            status,
            content,
            self.finish_reason.unwrap_or_default(),
            self.usage.as_ref(),
            self.grounding_metadata,
        )
    }
}

/// Decodes one frame payload. An in-band `{"error": ...}` frame becomes an API error.
fn decode_frame(frame: &str) -> Result<Option<GenerateContentResponse>, GenaiError> {
    let value: Value = match serde_json::from_str(frame) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                "Skipping undecodable stream frame: {}",
                format_json_parse_error(frame, &e)
            );
            return Ok(None);
        }
    };

    if let Some(code) = value.get("error").map(|e| e.get("code").and_then(Value::as_u64)) {
        let status = code.and_then(|c| u16::try_from(c).ok()).unwrap_or(500);
        return Err(api_error(status, frame, None, None));
    }

    match serde_json::from_value(value) {
        Ok(response) => Ok(Some(response)),
        Err(e) => {
            warn!(
                "Skipping stream frame with unexpected shape: {}",
                format_json_parse_error(frame, &e)
            );
            Ok(None)
        }
    }
}

impl RequestEngine<'_> {
    /// Runs one streaming call, retries included.
    pub(crate) async fn execute_stream<F>(
        &self,
        url: &str,
        request: &GenerateContentRequest,
        sink: &mut F,
    ) -> GenerationResult
    where
        F: FnMut(&str) + Send + ?Sized,
    {
        let body = match serde_json::to_string(request) {
            Ok(body) => body,
            Err(e) => return GenerationResult::from_error(&GenaiError::Json(e)),
        };

        let mut state = RetryState::new();
        loop {
            let request_id = loud_wire::next_request_id();
            loud_wire::log_request(request_id, url, &body);
            debug!(attempt = state.attempt(), "Sending streamGenerateContent request");

            let mut accumulator = StreamAccumulator::new();
            let failure = match self
                .stream_attempt(url, &body, request_id, &mut accumulator, sink)
                .await
            {
                Ok(status) => return accumulator.into_result(status),
                Err(e) => e,
            };

            match state.next_delay(self.retry, &failure, accumulator.delivered()) {
                Some(delay) => {
                    warn!(
                        "Retryable stream error before any output (attempt {}/{}): {}. \
                         Waiting {:?} before retry.",
                        state.attempt(),
                        self.retry.max_retries,
                        failure,
                        delay
                    );
                    loud_wire::log_retry(request_id, state.attempt(), delay, &failure.to_string());
                    tokio::time::sleep(delay).await;
                }
                None if accumulator.delivered() => {
                    error!("Stream failed after partial output: {}", failure);
                    return GenerationResult::failure(
                        format!("Stream interrupted after partial output: {failure}"),
                        failure.status_code(),
                    );
                }
                None => return GenerationResult::from_error(&failure),
            }
        }
    }

    /// One connection: returns the HTTP status once the stream ends cleanly.
    async fn stream_attempt<F>(
        &self,
        url: &str,
        body: &str,
        request_id: usize,
        accumulator: &mut StreamAccumulator,
        sink: &mut F,
    ) -> Result<u16, GenaiError>
    where
        F: FnMut(&str) + Send + ?Sized,
    {
        let response = self.transport.post_stream(url, self.api_key, body).await?;
        let status = response.status;
        loud_wire::log_response_status(request_id, status);

        if !response.is_success() {
            let request_header_id = response.request_id.clone();
            let retry_after = response.retry_after;
            let error_body = response.read_to_string().await;
            loud_wire::log_response_body(request_id, &error_body);
            return Err(api_error(status, &error_body, request_header_id, retry_after));
        }

        let frames = parse_sse_frames(response.body);
        futures_util::pin_mut!(frames);

        while let Some(frame) = frames.next().await {
            let frame = frame?;
            loud_wire::log_sse_frame(request_id, &frame);
            if let Some(chunk) = decode_frame(&frame)? {
                accumulator.apply(chunk, sink);
            }
        }

        Ok(status)
    }
}
