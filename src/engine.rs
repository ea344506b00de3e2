//! The retrying unary request path.
//!
//! Each call runs `ATTEMPT -> SUCCESS | RETRYABLE_FAILURE -> WAIT -> ATTEMPT | TERMINAL_FAILURE`.
//! Errors never escape: every path ends in a [`GenerationResult`].

use tracing::{debug, error, warn};

use crate::errors::GenaiError;
use crate::http::error_helpers::{api_error, format_json_parse_error};
use crate::http::loud_wire;
use crate::http::transport::Transport;
use crate::request::GenerateContentRequest;
use crate::response::{GenerateContentResponse, GenerationResult};
use crate::retry::{RetryConfig, RetryState};

/// Borrowed view of a client's call machinery, alive for one call.
pub(crate) struct RequestEngine<'a> {
    pub(crate) transport: &'a dyn Transport,
    pub(crate) api_key: &'a str,
    pub(crate) retry: &'a RetryConfig,
}

impl RequestEngine<'_> {
    /// Runs one unary call, retries included.
    pub(crate) async fn execute(
        &self,
        url: &str,
        request: &GenerateContentRequest,
    ) -> GenerationResult {
        let body = match serde_json::to_string(request) {
            Ok(body) => body,
            Err(e) => return GenerationResult::from_error(&GenaiError::Json(e)),
        };

        let mut state = RetryState::new();
        loop {
            let request_id = loud_wire::next_request_id();
            loud_wire::log_request(request_id, url, &body);
            debug!(attempt = state.attempt(), "Sending generateContent request");

            let failure = match self.transport.post_json(url, self.api_key, &body).await {
                Ok(response) => {
                    loud_wire::log_response_status(request_id, response.status);
                    loud_wire::log_response_body(request_id, &response.body);
                    if response.is_success() {
                        return decode_response(response.status, &response.body);
                    }
                    api_error(
                        response.status,
                        &response.body,
                        response.request_id,
                        response.retry_after,
                    )
                }
                Err(e) => e,
            };

            match state.next_delay(self.retry, &failure, false) {
                Some(delay) => {
                    warn!(
                        "Retryable error (attempt {}/{}): {}. Waiting {:?} before retry.",
                        state.attempt(),
                        self.retry.max_retries,
                        failure,
                        delay
                    );
                    loud_wire::log_retry(request_id, state.attempt(), delay, &failure.to_string());
                    tokio::time::sleep(delay).await;
                }
                None => {
                    if state.attempt() > 0 {
                        error!(
                            "Request failed after {} retries: {}",
                            state.attempt(),
                            failure
                        );
                    }
                    return GenerationResult::from_error(&failure);
                }
            }
        }
    }
}

/// Parses a success-status body. Malformed JSON is a terminal failure.
fn decode_response(status: u16, body: &str) -> GenerationResult {
    match serde_json::from_str::<GenerateContentResponse>(body) {
        Ok(response) => GenerationResult::from_response(status, response),
        Err(e) => {
            let context = format_json_parse_error(body, &e);
            warn!("Failed to decode generateContent response: {}", context);
            GenerationResult::failure(format!("Response parse error: {context}"), status)
        }
    }
}
