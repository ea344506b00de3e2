use std::time::Duration;
use thiserror::Error;

/// Errors produced inside the engine.
///
/// Public entry points never return these directly: the request and
/// streaming engines fold every failure into a
/// [`GenerationResult`](crate::GenerationResult). `GenaiError` is what the
/// [`Transport`](crate::Transport) seam and the lower layers speak, and what
/// the retry policy classifies.
///
/// # Example: Classifying a failure
///
/// ```rust
/// use genai_engine::GenaiError;
/// use std::time::Duration;
///
/// let rate_limited = GenaiError::Api {
///     status_code: 429,
///     message: "Resource exhausted".to_string(),
///     request_id: None,
///     retry_after: Some(Duration::from_secs(7)),
/// };
/// assert!(rate_limited.is_retryable());
/// assert_eq!(rate_limited.retry_after(), Some(Duration::from_secs(7)));
/// assert_eq!(rate_limited.status_code(), 429);
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenaiError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    /// Connection-level failure reported by a non-reqwest transport.
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// API error with structured context for debugging and retry decisions.
    #[error("API error (HTTP {status_code}): {message}")]
    Api {
        /// HTTP status code (e.g., 400, 429, 500)
        status_code: u16,
        /// Error message from the API response body
        message: String,
        /// Request ID from `x-goog-request-id` header, if available
        request_id: Option<String>,
        /// Server-supplied retry hint (`Retry-After` header or `RetryInfo` detail)
        retry_after: Option<Duration>,
    },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The service answered with a success status but the body did not
    /// match the expected schema.
    #[error("Malformed API response: {0}")]
    MalformedResponse(String),
    /// A single attempt exceeded the transport's per-request timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Failed to build the HTTP client.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl GenaiError {
    /// Returns `true` if this error is likely transient and the request may succeed on retry.
    ///
    /// - **Transport errors**: connection resets, DNS, TLS (not malformed
    ///   requests or redirect loops)
    /// - **Timeouts**
    /// - **Rate limits (429)** and **server errors (5xx)**
    ///
    /// Everything else (4xx, decode failures, invalid input) is permanent.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            GenaiError::Http(e) => !(e.is_builder() || e.is_redirect() || e.is_status()),
            GenaiError::Transport(_) | GenaiError::Timeout(_) => true,

            GenaiError::Api { status_code, .. } => *status_code == 429 || *status_code >= 500,

            GenaiError::Json(_)
            | GenaiError::InvalidInput(_)
            | GenaiError::MalformedResponse(_)
            | GenaiError::ClientBuild(_) => false,
        }
    }

    /// Server-supplied delay hint, if the failed response carried one.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GenaiError::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status associated with this error, or `0` when no response was received.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            GenaiError::Api { status_code, .. } => *status_code,
            GenaiError::Http(e) => e.status().map_or(0, |s| s.as_u16()),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status_code: u16) -> GenaiError {
        GenaiError::Api {
            status_code,
            message: "error".to_string(),
            request_id: None,
            retry_after: None,
        }
    }

    #[test]
    fn test_genai_error_invalid_input_display() {
        let error = GenaiError::InvalidInput("model name is empty".to_string());
        let display = format!("{}", error);
        assert!(display.contains("Invalid input"));
        assert!(display.contains("model name is empty"));
    }

    #[test]
    fn test_genai_error_api_display() {
        let error = GenaiError::Api {
            status_code: 429,
            message: "Rate limited".to_string(),
            request_id: Some("req-123".to_string()),
            retry_after: None,
        };
        let display = format!("{}", error);
        assert!(display.contains("429"));
        assert!(display.contains("Rate limited"));
    }

    #[test]
    fn test_genai_error_json_from() {
        let json_err = serde_json::from_str::<serde_json::Value>("not valid json").unwrap_err();
        let genai_err: GenaiError = json_err.into();
        assert!(format!("{}", genai_err).contains("JSON deserialization error"));
    }

    #[test]
    fn test_genai_error_timeout_display() {
        let error = GenaiError::Timeout(Duration::from_secs(30));
        let display = format!("{}", error);
        assert!(display.contains("Request timed out"));
        assert!(display.contains("30s"));
    }

    #[test]
    fn test_genai_error_transport_display() {
        let error = GenaiError::Transport("connection reset by peer".to_string());
        assert!(format!("{}", error).contains("connection reset"));
    }

    #[test]
    fn test_is_retryable_rate_limit_and_server_errors() {
        for status_code in [429, 500, 502, 503, 504] {
            assert!(api(status_code).is_retryable(), "{status_code} should retry");
        }
    }

    #[test]
    fn test_is_retryable_client_errors_not_retryable() {
        for status_code in [400, 401, 403, 404, 422] {
            assert!(!api(status_code).is_retryable(), "{status_code} should not retry");
        }
    }

    #[test]
    fn test_is_retryable_transport_and_timeout() {
        assert!(GenaiError::Transport("refused".into()).is_retryable());
        assert!(GenaiError::Timeout(Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn test_is_retryable_decode_errors_not_retryable() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!GenaiError::Json(json_err).is_retryable());
        assert!(!GenaiError::MalformedResponse("no candidates".into()).is_retryable());
        assert!(!GenaiError::InvalidInput("empty".into()).is_retryable());
    }

    #[test]
    fn test_http_builder_errors_not_retryable() {
        let error = reqwest::Client::new()
            .post("not a url")
            .build()
            .unwrap_err();
        assert!(error.is_builder());
        assert!(!GenaiError::Http(error).is_retryable());
    }

    #[test]
    fn test_retry_after_only_on_api_errors() {
        let error = GenaiError::Api {
            status_code: 503,
            message: "busy".to_string(),
            request_id: None,
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(error.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(GenaiError::Timeout(Duration::from_secs(1)).retry_after(), None);
    }

    #[test]
    fn test_status_code_defaults_to_zero_without_response() {
        assert_eq!(api(404).status_code(), 404);
        assert_eq!(GenaiError::Transport("down".into()).status_code(), 0);
        assert_eq!(GenaiError::Timeout(Duration::from_secs(5)).status_code(), 0);
    }
}
