//! Error handling utilities for HTTP responses and error context formatting.

use reqwest::header::HeaderMap;
use serde_json::Value;
use std::time::Duration;

use crate::errors::GenaiError;

/// Maximum characters to include from error body in context messages
const ERROR_BODY_PREVIEW_LENGTH: usize = 200;

/// Google's request ID header name.
///
/// The value can be used when contacting Google support or correlating with server logs.
/// See: <https://cloud.google.com/apis/docs/system-parameters>
const REQUEST_ID_HEADER: &str = "x-goog-request-id";

const RETRY_AFTER_HEADER: &str = "retry-after";

/// Extracts the request ID header, if present.
pub(crate) fn request_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// Parses a `Retry-After` header given in (possibly fractional) seconds.
///
/// The HTTP-date form is not used by this API and is ignored.
pub(crate) fn retry_after_from_headers(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_seconds)
}

/// Hints that are negative, non-finite or too large for a `Duration` are dropped.
fn parse_seconds(raw: &str) -> Option<Duration> {
    let seconds: f64 = raw.trim().trim_end_matches('s').parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

/// Reads `error.details[].retryDelay` from a Google `RetryInfo` error body.
fn retry_delay_from_body(body: &Value) -> Option<Duration> {
    body.pointer("/error/details")?
        .as_array()?
        .iter()
        .filter(|detail| {
            detail
                .get("@type")
                .and_then(Value::as_str)
                .is_some_and(|t| t.ends_with("RetryInfo"))
        })
        .find_map(|detail| detail.get("retryDelay").and_then(Value::as_str))
        .and_then(parse_seconds)
}

/// Builds a structured [`GenaiError::Api`] from a failed response.
///
/// The message is `error.message` from the JSON body when present, otherwise
/// a truncated preview of the raw body (or the status's canonical reason
/// when the body is empty). A `Retry-After` header wins over a body hint.
pub(crate) fn api_error(
    status_code: u16,
    body: &str,
    request_id: Option<String>,
    header_retry_after: Option<Duration>,
) -> GenaiError {
    let parsed = serde_json::from_str::<Value>(body).ok();

    let message = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                reqwest::StatusCode::from_u16(status_code)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                truncate_for_context(body, ERROR_BODY_PREVIEW_LENGTH)
            }
        });

    let retry_after =
        header_retry_after.or_else(|| parsed.as_ref().and_then(retry_delay_from_body));

    GenaiError::Api {
        status_code,
        message,
        request_id,
        retry_after,
    }
}

/// Formats JSON parsing context by including a preview of the raw JSON.
pub(crate) fn format_json_parse_error(json_str: &str, error: &serde_json::Error) -> String {
    let preview = truncate_for_context(json_str, ERROR_BODY_PREVIEW_LENGTH);
    format!("JSON parse error: {} | Context: {}", error, preview)
}

/// Truncates a string to specified length, adding "..." if truncated.
///
/// Uses character-boundary-aware slicing to prevent panics on multi-byte UTF-8 characters.
pub(crate) fn truncate_for_context(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let truncate_at = s
            .char_indices()
            .take_while(|(i, c)| i + c.len_utf8() <= max_len)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &s[..truncate_at])
    }
}
