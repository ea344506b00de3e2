//! Wire-level debugging via the `LOUD_WIRE` environment variable.
//!
//! When `LOUD_WIRE` is set to any value, outgoing request bodies, response
//! statuses, response bodies, and individual SSE frames are pretty-printed
//! to stderr with colors:
//!
//! - Green `>>>` for outgoing requests
//! - Red `<<<` for incoming responses
//! - Blue `SSE` for stream frames
//! - Yellow `RETRY` for backoff decisions
//!
//! Base64 payloads and thought signatures are truncated to keep output
//! readable. The API key travels in a header and is never printed.

use colored::Colorize;
use serde_json::Value;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::error_helpers::truncate_for_context;

/// Request ID counter for correlating requests with responses
static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(1);

static ENABLED: OnceLock<bool> = OnceLock::new();

/// Check if LOUD_WIRE debugging is enabled.
///
/// Cached after the first check, so `LOUD_WIRE` must be set before the
/// first call is made.
#[must_use]
pub(crate) fn is_enabled() -> bool {
    *ENABLED.get_or_init(|| std::env::var("LOUD_WIRE").is_ok())
}

/// Get the next request ID for correlation.
#[must_use]
pub(crate) fn next_request_id() -> usize {
    REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Fields whose string values are truncated when long.
const TRUNCATE_FIELDS: &[&str] = &["data", "thoughtSignature"];

const TRUNCATE_THRESHOLD: usize = 100;

const RAW_BODY_PREVIEW: usize = 1000;

/// Walks the JSON tree and truncates long `data` / `thoughtSignature` strings.
fn truncate_long_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if TRUNCATE_FIELDS.contains(&key.as_str()) {
                    if let Value::String(s) = val
                        && s.len() > TRUNCATE_THRESHOLD
                    {
                        *s = truncate_for_context(s, TRUNCATE_THRESHOLD);
                    }
                } else {
                    truncate_long_fields(val);
                }
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(truncate_long_fields),
        _ => {}
    }
}

fn timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Log prefix with timestamp and request ID.
fn prefix(request_id: usize) -> String {
    format!(
        "{} {} {}",
        "[LOUD_WIRE]".bold(),
        timestamp().dimmed(),
        format!("[REQ#{}]", request_id).cyan()
    )
}

/// Prints a labelled body, pretty and colorized when it is JSON.
fn print_body(prefix: &str, label: &str, body: &str) {
    match serde_json::from_str::<Value>(body) {
        Ok(mut parsed) => {
            truncate_long_fields(&mut parsed);
            eprintln!("{prefix} {label}:");
            let rendered = colored_json::to_colored_json_auto(&parsed)
                .ok()
                .or_else(|| serde_json::to_string_pretty(&parsed).ok());
            if let Some(rendered) = rendered {
                for line in rendered.lines() {
                    eprintln!("{prefix} {line}");
                }
            }
        }
        Err(_) => {
            eprintln!(
                "{prefix} {label}: {}",
                truncate_for_context(body, RAW_BODY_PREVIEW)
            );
        }
    }
}

/// Log an outgoing HTTP request.
pub(crate) fn log_request(request_id: usize, url: &str, body: &str) {
    if !is_enabled() {
        return;
    }
    let prefix = prefix(request_id);
    eprintln!("{prefix} {} POST {url}", ">>>".green().bold());
    print_body(&prefix, &"Body".green().to_string(), body);
}

/// Log an incoming HTTP response status.
pub(crate) fn log_response_status(request_id: usize, status: u16) {
    if !is_enabled() {
        return;
    }
    let status_text = if status < 300 {
        format!("{status} OK").green()
    } else {
        format!("{status} ERROR").red()
    };
    eprintln!("{} {} {status_text}", prefix(request_id), "<<<".red().bold());
}

/// Log an incoming HTTP response body.
pub(crate) fn log_response_body(request_id: usize, body: &str) {
    if !is_enabled() {
        return;
    }
    print_body(&prefix(request_id), &"Response".red().to_string(), body);
}

/// Log one decoded SSE frame payload.
pub(crate) fn log_sse_frame(request_id: usize, raw_json: &str) {
    if !is_enabled() {
        return;
    }
    print_body(&prefix(request_id), &"SSE".blue().bold().to_string(), raw_json);
}

/// Log a backoff decision.
pub(crate) fn log_retry(request_id: usize, attempt: u32, delay: Duration, reason: &str) {
    if !is_enabled() {
        return;
    }
    eprintln!(
        "{} {} attempt {} in {:?}: {reason}",
        prefix(request_id),
        "RETRY".yellow().bold(),
        attempt + 1,
        delay
    );
}
