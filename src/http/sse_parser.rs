//! Server-sent-events framing.
//!
//! [`SseFrameDecoder`] is a pure incremental parser: it is fed raw byte
//! chunks as they arrive and hands back every complete `data:` payload. It
//! holds no connection state, so it can be driven directly in tests.
//! [`parse_sse_frames`] wraps it around a live byte stream.

use async_stream::try_stream;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use crate::errors::GenaiError;

const DATA_MARKER: &[u8] = b"data:";
const LF_TERMINATOR: &[u8] = b"\n\n";
const CRLF_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Bytes the buffer may hold without a `data:` marker before it is discarded.
pub const DEFAULT_BUFFER_CEILING: usize = 64 * 1024;

/// Incremental SSE frame extractor.
///
/// Bytes are appended to an internal buffer. Each call to [`push`](Self::push)
/// extracts every event that starts with a `data:` marker and is closed by
/// a blank line (`\n\n` or `\r\n\r\n`, whichever comes first). Incomplete
/// events stay buffered until more bytes arrive. Anything before a `data:`
/// marker (comments, `event:` lines, keep-alives) is dropped with the frame.
#[derive(Debug)]
pub struct SseFrameDecoder {
    buffer: Vec<u8>,
    ceiling: usize,
}

impl Default for SseFrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SseFrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_ceiling(DEFAULT_BUFFER_CEILING)
    }

    /// Uses a custom ceiling for marker-less buffered bytes.
    #[must_use]
    pub fn with_ceiling(ceiling: usize) -> Self {
        Self {
            buffer: Vec::new(),
            ceiling,
        }
    }

    /// Number of bytes currently buffered.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Appends `chunk` and returns the payloads of all frames it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            let Some(start) = find(&self.buffer, DATA_MARKER) else {
                self.enforce_ceiling();
                break;
            };
            let Some((end, terminator_len)) = find_terminator(&self.buffer[start..]) else {
                break;
            };

            if let Some(payload) = extract_payload(&self.buffer[start..start + end]) {
                frames.push(payload);
            }
            self.buffer.drain(..start + end + terminator_len);
        }

        frames
    }

    /// Flushes a trailing `data:` event that the stream closed without a blank line.
    pub fn finish(&mut self) -> Option<String> {
        let payload = find(&self.buffer, DATA_MARKER)
            .and_then(|start| extract_payload(&self.buffer[start..]));
        self.buffer.clear();
        payload
    }

    fn enforce_ceiling(&mut self) {
        if self.buffer.len() <= self.ceiling {
            return;
        }
        tracing::warn!(
            "Discarding {} buffered SSE bytes with no data: marker",
            self.buffer.len()
        );
        // Keep a possible marker prefix split across the chunk boundary.
        let keep = DATA_MARKER.len() - 1;
        let cut = self.buffer.len() - keep;
        self.buffer.drain(..cut);
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Position and length of the earliest event terminator.
fn find_terminator(event: &[u8]) -> Option<(usize, usize)> {
    let lf = find(event, LF_TERMINATOR).map(|pos| (pos, LF_TERMINATOR.len()));
    let crlf = find(event, CRLF_TERMINATOR).map(|pos| (pos, CRLF_TERMINATOR.len()));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Joins the `data:` lines of one event. Returns `None` for an empty payload.
fn extract_payload(event: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(event);
    let payload = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect::<Vec<_>>()
        .join("\n");
    let payload = payload.trim();
    (!payload.is_empty()).then(|| payload.to_string())
}

/// Turns a raw byte stream into a stream of frame payloads.
///
/// Transport errors are forwarded as `Err` items and end the stream.
pub(crate) fn parse_sse_frames<S>(
    byte_stream: S,
) -> impl Stream<Item = Result<String, GenaiError>> + Send
where
    S: Stream<Item = Result<Bytes, GenaiError>> + Send,
{
    try_stream! {
        futures_util::pin_mut!(byte_stream);
        let mut decoder = SseFrameDecoder::new();

        while let Some(chunk_result) = byte_stream.next().await {
            let chunk: Bytes = chunk_result?;
            for frame in decoder.push(&chunk) {
                yield frame;
            }
        }

        if let Some(frame) = decoder.finish() {
            yield frame;
        }
    }
}
