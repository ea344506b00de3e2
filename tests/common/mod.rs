//! Common test utilities shared across integration test files.
//!
//! Usage in test files:
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! Most tests drive the engine through [`MockTransport`], which replays a
//! script of responses and records every request it receives. Live tests use
//! [`get_client`] and are `#[ignore]`d.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use genai_engine::{
    Client, GenaiError, HttpResponse, HttpStream, RetryConfig, Transport,
};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::env;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Creates a client from the GEMINI_API_KEY environment variable.
/// Returns None if the API key is not set.
pub fn get_client() -> Option<Client> {
    Client::from_env().ok()
}

/// Default timeout for live tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Model used by live tests.
pub const TEST_MODEL: &str = "gemini-2.5-flash";

/// Wraps a future with a timeout, panicking if the timeout is exceeded.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .unwrap_or_else(|_| panic!("Test timed out after {duration:?}"))
}

// =============================================================================
// Scripted transport
// =============================================================================

/// One piece of a scripted streaming body.
#[derive(Debug, Clone)]
pub enum Chunk {
    Bytes(Vec<u8>),
    /// The connection drops with this message.
    Error(String),
}

impl Chunk {
    pub fn text(s: &str) -> Self {
        Chunk::Bytes(s.as_bytes().to_vec())
    }
}

/// One scripted reply, consumed by the next request.
#[derive(Debug, Clone)]
pub enum Reply {
    Response(HttpResponse),
    Stream {
        status: u16,
        retry_after: Option<Duration>,
        chunks: Vec<Chunk>,
    },
    /// No HTTP response at all.
    TransportError(String),
    /// Waits (in tokio time) before producing the inner reply.
    Delayed(Duration, Box<Reply>),
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Reply::Response(HttpResponse::new(200, body))
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Reply::Response(HttpResponse::new(status, body))
    }

    pub fn stream(chunks: Vec<Chunk>) -> Self {
        Reply::Stream {
            status: 200,
            retry_after: None,
            chunks,
        }
    }

    pub fn delayed(self, delay: Duration) -> Self {
        Reply::Delayed(delay, Box::new(self))
    }
}

/// A request the mock received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub api_key: String,
    pub body: Value,
    /// Tokio time at which the request arrived.
    pub at: tokio::time::Instant,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }

    fn record(&self, url: &str, api_key: &str, body: &str) -> Reply {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            api_key: api_key.to_string(),
            body: serde_json::from_str(body).expect("engine sent invalid JSON"),
            at: tokio::time::Instant::now(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::TransportError("no scripted reply left".to_string()))
    }
}

async fn resolve(mut reply: Reply) -> Reply {
    loop {
        match reply {
            Reply::Delayed(delay, inner) => {
                tokio::time::sleep(delay).await;
                reply = *inner;
            }
            other => return other,
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: &str,
    ) -> Result<HttpResponse, GenaiError> {
        let reply = self.record(url, api_key, body);
        match resolve(reply).await {
            Reply::Response(response) => Ok(response),
            Reply::TransportError(message) => Err(GenaiError::Transport(message)),
            other => panic!("unary call got a streaming reply: {other:?}"),
        }
    }

    async fn post_stream(
        &self,
        url: &str,
        api_key: &str,
        body: &str,
    ) -> Result<HttpStream, GenaiError> {
        let reply = self.record(url, api_key, body);
        match resolve(reply).await {
            Reply::Stream {
                status,
                retry_after,
                chunks,
            } => {
                let items = chunks.into_iter().map(|chunk| match chunk {
                    Chunk::Bytes(bytes) => Ok(Bytes::from(bytes)),
                    Chunk::Error(message) => Err(GenaiError::Transport(message)),
                });
                let mut stream = HttpStream::new(status, futures_util::stream::iter(items).boxed());
                stream.retry_after = retry_after;
                Ok(stream)
            }
            Reply::Response(response) => {
                let body = Bytes::from(response.body.into_bytes());
                let mut stream = HttpStream::new(
                    response.status,
                    futures_util::stream::once(async move { Ok(body) }).boxed(),
                );
                stream.retry_after = response.retry_after;
                Ok(stream)
            }
            Reply::TransportError(message) => Err(GenaiError::Transport(message)),
            Reply::Delayed(..) => unreachable!("resolved above"),
        }
    }
}

/// A client wired to `transport`, with deterministic backoff.
pub fn mock_client(transport: Arc<MockTransport>) -> Client {
    mock_client_with_retry(transport, RetryConfig::default().with_jitter(false))
}

pub fn mock_client_with_retry(transport: Arc<MockTransport>, retry: RetryConfig) -> Client {
    Client::builder("test-key")
        .base_url("http://mock.local")
        .retry_config(retry)
        .transport(transport)
        .build()
        .expect("client should build")
}

// =============================================================================
// Response fixtures
// =============================================================================

/// A one-candidate response body holding `text`.
pub fn text_response(text: &str) -> String {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP",
        }],
        "usageMetadata": {
            "promptTokenCount": 5,
            "candidatesTokenCount": 7,
            "totalTokenCount": 12,
        },
    })
    .to_string()
}

/// An API error body in the service's format.
pub fn error_body(code: u16, message: &str, status: &str) -> String {
    json!({"error": {"code": code, "message": message, "status": status}}).to_string()
}

/// One streamed frame carrying `text`, including the blank-line terminator.
pub fn text_frame(text: &str) -> String {
    let chunk = json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}],
    });
    format!("data: {chunk}\n\n")
}

/// The final streamed frame: finish reason and usage, no text.
pub fn final_frame(prompt_tokens: u32, output_tokens: u32) -> String {
    let chunk = json!({
        "candidates": [{"content": {"role": "model", "parts": []}, "finishReason": "STOP"}],
        "usageMetadata": {
            "promptTokenCount": prompt_tokens,
            "candidatesTokenCount": output_tokens,
            "totalTokenCount": prompt_tokens + output_tokens,
        },
    });
    format!("data: {chunk}\n\n")
}
