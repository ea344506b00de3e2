//! The network collaborator.
//!
//! The engines only ever talk to a [`Transport`]: "POST JSON, get status and
//! body" and "POST JSON, get status and a byte stream". [`ReqwestTransport`]
//! is the production implementation; tests substitute scripted ones.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::Client as ReqwestClient;
use reqwest::header::CONTENT_TYPE;
use std::fmt;
use std::time::Duration;

use super::common::API_KEY_HEADER;
use super::error_helpers::{request_id_from_headers, retry_after_from_headers};
use crate::errors::GenaiError;

/// A fully-read response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub request_id: Option<String>,
    /// `Retry-After` header, if the server sent one.
    pub retry_after: Option<Duration>,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Byte chunks of a response body as they arrive.
pub type ByteStream = BoxStream<'static, Result<Bytes, GenaiError>>;

/// A response whose body is still arriving.
pub struct HttpStream {
    pub status: u16,
    pub request_id: Option<String>,
    pub retry_after: Option<Duration>,
    pub body: ByteStream,
}

impl HttpStream {
    #[must_use]
    pub fn new(status: u16, body: ByteStream) -> Self {
        Self {
            status,
            request_id: None,
            retry_after: None,
            body,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drains the body into a string, stopping at the first transport error.
    ///
    /// Used to read error bodies of failed streaming calls.
    pub async fn read_to_string(self) -> String {
        let mut bytes = Vec::new();
        let mut body = self.body;
        while let Some(Ok(chunk)) = body.next().await {
            bytes.extend_from_slice(&chunk);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl fmt::Debug for HttpStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpStream")
            .field("status", &self.status)
            .field("request_id", &self.request_id)
            .field("retry_after", &self.retry_after)
            .finish_non_exhaustive()
    }
}

/// Network capability consumed by the request and streaming engines.
///
/// Implementations return `Err` only when no HTTP response was obtained
/// (connection failure, timeout). Any HTTP status, including errors, is an
/// `Ok` response; classification happens in the engine.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// POSTs a JSON body and reads the whole response.
    async fn post_json(&self, url: &str, api_key: &str, body: &str)
    -> Result<HttpResponse, GenaiError>;

    /// POSTs a JSON body and returns as soon as response headers arrive.
    async fn post_stream(&self, url: &str, api_key: &str, body: &str)
    -> Result<HttpStream, GenaiError>;
}

/// [`Transport`] backed by `reqwest`.
///
/// The per-attempt timeout bounds the whole unary request, and the time to
/// response headers for streaming requests (a long stream is not cut off).
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
    timeout: Option<Duration>,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestTransport {
    /// A transport with reqwest defaults and no timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::from_client(ReqwestClient::new(), None)
    }

    /// Wraps an existing reqwest client.
    #[must_use]
    pub fn from_client(client: ReqwestClient, timeout: Option<Duration>) -> Self {
        Self { client, timeout }
    }

    /// Builds a transport with the given per-attempt and connect timeouts.
    pub fn with_timeouts(
        timeout: Option<Duration>,
        connect_timeout: Option<Duration>,
    ) -> Result<Self, GenaiError> {
        let mut builder = ReqwestClient::builder();
        if let Some(connect_timeout) = connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        let client = builder
            .build()
            .map_err(|e| GenaiError::ClientBuild(e.to_string()))?;
        Ok(Self::from_client(client, timeout))
    }

    fn request(&self, url: &str, api_key: &str, body: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
    }

    fn map_error(&self, error: reqwest::Error) -> GenaiError {
        match self.timeout {
            Some(timeout) if error.is_timeout() => GenaiError::Timeout(timeout),
            _ if error.is_builder() => {
                GenaiError::InvalidInput(format!("Could not build request: {error}"))
            }
            _ => GenaiError::Http(error),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: &str,
    ) -> Result<HttpResponse, GenaiError> {
        let mut request = self.request(url, api_key, body);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status().as_u16();
        let request_id = request_id_from_headers(response.headers());
        let retry_after = retry_after_from_headers(response.headers());
        let body = response.text().await.map_err(|e| self.map_error(e))?;

        Ok(HttpResponse {
            status,
            body,
            request_id,
            retry_after,
        })
    }

    async fn post_stream(
        &self,
        url: &str,
        api_key: &str,
        body: &str,
    ) -> Result<HttpStream, GenaiError> {
        let send = self.request(url, api_key, body).send();
        let response = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, send)
                .await
                .map_err(|_| GenaiError::Timeout(timeout))?,
            None => send.await,
        }
        .map_err(|e| self.map_error(e))?;

        let status = response.status().as_u16();
        let request_id = request_id_from_headers(response.headers());
        let retry_after = retry_after_from_headers(response.headers());
        let body = response.bytes_stream().map_err(GenaiError::Http).boxed();

        Ok(HttpStream {
            status,
            request_id,
            retry_after,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[test]
    fn test_http_response_success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(301, "").is_success());
        assert!(!HttpResponse::new(429, "").is_success());
    }

    #[test]
    fn test_http_response_retry_after() {
        let response = HttpResponse::new(429, "{}").with_retry_after(Duration::from_secs(3));
        assert_eq!(response.retry_after, Some(Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn test_read_to_string_stops_at_error() {
        let chunks = vec![
            Ok(Bytes::from_static(b"{\"error\":")),
            Ok(Bytes::from_static(b"{}}")),
            Err(GenaiError::Transport("reset".to_string())),
            Ok(Bytes::from_static(b"ignored")),
        ];
        let response = HttpStream::new(500, stream::iter(chunks).boxed());
        assert!(!response.is_success());
        assert_eq!(response.read_to_string().await, "{\"error\":{}}");
    }

    #[tokio::test]
    async fn test_invalid_url_is_invalid_input() {
        let transport = ReqwestTransport::with_timeouts(None, None).unwrap();
        let error = transport
            .post_json("not a url/v1beta/models/m:generateContent", "k", "{}")
            .await
            .unwrap_err();
        assert!(matches!(error, GenaiError::InvalidInput(_)), "{error:?}");
        assert!(!error.is_retryable());
        assert_eq!(error.status_code(), 0);
    }

    #[test]
    fn test_with_timeouts_builds() {
        let transport = ReqwestTransport::with_timeouts(
            Some(Duration::from_secs(5)),
            Some(Duration::from_secs(1)),
        )
        .unwrap();
        assert_eq!(transport.timeout, Some(Duration::from_secs(5)));
    }
}
