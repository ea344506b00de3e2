use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::chat::ChatSession;
use crate::content::Content;
use crate::engine::RequestEngine;
use crate::errors::GenaiError;
use crate::http::common::{ApiVersion, DEFAULT_BASE_URL, Endpoint, construct_endpoint_url};
use crate::http::transport::{ReqwestTransport, Transport};
use crate::request::GenerateContentRequest;
use crate::request_builder::RequestBuilder;
use crate::response::GenerationResult;
use crate::retry::RetryConfig;

/// Environment variable read by [`Client::from_env`].
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

/// The entry point for generation calls.
///
/// Cheap to clone: the transport is shared. Every call returns a
/// [`GenerationResult`]; failures are reported in it, never as a panic or `Err`.
#[derive(Clone)]
pub struct Client {
    api_key: String,
    base_url: String,
    api_version: ApiVersion,
    retry: RetryConfig,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("retry", &self.retry)
            .field("transport", &self.transport)
            .finish()
    }
}

/// Builder for `Client` instances.
///
/// # Example
///
/// ```
/// use genai_engine::{Client, RetryConfig};
/// use std::time::Duration;
///
/// let client = Client::builder("api_key")
///     .timeout(Duration::from_secs(120))
///     .connect_timeout(Duration::from_secs(10))
///     .retry_config(RetryConfig::default().with_max_retries(5))
///     .build()
///     .unwrap();
/// ```
pub struct ClientBuilder {
    api_key: String,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    base_url: String,
    api_version: ApiVersion,
    retry: RetryConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    /// Sets the per-attempt request timeout.
    ///
    /// Bounds each unary attempt end to end, and each streaming attempt up to
    /// the response headers. A timed-out attempt is retried like any other
    /// transport failure.
    ///
    /// If not set, there is no timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Overrides the service root, e.g. for a proxy or a local mock server.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub const fn api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    #[must_use]
    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Uses a custom transport instead of the reqwest one.
    ///
    /// Timeouts set on this builder do not apply to a custom transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the `Client`.
    ///
    /// # Errors
    ///
    /// Returns [`GenaiError::ClientBuild`] if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<Client, GenaiError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::with_timeouts(
                self.timeout,
                self.connect_timeout,
            )?),
        };

        Ok(Client {
            api_key: self.api_key,
            base_url: self.base_url,
            api_version: self.api_version,
            retry: self.retry,
            transport,
        })
    }
}

impl Client {
    /// Creates a new builder for `Client` instances.
    #[must_use]
    pub fn builder(api_key: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            api_key: api_key.into(),
            timeout: None,
            connect_timeout: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: ApiVersion::default(),
            retry: RetryConfig::default(),
            transport: None,
        }
    }

    /// Creates a client with default settings.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: ApiVersion::default(),
            retry: RetryConfig::default(),
            transport: Arc::new(ReqwestTransport::new()),
        }
    }

    /// Creates a client from the `GEMINI_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`GenaiError::InvalidInput`] if the variable is unset or empty.
    pub fn from_env() -> Result<Self, GenaiError> {
        match std::env::var(API_KEY_ENV_VAR) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key)),
            _ => Err(GenaiError::InvalidInput(format!(
                "{API_KEY_ENV_VAR} is not set"
            ))),
        }
    }

    #[must_use]
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    fn engine(&self) -> RequestEngine<'_> {
        RequestEngine {
            transport: self.transport.as_ref(),
            api_key: &self.api_key,
            retry: &self.retry,
        }
    }

    fn url(&self, endpoint: Endpoint) -> String {
        construct_endpoint_url(&self.base_url, self.api_version, endpoint)
    }

    /// Sends one unary `generateContent` call, retrying transient failures.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use genai_engine::{Client, Content, PayloadBuilder};
    /// # #[tokio::main]
    /// # async fn main() {
    /// let client = Client::new("api_key");
    /// let request = PayloadBuilder::new(vec![Content::user_text("Hello!")]).build();
    /// let result = client.generate_content("gemini-2.5-flash", &request).await;
    /// if result.is_success() {
    ///     println!("{}", result.text());
    /// } else {
    ///     eprintln!("{} ({})", result.error_message(), result.status_code());
    /// }
    /// # }
    /// ```
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> GenerationResult {
        if model.trim().is_empty() {
            return GenerationResult::from_error(&GenaiError::InvalidInput(
                "model name is empty".to_string(),
            ));
        }
        let url = self.url(Endpoint::GenerateContent { model });
        self.engine().execute(&url, request).await
    }

    /// Sends one `streamGenerateContent` call, passing text fragments to `sink`
    /// in arrival order.
    ///
    /// Transient failures are retried only until the first fragment has been
    /// delivered; after that, a failure ends the call.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use genai_engine::{Client, Content, PayloadBuilder};
    /// # #[tokio::main]
    /// # async fn main() {
    /// let client = Client::new("api_key");
    /// let request = PayloadBuilder::new(vec![Content::user_text("Tell me a story")]).build();
    /// let result = client
    ///     .stream_generate_content("gemini-2.5-flash", &request, |fragment| print!("{fragment}"))
    ///     .await;
    /// println!("\n[{} tokens]", result.total_tokens());
    /// # }
    /// ```
    pub async fn stream_generate_content<F>(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        mut sink: F,
    ) -> GenerationResult
    where
        F: FnMut(&str) + Send,
    {
        if model.trim().is_empty() {
            return GenerationResult::from_error(&GenaiError::InvalidInput(
                "model name is empty".to_string(),
            ));
        }
        let url = self.url(Endpoint::StreamGenerateContent { model });
        self.engine().execute_stream(&url, request, &mut sink).await
    }

    /// One-shot text prompt.
    pub async fn generate_text(&self, model: &str, prompt: &str) -> GenerationResult {
        let request = GenerateContentRequest {
            contents: vec![Content::user_text(prompt)],
            ..GenerateContentRequest::default()
        };
        self.generate_content(model, &request).await
    }

    /// One-shot streamed text prompt.
    pub async fn stream_text<F>(&self, model: &str, prompt: &str, sink: F) -> GenerationResult
    where
        F: FnMut(&str) + Send,
    {
        let request = GenerateContentRequest {
            contents: vec![Content::user_text(prompt)],
            ..GenerateContentRequest::default()
        };
        self.stream_generate_content(model, &request, sink).await
    }

    /// Starts a fluent single-request builder.
    ///
    /// ```no_run
    /// # use genai_engine::Client;
    /// # #[tokio::main]
    /// # async fn main() {
    /// let client = Client::new("api_key");
    /// let result = client
    ///     .request()
    ///     .with_model("gemini-2.5-flash")
    ///     .with_system_instruction("Answer in one word.")
    ///     .with_text("What colour is the sky?")
    ///     .with_temperature(0.2)
    ///     .generate()
    ///     .await;
    /// # }
    /// ```
    #[must_use]
    pub fn request(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(self)
    }

    /// Starts a chat session on `model`.
    #[must_use]
    pub fn start_chat(&self, model: impl Into<String>) -> ChatSession {
        ChatSession::new(self.clone(), model, None)
    }

    /// Starts a chat session on `model` with a system instruction.
    #[must_use]
    pub fn start_chat_with_system(
        &self,
        model: impl Into<String>,
        system_instruction: impl Into<String>,
    ) -> ChatSession {
        ChatSession::new(self.clone(), model, Some(system_instruction.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder_defaults() {
        let client = Client::builder("test_key").build().unwrap();
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
        assert_eq!(client.api_version(), ApiVersion::V1Beta);
        assert_eq!(client.retry_config(), &RetryConfig::default());
    }

    #[test]
    fn test_client_builder_with_timeouts() {
        let client = Client::builder("test_key")
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build();
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_builder_overrides() {
        let client = Client::builder("test_key")
            .base_url("http://localhost:9999")
            .api_version(ApiVersion::V1)
            .retry_config(RetryConfig::no_retry())
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:9999");
        assert_eq!(client.api_version(), ApiVersion::V1);
        assert_eq!(client.retry_config().max_retries, 0);
        assert_eq!(
            client.url(Endpoint::GenerateContent { model: "m" }),
            "http://localhost:9999/v1/models/m:generateContent"
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client = Client::new("super-secret-key");
        let debug = format!("{client:?}");
        assert!(!debug.contains("super-secret-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_empty_model_fails_without_network() {
        let client = Client::new("test_key");
        let result = client.generate_text("  ", "hello").await;
        assert!(!result.is_success());
        assert_eq!(result.status_code(), 0);
        assert!(result.error_message().contains("model name is empty"));
    }
}
