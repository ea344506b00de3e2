//! # genai-engine
//!
//! A client engine for Gemini-style `generateContent` and
//! `streamGenerateContent` APIs.
//!
//! - **Content model**: [`Content`] turns made of typed [`Part`]s that
//!   round-trip through the wire JSON, unknown shapes included.
//! - **Unary calls** with exponential backoff on rate limits, server errors
//!   and transport failures ([`RetryConfig`]).
//! - **Streaming calls** over server-sent events, delivering text fragments
//!   to a caller-supplied sink as they arrive. A stream is only retried before
//!   its first fragment.
//! - **Chat sessions** ([`ChatSession`]) that keep history consistent under
//!   concurrent use.
//!
//! Every call resolves to a [`GenerationResult`]; errors are reported in it
//! rather than returned or raised.
//!
//! ## Quick start
//!
//! ```no_run
//! use genai_engine::Client;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let client = Client::new(std::env::var("GEMINI_API_KEY").unwrap());
//!
//! let result = client.generate_text("gemini-2.5-flash", "Say hello").await;
//! if result.is_success() {
//!     println!("{}", result.text());
//! }
//!
//! let chat = client.start_chat("gemini-2.5-flash");
//! chat.stream("Write a haiku about Rust", |fragment| print!("{fragment}"))
//!     .await;
//! # }
//! ```
//!
//! ## Debugging
//!
//! Set `LOUD_WIRE=1` to pretty-print every request, response and stream
//! frame to stderr. Structured logs go through `tracing`.

mod wire_enum;

mod chat;
mod client;
mod content;
mod engine;
mod errors;
mod http;
mod payload;
mod request;
mod request_builder;
mod response;
mod retry;
mod safety;
mod streaming;
mod tools;


pub use chat::ChatSession;
pub use client::{API_KEY_ENV_VAR, Client, ClientBuilder};
pub use content::{
    Blob, CodeExecutionResult, Content, ExecutableCode, FileData, FunctionCall, FunctionResponse,
    Language, Outcome, Part, PartData, Role, Scheduling,
};
pub use errors::GenaiError;
pub use http::common::{
    API_KEY_HEADER, ApiVersion, cached_content_resource_name, model_resource_name,
};
pub use http::sse_parser::{DEFAULT_BUFFER_CEILING, SseFrameDecoder};
pub use http::transport::{ByteStream, HttpResponse, HttpStream, ReqwestTransport, Transport};
pub use payload::PayloadBuilder;
pub use request::{
    GenerateContentRequest, GenerationConfig, MediaResolution, ThinkingConfig, ThinkingLevel,
};
pub use request_builder::{DEFAULT_MODEL, RequestBuilder};
pub use response::{
    Candidate, FinishReason, GenerateContentResponse, GenerationResult, GroundingMetadata,
    PromptFeedback, UsageMetadata,
};
pub use retry::{MAX_JITTER, RetryConfig, RetryState};
pub use safety::{
    BlockReason, HarmBlockThreshold, HarmCategory, HarmProbability, SafetyRating, SafetySetting,
};
pub use streaming::StreamAccumulator;
pub use tools::{
    CodeExecution, FunctionCallingConfig, FunctionCallingMode, FunctionDeclaration, GoogleSearch,
    Tool, ToolConfig,
};
