//! Multi-turn conversations.
//!
//! A [`ChatSession`] keeps the conversation history and per-session settings
//! behind one mutex. Each `send`/`stream` appends the user turn and
//! snapshots everything it needs in a single critical section, then releases
//! the lock for the network call. The model turn is appended only when the
//! call succeeds, so a failed call leaves the user turn without a reply.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;
use uuid::Uuid;

use crate::client::Client;
use crate::content::Content;
use crate::payload::PayloadBuilder;
use crate::request::{GenerateContentRequest, GenerationConfig};
use crate::response::GenerationResult;
use crate::safety::SafetySetting;
use crate::tools::{Tool, ToolConfig};

#[derive(Debug, Clone)]
struct SessionState {
    model: String,
    system_instruction: Option<String>,
    history: Vec<Content>,
    tools: Vec<Tool>,
    tool_config: Option<ToolConfig>,
    safety_settings: Vec<SafetySetting>,
    generation_config: GenerationConfig,
    cached_content: Option<String>,
}

impl SessionState {
    fn request(&self) -> GenerateContentRequest {
        let mut payload = PayloadBuilder::new(self.history.clone())
            .with_generation_config(self.generation_config.clone())
            .with_safety_settings(self.safety_settings.clone())
            .with_tools(self.tools.clone());
        if let Some(instruction) = &self.system_instruction {
            payload = payload.with_system_instruction(instruction.clone());
        }
        if let Some(config) = &self.tool_config {
            payload = payload.with_tool_config(config.clone());
        }
        if let Some(name) = &self.cached_content {
            payload = payload.with_cached_content(name.clone());
        }
        payload.build()
    }
}

/// A conversation with one model.
///
/// Safe to share between tasks (e.g. behind an `Arc`). Concurrent sends each
/// see a consistent history that includes their own user turn.
///
/// # Example
///
/// ```no_run
/// # use genai_engine::Client;
/// # #[tokio::main]
/// # async fn main() {
/// let client = Client::new("api_key");
/// let chat = client.start_chat_with_system("gemini-2.5-flash", "You are a pirate.");
///
/// let first = chat.send("Hello!").await;
/// println!("{}", first.text());
///
/// let second = chat.stream("Tell me more", |t| print!("{t}")).await;
/// assert_eq!(chat.history().len(), 4);
/// # let _ = second;
/// # }
/// ```
#[derive(Debug)]
pub struct ChatSession {
    client: Client,
    id: String,
    name: Option<String>,
    state: Mutex<SessionState>,
}

impl ChatSession {
    pub(crate) fn new(
        client: Client,
        model: impl Into<String>,
        system_instruction: Option<String>,
    ) -> Self {
        Self {
            client,
            id: Uuid::new_v4().to_string(),
            name: None,
            state: Mutex::new(SessionState {
                model: model.into(),
                system_instruction,
                history: Vec::new(),
                tools: Vec::new(),
                tool_config: None,
                safety_settings: Vec::new(),
                generation_config: GenerationConfig::default(),
                cached_content: None,
            }),
        }
    }

    /// Attaches a display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends the user turn and snapshots the request in one critical section.
    fn begin_turn(&self, content: Content) -> (String, GenerateContentRequest) {
        let (model, snapshot) = {
            let mut state = self.state();
            state.history.push(content);
            (state.model.clone(), state.clone())
        };
        (model, snapshot.request())
    }

    fn finish_turn(&self, result: &GenerationResult) {
        if result.is_success() {
            self.state().history.push(result.content().clone());
        } else {
            debug!(
                session = %self.id,
                "Turn failed, model reply not recorded: {}",
                result.error_message()
            );
        }
    }

    /// Sends a message and waits for the whole reply.
    pub async fn send(&self, content: impl Into<Content>) -> GenerationResult {
        let (model, request) = self.begin_turn(content.into());
        let result = self.client.generate_content(&model, &request).await;
        self.finish_turn(&result);
        result
    }

    /// Sends a message and streams the reply text to `sink`.
    ///
    /// On success the accumulated text is recorded as the model turn.
    pub async fn stream<F>(&self, content: impl Into<Content>, sink: F) -> GenerationResult
    where
        F: FnMut(&str) + Send,
    {
        let (model, request) = self.begin_turn(content.into());
        let result = self
            .client
            .stream_generate_content(&model, &request, sink)
            .await;
        self.finish_turn(&result);
        result
    }

    /// Session identity (UUID v4).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn model(&self) -> String {
        self.state().model.clone()
    }

    #[must_use]
    pub fn system_instruction(&self) -> Option<String> {
        self.state().system_instruction.clone()
    }

    /// A snapshot of the conversation so far.
    #[must_use]
    pub fn history(&self) -> Vec<Content> {
        self.state().history.clone()
    }

    #[must_use]
    pub fn tools(&self) -> Vec<Tool> {
        self.state().tools.clone()
    }

    #[must_use]
    pub fn safety_settings(&self) -> Vec<SafetySetting> {
        self.state().safety_settings.clone()
    }

    #[must_use]
    pub fn generation_config(&self) -> GenerationConfig {
        self.state().generation_config.clone()
    }

    #[must_use]
    pub fn cached_content(&self) -> Option<String> {
        self.state().cached_content.clone()
    }

    /// Switches models; history is kept.
    pub fn change_model(&self, model: impl Into<String>) {
        let model = model.into();
        debug!(session = %self.id, %model, "Changing model");
        self.state().model = model;
    }

    /// Replaces the system instruction. An empty string removes it.
    pub fn change_system_instruction(&self, instruction: impl Into<String>) {
        let instruction = instruction.into();
        self.state().system_instruction = (!instruction.is_empty()).then_some(instruction);
    }

    pub fn clear_history(&self) {
        let removed = std::mem::take(&mut self.state().history).len();
        debug!(session = %self.id, removed, "Cleared history");
    }

    pub fn add_tool(&self, tool: Tool) {
        self.state().tools.push(tool);
    }

    pub fn set_tools(&self, tools: Vec<Tool>) {
        self.state().tools = tools;
    }

    /// Removes all tools and the tool config.
    pub fn clear_tools(&self) {
        let mut state = self.state();
        state.tools.clear();
        state.tool_config = None;
    }

    pub fn set_tool_config(&self, config: ToolConfig) {
        self.state().tool_config = Some(config);
    }

    pub fn set_safety_settings(&self, settings: Vec<SafetySetting>) {
        self.state().safety_settings = settings;
    }

    pub fn add_safety_setting(&self, setting: SafetySetting) {
        self.state().safety_settings.push(setting);
    }

    pub fn clear_safety_settings(&self) {
        self.state().safety_settings.clear();
    }

    pub fn set_generation_config(&self, config: GenerationConfig) {
        self.state().generation_config = config;
    }

    /// Sets or clears the cached-content reference used by later turns.
    pub fn set_cached_content(&self, name: Option<String>) {
        self.state().cached_content = name;
    }
}
