use serde_json::Value;

use crate::client::Client;
use crate::content::{Content, Part};
use crate::errors::GenaiError;
use crate::payload::PayloadBuilder;
use crate::request::{GenerateContentRequest, GenerationConfig, ThinkingLevel};
use crate::response::GenerationResult;
use crate::safety::SafetySetting;
use crate::tools::{Tool, ToolConfig};

/// Model used when a [`RequestBuilder`] is not given one.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Builder for a single generation request.
///
/// Parts added with the `with_text`/`with_part` family form one user turn.
#[derive(Debug)]
pub struct RequestBuilder<'a> {
    client: &'a Client,
    model: String,
    parts: Vec<Part>,
    system_instruction: Option<String>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
    tools: Vec<Tool>,
    tool_config: Option<ToolConfig>,
    cached_content: Option<String>,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
            parts: Vec::new(),
            system_instruction: None,
            generation_config: GenerationConfig::default(),
            safety_settings: Vec::new(),
            tools: Vec::new(),
            tool_config: None,
            cached_content: None,
        }
    }

    /// Sets the model, either as `gemini-x` or `models/gemini-x`.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_part(Part::text(text))
    }

    #[must_use]
    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Adds base64-encoded inline data such as an image.
    #[must_use]
    pub fn with_inline_data(
        self,
        mime_type: impl Into<String>,
        base64_data: impl Into<String>,
    ) -> Self {
        self.with_part(Part::inline_data(mime_type, base64_data))
    }

    /// References previously uploaded data by URI.
    #[must_use]
    pub fn with_file_uri(self, file_uri: impl Into<String>, mime_type: impl Into<String>) -> Self {
        self.with_part(Part::file_data(file_uri, Some(mime_type.into())))
    }

    #[must_use]
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Requests a JSON response without a schema.
    #[must_use]
    pub fn with_json_mode(mut self) -> Self {
        self.generation_config = self.generation_config.with_json_output(None);
        self
    }

    /// Requests a JSON response matching `schema`.
    #[must_use]
    pub fn with_response_schema(mut self, schema: Value) -> Self {
        self.generation_config = self.generation_config.with_json_output(Some(schema));
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.generation_config = self.generation_config.with_temperature(temperature);
        self
    }

    #[must_use]
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.generation_config = self.generation_config.with_top_p(top_p);
        self
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: i32) -> Self {
        self.generation_config = self.generation_config.with_top_k(top_k);
        self
    }

    #[must_use]
    pub fn with_max_output_tokens(mut self, max: i32) -> Self {
        self.generation_config = self.generation_config.with_max_output_tokens(max);
        self
    }

    #[must_use]
    pub fn with_candidate_count(mut self, count: i32) -> Self {
        self.generation_config = self.generation_config.with_candidate_count(count);
        self
    }

    #[must_use]
    pub fn with_stop_sequences(mut self, stops: Vec<String>) -> Self {
        self.generation_config = self.generation_config.with_stop_sequences(stops);
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: i64) -> Self {
        self.generation_config = self.generation_config.with_seed(seed);
        self
    }

    #[must_use]
    pub fn with_thinking_budget(mut self, budget: i32) -> Self {
        self.generation_config = self.generation_config.with_thinking_budget(budget);
        self
    }

    #[must_use]
    pub fn with_thinking_level(mut self, level: ThinkingLevel) -> Self {
        self.generation_config = self.generation_config.with_thinking_level(level);
        self
    }

    /// Replaces the whole generation config, including anything set by earlier calls.
    #[must_use]
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = config;
        self
    }

    #[must_use]
    pub fn with_safety_setting(mut self, setting: SafetySetting) -> Self {
        self.safety_settings.push(setting);
        self
    }

    #[must_use]
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    #[must_use]
    pub fn with_google_search(self) -> Self {
        self.with_tool(Tool::google_search())
    }

    #[must_use]
    pub fn with_code_execution(self) -> Self {
        self.with_tool(Tool::code_execution())
    }

    #[must_use]
    pub fn with_tool_config(mut self, config: ToolConfig) -> Self {
        self.tool_config = Some(config);
        self
    }

    #[must_use]
    pub fn with_cached_content(mut self, name: impl Into<String>) -> Self {
        self.cached_content = Some(name.into());
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The request body this builder would send.
    #[must_use]
    pub fn build(&self) -> GenerateContentRequest {
        let contents = if self.parts.is_empty() {
            Vec::new()
        } else {
            vec![Content::user().with_parts(self.parts.iter().cloned())]
        };

        let mut payload = PayloadBuilder::new(contents)
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

    /// Sends the request as a unary call.
    pub async fn generate(self) -> GenerationResult {
        if self.parts.is_empty() {
            return empty_request();
        }
        let request = self.build();
        self.client.generate_content(&self.model, &request).await
    }

    /// Sends the request as a streaming call, passing text fragments to `sink`.
    pub async fn stream<F>(self, sink: F) -> GenerationResult
    where
        F: FnMut(&str) + Send,
    {
        if self.parts.is_empty() {
            return empty_request();
        }
        let request = self.build();
        self.client
            .stream_generate_content(&self.model, &request, sink)
            .await
    }
}

fn empty_request() -> GenerationResult {
    GenerationResult::from_error(&GenaiError::InvalidInput(
        "request has no content; add text or parts before sending".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::{HarmBlockThreshold, HarmCategory};
    use serde_json::json;

    fn client() -> Client {
        Client::new("test_key")
    }

    #[test]
    fn test_defaults() {
        let client = client();
        let builder = client.request();
        assert_eq!(builder.model(), DEFAULT_MODEL);
        let request = builder.build();
        assert!(request.contents.is_empty());
        assert!(request.generation_config.is_none());
    }

    #[test]
    fn test_parts_form_one_user_turn() {
        let client = client();
        let request = client
            .request()
            .with_text("Describe this image")
            .with_inline_data("image/png", "iVBORw0KGgo=")
            .with_file_uri("gs://bucket/doc.pdf", "application/pdf")
            .build();

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"].as_array().unwrap().len(), 1);
        let turn = &json["contents"][0];
        assert_eq!(turn["role"], "user");
        assert_eq!(turn["parts"][0], json!({"text": "Describe this image"}));
        assert_eq!(turn["parts"][1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(turn["parts"][2]["fileData"]["fileUri"], "gs://bucket/doc.pdf");
    }

    #[test]
    fn test_generation_options_accumulate() {
        let client = client();
        let request = client
            .request()
            .with_text("hi")
            .with_temperature(0.7)
            .with_top_p(0.9)
            .with_top_k(40)
            .with_max_output_tokens(256)
            .with_candidate_count(1)
            .with_stop_sequences(vec!["END".to_string()])
            .with_seed(7)
            .with_thinking_budget(1024)
            .with_response_schema(json!({"type": "object"}))
            .build();

        let config = serde_json::to_value(request.generation_config.unwrap()).unwrap();
        assert_eq!(config["topK"], 40);
        assert_eq!(config["maxOutputTokens"], 256);
        assert_eq!(config["candidateCount"], 1);
        assert_eq!(config["stopSequences"], json!(["END"]));
        assert_eq!(config["seed"], 7);
        assert_eq!(config["thinkingConfig"]["thinkingBudget"], 1024);
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["responseSchema"], json!({"type": "object"}));
    }

    #[test]
    fn test_tools_and_settings() {
        let client = client();
        let request = client
            .request()
            .with_text("hi")
            .with_google_search()
            .with_code_execution()
            .with_safety_setting(SafetySetting::new(
                HarmCategory::DangerousContent,
                HarmBlockThreshold::BlockNone,
            ))
            .with_cached_content("my-cache")
            .with_system_instruction("sys")
            .build();

        let tools = request.tools.unwrap();
        assert_eq!(tools.len(), 2);
        assert!(tools[0].google_search.is_some());
        assert!(tools[1].code_execution.is_some());
        assert_eq!(request.safety_settings.unwrap().len(), 1);
        assert_eq!(
            request.cached_content.as_deref(),
            Some("cachedContents/my-cache")
        );
        assert_eq!(request.system_instruction.unwrap().text(), "sys");
    }

    #[tokio::test]
    async fn test_generate_without_content_fails_locally() {
        let client = client();
        let result = client.request().generate().await;
        assert!(!result.is_success());
        assert_eq!(result.status_code(), 0);
        assert!(result.error_message().contains("no content"));
    }
}
