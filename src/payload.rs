//! Assembly of `generateContent` request bodies.

use crate::content::Content;
use crate::http::common::cached_content_resource_name;
use crate::request::{GenerateContentRequest, GenerationConfig};
use crate::safety::SafetySetting;
use crate::tools::{Tool, ToolConfig};

/// Collects turns and generation options into one [`GenerateContentRequest`].
///
/// Unset, empty, and all-default options are left out of the built request,
/// so they never reach the wire as `null` or `[]`.
///
/// # Example
///
/// ```
/// use genai_engine::{Content, GenerationConfig, PayloadBuilder};
///
/// let request = PayloadBuilder::new(vec![Content::user_text("Hi")])
///     .with_system_instruction("Be brief.")
///     .with_generation_config(GenerationConfig::default().with_temperature(0.3))
///     .build();
///
/// let json = serde_json::to_value(&request).unwrap();
/// assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Be brief.");
/// assert!(json.get("tools").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PayloadBuilder {
    contents: Vec<Content>,
    system_instruction: Option<String>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
    tools: Vec<Tool>,
    tool_config: Option<ToolConfig>,
    cached_content: Option<String>,
}

impl PayloadBuilder {
    #[must_use]
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            contents,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    #[must_use]
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = config;
        self
    }

    #[must_use]
    pub fn with_safety_settings(mut self, settings: Vec<SafetySetting>) -> Self {
        self.safety_settings = settings;
        self
    }

    #[must_use]
    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn with_tool_config(mut self, config: ToolConfig) -> Self {
        self.tool_config = Some(config);
        self
    }

    /// Accepts a bare id or a `cachedContents/` resource name.
    #[must_use]
    pub fn with_cached_content(mut self, name: impl Into<String>) -> Self {
        self.cached_content = Some(name.into());
        self
    }

    #[must_use]
    pub fn build(self) -> GenerateContentRequest {
        let system_instruction = self
            .system_instruction
            .filter(|s| !s.is_empty())
            .map(Content::user_text);

        let generation_config =
            (!self.generation_config.is_empty()).then_some(self.generation_config);

        GenerateContentRequest {
            contents: self.contents,
            system_instruction,
            generation_config,
            safety_settings: non_empty(self.safety_settings),
            tools: non_empty(self.tools),
            tool_config: self.tool_config,
            cached_content: self
                .cached_content
                .filter(|name| !name.trim().is_empty())
                .map(|name| cached_content_resource_name(&name)),
        }
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}
