//! The content model: role-tagged turns made of discriminated parts.
//!
//! [`Part`] is the unit of a conversation turn. Exactly one [`PartData`]
//! variant is populated per part; out-of-band metadata (thought flag,
//! signature, free-form annotations) rides alongside it. Serialization is
//! hand-written so the wire shape stays a flat object keyed by the variant
//! name (`{"text": ...}`, `{"inlineData": {...}}`), and so part shapes added
//! by newer API versions decode into [`PartData::Unknown`] instead of failing.

use base64::Engine as _;
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::errors::GenaiError;
use crate::wire_enum::wire_enum;

const THOUGHT_KEY: &str = "thought";
const THOUGHT_SIGNATURE_KEY: &str = "thoughtSignature";
const PART_METADATA_KEY: &str = "partMetadata";

// =============================================================================
// Role
// =============================================================================

/// Author of a turn. Always serialized explicitly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Role {
    #[default]
    User,
    Model,
    Function,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
            Role::Function => "function",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref() {
            Some("model") => Role::Model,
            Some("function") => Role::Function,
            Some("user") | None => Role::User,
            Some(other) => {
                tracing::warn!("Unknown role '{}', treating it as 'user'", other);
                Role::User
            }
        })
    }
}

// =============================================================================
// Variant payloads
// =============================================================================

/// Binary data carried inline. `data` is base64 text and is never decoded implicitly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

impl Blob {
    /// Decodes the base64 payload.
    pub fn decode(&self) -> Result<Vec<u8>, GenaiError> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| GenaiError::InvalidInput(format!("inline data is not valid base64: {e}")))
    }
}

/// A function invocation requested by the model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default = "empty_object")]
    pub args: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

wire_enum! {
    /// Scheduling hint attached to a function response.
    pub enum Scheduling {
        Unspecified => "SCHEDULING_UNSPECIFIED",
        Silent => "SILENT",
        WhenIdle => "WHEN_IDLE",
        Interrupt => "INTERRUPT",
    }
    default = Unspecified;
}

/// The caller's answer to a [`FunctionCall`].
///
/// On the wire the result is wrapped as `response: {name, content}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "FunctionResponseWire", into = "FunctionResponseWire")]
pub struct FunctionResponse {
    pub id: Option<String>,
    pub name: String,
    pub response: Value,
    pub will_continue: Option<bool>,
    pub scheduling: Option<Scheduling>,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionResponseWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    response: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    will_continue: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scheduling: Option<Scheduling>,
}

impl From<FunctionResponseWire> for FunctionResponse {
    fn from(wire: FunctionResponseWire) -> Self {
        let response = match wire.response {
            Value::Object(mut object) if object.contains_key("content") => {
                object.remove("content").unwrap_or(Value::Null)
            }
            other => other,
        };
        Self {
            id: wire.id,
            name: wire.name,
            response,
            will_continue: wire.will_continue,
            scheduling: wire.scheduling,
        }
    }
}

impl From<FunctionResponse> for FunctionResponseWire {
    fn from(value: FunctionResponse) -> Self {
        let mut wrapped = Map::new();
        wrapped.insert("name".to_string(), Value::String(value.name.clone()));
        wrapped.insert("content".to_string(), value.response);
        Self {
            id: value.id,
            name: value.name,
            response: Value::Object(wrapped),
            will_continue: value.will_continue,
            scheduling: value.scheduling,
        }
    }
}

/// A reference to previously uploaded or remote data.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub file_uri: String,
}

wire_enum! {
    /// Language of an [`ExecutableCode`] part.
    pub enum Language {
        Unspecified => "LANGUAGE_UNSPECIFIED",
        Python => "PYTHON",
    }
    default = Python;
}

/// Code generated by the model for the code-execution tool.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutableCode {
    pub language: Language,
    pub code: String,
}

wire_enum! {
    /// Outcome of running an [`ExecutableCode`] part.
    pub enum Outcome {
        Unspecified => "OUTCOME_UNSPECIFIED",
        Ok => "OUTCOME_OK",
        Failed => "OUTCOME_FAILED",
        DeadlineExceeded => "OUTCOME_DEADLINE_EXCEEDED",
    }
    default = Unspecified;
}

impl Outcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Result of running an [`ExecutableCode`] part.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeExecutionResult {
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

// =============================================================================
// Part
// =============================================================================

/// The payload of a [`Part`]. Exactly one variant per part.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub enum PartData {
    /// No variant key present. Serializes to `{}` (plus any metadata).
    #[default]
    Empty,
    Text(String),
    InlineData(Blob),
    FunctionCall(FunctionCall),
    FunctionResponse(FunctionResponse),
    FileData(FileData),
    ExecutableCode(ExecutableCode),
    CodeExecutionResult(CodeExecutionResult),
    /// A part shape this crate does not recognize.
    ///
    /// `part_type` is the unrecognized key and `data` the full raw object,
    /// which is written back unchanged when the part is serialized.
    Unknown { part_type: String, data: Value },
}

/// One discriminated unit of a [`Content`] turn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Part {
    pub data: PartData,
    pub thought: Option<bool>,
    pub thought_signature: Option<String>,
    pub part_metadata: Option<Map<String, Value>>,
}

impl Part {
    fn from_data(data: PartData) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_data(PartData::Text(text.into()))
    }

    /// Inline data from already base64-encoded text.
    #[must_use]
    pub fn inline_data(mime_type: impl Into<String>, base64_data: impl Into<String>) -> Self {
        Self::from_data(PartData::InlineData(Blob {
            mime_type: mime_type.into(),
            data: base64_data.into(),
        }))
    }

    /// Inline data from raw bytes, base64-encoding them.
    #[must_use]
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::inline_data(
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(bytes),
        )
    }

    #[must_use]
    pub fn file_data(file_uri: impl Into<String>, mime_type: Option<String>) -> Self {
        Self::from_data(PartData::FileData(FileData {
            mime_type,
            file_uri: file_uri.into(),
        }))
    }

    #[must_use]
    pub fn function_call(name: impl Into<String>, args: Value) -> Self {
        Self::from_data(PartData::FunctionCall(FunctionCall {
            id: None,
            name: name.into(),
            args,
        }))
    }

    #[must_use]
    pub fn function_response(name: impl Into<String>, response: Value) -> Self {
        Self::from_data(PartData::FunctionResponse(FunctionResponse {
            name: name.into(),
            response,
            ..FunctionResponse::default()
        }))
    }

    #[must_use]
    pub fn executable_code(language: Language, code: impl Into<String>) -> Self {
        Self::from_data(PartData::ExecutableCode(ExecutableCode {
            language,
            code: code.into(),
        }))
    }

    #[must_use]
    pub fn code_execution_result(outcome: Outcome, output: Option<String>) -> Self {
        Self::from_data(PartData::CodeExecutionResult(CodeExecutionResult {
            outcome,
            output,
        }))
    }

    #[must_use]
    pub fn with_thought(mut self, thought: bool) -> Self {
        self.thought = Some(thought);
        self
    }

    #[must_use]
    pub fn with_thought_signature(mut self, signature: impl Into<String>) -> Self {
        self.thought_signature = Some(signature.into());
        self
    }

    /// Adds one free-form annotation to `partMetadata`.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.part_metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            PartData::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_thought(&self) -> bool {
        self.thought == Some(true)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.data, PartData::Empty)
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self.data, PartData::Unknown { .. })
    }

    /// Decodes a part from its wire object.
    ///
    /// Variant keys are checked in a fixed priority order. An object with no
    /// variant key is [`PartData::Empty`]; an object whose only payload key is
    /// unrecognized becomes [`PartData::Unknown`].
    pub fn from_value(value: Value) -> Result<Self, GenaiError> {
        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(GenaiError::MalformedResponse(format!(
                    "part must be a JSON object, got {other}"
                )));
            }
        };

        let thought = object.get(THOUGHT_KEY).and_then(Value::as_bool);
        let thought_signature = object
            .get(THOUGHT_SIGNATURE_KEY)
            .and_then(Value::as_str)
            .map(str::to_string);
        let part_metadata = object
            .get(PART_METADATA_KEY)
            .and_then(Value::as_object)
            .filter(|m| !m.is_empty())
            .cloned();

        let data = decode_part_data(object)?;

        Ok(Self {
            data,
            thought,
            thought_signature,
            part_metadata,
        })
    }
}

fn decode_field<T: serde::de::DeserializeOwned>(
    object: &Map<String, Value>,
    key: &str,
) -> Result<Option<T>, GenaiError> {
    object
        .get(key)
        .map(|v| {
            serde_json::from_value(v.clone()).map_err(|e| {
                GenaiError::MalformedResponse(format!("invalid '{key}' part: {e}"))
            })
        })
        .transpose()
}

fn decode_part_data(object: Map<String, Value>) -> Result<PartData, GenaiError> {
    if let Some(text) = object.get("text") {
        return match text {
            Value::String(s) => Ok(PartData::Text(s.clone())),
            other => Err(GenaiError::MalformedResponse(format!(
                "'text' part must be a string, got {other}"
            ))),
        };
    }
    if let Some(blob) = decode_field(&object, "inlineData")? {
        return Ok(PartData::InlineData(blob));
    }
    if let Some(call) = decode_field(&object, "functionCall")? {
        return Ok(PartData::FunctionCall(call));
    }
    if let Some(response) = decode_field(&object, "functionResponse")? {
        return Ok(PartData::FunctionResponse(response));
    }
    if let Some(file) = decode_field(&object, "fileData")? {
        return Ok(PartData::FileData(file));
    }
    if let Some(code) = decode_field(&object, "executableCode")? {
        return Ok(PartData::ExecutableCode(code));
    }
    if let Some(result) = decode_field(&object, "codeExecutionResult")? {
        return Ok(PartData::CodeExecutionResult(result));
    }

    let unknown_key = object
        .keys()
        .find(|k| !matches!(k.as_str(), THOUGHT_KEY | THOUGHT_SIGNATURE_KEY | PART_METADATA_KEY))
        .cloned();

    match unknown_key {
        None => Ok(PartData::Empty),
        Some(part_type) => {
            #[cfg(feature = "strict-unknown")]
            {
                Err(GenaiError::MalformedResponse(format!(
                    "unknown part type '{part_type}' (strict-unknown enabled)"
                )))
            }
            #[cfg(not(feature = "strict-unknown"))]
            {
                tracing::warn!(
                    "Encountered unknown part type '{}'. \
                     This may indicate a new API feature. \
                     The part will be preserved in the Unknown variant.",
                    part_type
                );
                Ok(PartData::Unknown {
                    part_type,
                    data: Value::Object(object),
                })
            }
        }
    }
}

impl Serialize for Part {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;

        match &self.data {
            PartData::Empty => {}
            PartData::Text(text) => map.serialize_entry("text", text)?,
            PartData::InlineData(blob) => map.serialize_entry("inlineData", blob)?,
            PartData::FunctionCall(call) => map.serialize_entry("functionCall", call)?,
            PartData::FunctionResponse(response) => {
                map.serialize_entry("functionResponse", response)?
            }
            PartData::FileData(file) => map.serialize_entry("fileData", file)?,
            PartData::ExecutableCode(code) => map.serialize_entry("executableCode", code)?,
            PartData::CodeExecutionResult(result) => {
                map.serialize_entry("codeExecutionResult", result)?
            }
            PartData::Unknown { data, .. } => {
                if let Value::Object(object) = data {
                    for (key, value) in object {
                        if !matches!(
                            key.as_str(),
                            THOUGHT_KEY | THOUGHT_SIGNATURE_KEY | PART_METADATA_KEY
                        ) {
                            map.serialize_entry(key, value)?;
                        }
                    }
                }
            }
        }

        if let Some(thought) = self.thought {
            map.serialize_entry(THOUGHT_KEY, &thought)?;
        }
        if let Some(signature) = &self.thought_signature {
            map.serialize_entry(THOUGHT_SIGNATURE_KEY, signature)?;
        }
        if let Some(metadata) = self.part_metadata.as_ref().filter(|m| !m.is_empty()) {
            map.serialize_entry(PART_METADATA_KEY, metadata)?;
        }

        map.end()
    }
}

impl<'de> Deserialize<'de> for Part {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Part::from_value(value).map_err(D::Error::custom)
    }
}

// =============================================================================
// Content
// =============================================================================

/// One role-tagged, ordered list of parts: a single message in a conversation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ContentWire")]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

#[derive(Deserialize)]
struct ContentWire {
    #[serde(default)]
    role: Role,
    #[serde(default)]
    parts: Vec<Value>,
}

impl TryFrom<ContentWire> for Content {
    type Error = GenaiError;

    fn try_from(wire: ContentWire) -> Result<Self, Self::Error> {
        let mut parts = Vec::with_capacity(wire.parts.len());
        for raw in wire.parts {
            match Part::from_value(raw) {
                Ok(part) => parts.push(part),
                Err(e) if cfg!(feature = "strict-unknown") => return Err(e),
                Err(e) => tracing::warn!("Skipping undecodable part: {}", e),
            }
        }
        Ok(Self {
            role: wire.role,
            parts,
        })
    }
}

impl Content {
    #[must_use]
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    /// An empty user turn.
    #[must_use]
    pub fn user() -> Self {
        Self::new(Role::User, Vec::new())
    }

    /// An empty model turn.
    #[must_use]
    pub fn model() -> Self {
        Self::new(Role::Model, Vec::new())
    }

    /// An empty function-result turn.
    #[must_use]
    pub fn function() -> Self {
        Self::new(Role::Function, Vec::new())
    }

    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user().with_text(text)
    }

    #[must_use]
    pub fn model_text(text: impl Into<String>) -> Self {
        Self::model().with_text(text)
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

    #[must_use]
    pub fn with_parts(mut self, parts: impl IntoIterator<Item = Part>) -> Self {
        self.parts.extend(parts);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Concatenation of all non-thought text parts, in order.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter(|p| !p.is_thought())
            .filter_map(Part::as_text)
            .collect()
    }

    /// Text of the parts flagged as thoughts.
    #[must_use]
    pub fn thoughts(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter(|p| p.is_thought())
            .filter_map(Part::as_text)
            .collect()
    }

    #[must_use]
    pub fn function_calls(&self) -> Vec<&FunctionCall> {
        self.parts
            .iter()
            .filter_map(|p| match &p.data {
                PartData::FunctionCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::user_text(text)
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::user_text(text)
    }
}
