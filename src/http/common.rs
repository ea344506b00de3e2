/// Represents the API version to target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApiVersion {
    /// V1 Beta API version (default; carries thinking, code execution, and newer part kinds)
    #[default]
    V1Beta,
    /// Stable V1 API version
    V1,
}

impl ApiVersion {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::V1Beta => "v1beta",
            Self::V1 => "v1",
        }
    }
}

// --- URL Construction ---
pub(crate) const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Header name for API key authentication.
///
/// The key travels in a header so it never appears in URLs, logs, or error messages.
pub const API_KEY_HEADER: &str = "X-Goog-Api-Key";

const MODELS_PREFIX: &str = "models/";
const TUNED_MODELS_PREFIX: &str = "tunedModels/";
const CACHED_CONTENTS_PREFIX: &str = "cachedContents/";

/// Canonical resource name for a model: `gemini-2.5-flash` becomes
/// `models/gemini-2.5-flash`. Already-prefixed names pass through.
#[must_use]
pub fn model_resource_name(model: &str) -> String {
    let model = model.trim();
    for prefix in [MODELS_PREFIX, TUNED_MODELS_PREFIX] {
        if let Some(id) = model.strip_prefix(prefix) {
            return format!("{prefix}{}", urlencoding::encode(id));
        }
    }
    format!("{MODELS_PREFIX}{}", urlencoding::encode(model))
}

/// Canonical resource name for a cached content entry.
#[must_use]
pub fn cached_content_resource_name(name: &str) -> String {
    let name = name.trim();
    if name.starts_with(CACHED_CONTENTS_PREFIX) {
        name.to_string()
    } else {
        format!("{CACHED_CONTENTS_PREFIX}{name}")
    }
}

/// Represents the generation endpoints this crate calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint<'a> {
    /// Unary `:generateContent`
    GenerateContent { model: &'a str },
    /// Server-sent-events `:streamGenerateContent`
    StreamGenerateContent { model: &'a str },
}

impl Endpoint<'_> {
    /// Constructs the URL path for this endpoint
    fn to_path(&self, version: ApiVersion) -> String {
        match self {
            Self::GenerateContent { model } => format!(
                "/{}/{}:generateContent",
                version.as_str(),
                model_resource_name(model)
            ),
            Self::StreamGenerateContent { model } => format!(
                "/{}/{}:streamGenerateContent",
                version.as_str(),
                model_resource_name(model)
            ),
        }
    }

    /// Returns whether this endpoint requires SSE parameters
    const fn requires_sse(&self) -> bool {
        matches!(self, Self::StreamGenerateContent { .. })
    }
}

/// Constructs a URL for a specific endpoint.
///
/// API key authentication is handled via the [`API_KEY_HEADER`] header,
/// never as a query parameter.
#[must_use]
pub fn construct_endpoint_url(base_url: &str, version: ApiVersion, endpoint: Endpoint) -> String {
    let base = base_url.trim_end_matches('/');
    let path = endpoint.to_path(version);
    let query = if endpoint.requires_sse() { "?alt=sse" } else { "" };
    format!("{base}{path}{query}")
}
