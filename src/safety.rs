//! Safety settings sent with a request and safety ratings returned with a response.

use serde::{Deserialize, Serialize};

use crate::wire_enum::wire_enum;

wire_enum! {
    /// Category of potentially harmful content.
    pub enum HarmCategory {
        Unspecified => "HARM_CATEGORY_UNSPECIFIED",
        HateSpeech => "HARM_CATEGORY_HATE_SPEECH",
        DangerousContent => "HARM_CATEGORY_DANGEROUS_CONTENT",
        Harassment => "HARM_CATEGORY_HARASSMENT",
        SexuallyExplicit => "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        CivicIntegrity => "HARM_CATEGORY_CIVIC_INTEGRITY",
        ImageHate => "HARM_CATEGORY_IMAGE_HATE",
        ImageDangerousContent => "HARM_CATEGORY_IMAGE_DANGEROUS_CONTENT",
        ImageHarassment => "HARM_CATEGORY_IMAGE_HARASSMENT",
        ImageSexuallyExplicit => "HARM_CATEGORY_IMAGE_SEXUALLY_EXPLICIT",
    }
    default = Unspecified;
}

wire_enum! {
    /// How aggressively a [`HarmCategory`] is filtered.
    pub enum HarmBlockThreshold {
        Unspecified => "HARM_BLOCK_THRESHOLD_UNSPECIFIED",
        BlockLowAndAbove => "BLOCK_LOW_AND_ABOVE",
        BlockMediumAndAbove => "BLOCK_MEDIUM_AND_ABOVE",
        BlockOnlyHigh => "BLOCK_ONLY_HIGH",
        BlockNone => "BLOCK_NONE",
        Off => "OFF",
    }
    default = Unspecified;
}

wire_enum! {
    /// Probability that content is harmful, as rated by the service.
    pub enum HarmProbability {
        Unspecified => "HARM_PROBABILITY_UNSPECIFIED",
        Negligible => "NEGLIGIBLE",
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
    }
    default = Unspecified;
}

wire_enum! {
    /// Why a prompt was rejected before generation.
    pub enum BlockReason {
        Unspecified => "BLOCK_REASON_UNSPECIFIED",
        Safety => "SAFETY",
        Other => "OTHER",
        Blocklist => "BLOCKLIST",
        ProhibitedContent => "PROHIBITED_CONTENT",
        ImageSafety => "IMAGE_SAFETY",
    }
    default = Unspecified;
}

/// A per-category blocking threshold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

impl SafetySetting {
    #[must_use]
    pub fn new(category: HarmCategory, threshold: HarmBlockThreshold) -> Self {
        Self {
            category,
            threshold,
        }
    }
}

/// The service's rating of one category for a prompt or candidate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyRating {
    pub category: HarmCategory,
    pub probability: HarmProbability,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked: Option<bool>,
}
