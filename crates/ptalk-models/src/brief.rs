//! Structured video brief.
//!
//! The schema-constrained intermediate representation of a video concept.
//! A brief is produced by a schema-constrained model call, validated at the
//! boundary, and flattened into the single natural-language prompt string
//! actually sent to the video generator.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bounds on the `elements` list.
pub const ELEMENTS_MIN: usize = 8;
pub const ELEMENTS_MAX: usize = 12;

/// Bounds on the `keywords` list.
pub const KEYWORDS_MIN: usize = 5;
pub const KEYWORDS_MAX: usize = 10;

/// How many elements are spelled out in the flattened prompt before the
/// remainder collapses into a count.
const FLATTEN_ELEMENT_LIMIT: usize = 5;

/// Brief validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BriefError {
    #[error("elements must contain {ELEMENTS_MIN}-{ELEMENTS_MAX} entries, got {0}")]
    ElementsOutOfBounds(usize),

    #[error("keywords must contain {KEYWORDS_MIN}-{KEYWORDS_MAX} entries, got {0}")]
    KeywordsOutOfBounds(usize),
}

/// Structured schema for video generation prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoBrief {
    /// Detailed narrative of the video sequence (100-200 words)
    pub description: String,
    /// Visual style keywords (e.g., "cinematic, dynamic, magical futurism")
    pub style: String,
    /// Camera movements and perspectives throughout the video
    pub camera: String,
    /// Lighting conditions and transitions
    pub lighting: String,
    /// Setting and environmental changes
    pub environment: String,
    /// List of 8-12 specific visual elements and actions
    pub elements: Vec<String>,
    /// Movement dynamics and timing
    pub motion: String,
    /// Final frame composition
    pub ending: String,
    /// Text overlay specification or "none"
    #[serde(default = "default_text")]
    pub text: String,
    /// 5-10 key visual concepts
    pub keywords: Vec<String>,
}

fn default_text() -> String {
    "none".to_string()
}

impl VideoBrief {
    /// Validate list bounds.
    ///
    /// Out-of-bounds lists fail generation outright; they are never silently
    /// truncated or padded.
    pub fn validate(&self) -> Result<(), BriefError> {
        let n = self.elements.len();
        if !(ELEMENTS_MIN..=ELEMENTS_MAX).contains(&n) {
            return Err(BriefError::ElementsOutOfBounds(n));
        }
        let k = self.keywords.len();
        if !(KEYWORDS_MIN..=KEYWORDS_MAX).contains(&k) {
            return Err(BriefError::KeywordsOutOfBounds(k));
        }
        Ok(())
    }

    /// Flatten the brief into the single prompt string sent to the video
    /// generator.
    ///
    /// Pure and deterministic. The clause ordering is a hard contract: it
    /// defines the shape of the text the generator actually receives and
    /// must not change between releases.
    pub fn flatten(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        // Lead with the narrative
        parts.push(self.description.clone());

        parts.push(format!("Visual style: {}.", self.style));
        parts.push(format!("Camera: {}.", self.camera));
        parts.push(format!("Lighting: {}.", self.lighting));

        if !self.environment.is_empty() {
            parts.push(format!("Setting: {}.", self.environment));
        }

        if !self.elements.is_empty() {
            let mut elements_text = format!(
                "The scene includes {}",
                self.elements
                    .iter()
                    .take(FLATTEN_ELEMENT_LIMIT)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            if self.elements.len() > FLATTEN_ELEMENT_LIMIT {
                elements_text.push_str(&format!(
                    ", and {} more detailed elements",
                    self.elements.len() - FLATTEN_ELEMENT_LIMIT
                ));
            }
            elements_text.push('.');
            parts.push(elements_text);
        }

        parts.push(format!("Motion: {}.", self.motion));
        parts.push(format!("The video ends with {}.", self.ending));

        if !self.keywords.is_empty() {
            parts.push(format!("Keywords: {}.", self.keywords.join(", ")));
        }

        if self.text.eq_ignore_ascii_case("none") {
            parts.push("No text overlays.".to_string());
        }

        parts.join(" ")
    }
}
