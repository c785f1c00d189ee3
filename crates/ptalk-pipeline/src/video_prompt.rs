//! Structured video prompt construction.
//!
//! Builds the system and user prompts for the schema-constrained brief
//! call, and validates the returned brief before it is flattened for the
//! video generator.

use ptalk_models::VideoBrief;

use crate::error::PipelineResult;

/// How much transcript context goes into the user prompt.
const TRANSCRIPT_EXCERPT_CHARS: usize = 200;

/// System prompt for the brief generation call.
pub const BRIEF_SYSTEM_PROMPT: &str = "You are a cinematic video prompt engineer. \
Transform audio summaries into detailed, cinematic video generation prompts.\n\
\n\
You create immersive, dynamic video narratives that capture the essence of the audio content.\n\
\n\
Guidelines for each field:\n\
- description: Create a detailed narrative that unfolds over 8 seconds. Include specific visual sequences, transitions, and key moments. Be cinematic and engaging.\n\
- style: Use 3-5 style keywords that define the overall aesthetic (e.g., \"cinematic, ethereal, hyperrealistic\")\n\
- camera: Describe camera movements from start to finish (e.g., \"starts with close-up, slowly pulls back to reveal wide landscape\")\n\
- lighting: Describe the lighting mood and any changes (e.g., \"golden hour transitioning to blue twilight\")\n\
- environment: Describe the setting and how it evolves during the video\n\
- elements: List 8-12 specific visual elements that appear in the video, be very detailed\n\
- motion: Describe the pace and rhythm of movement in the scene\n\
- ending: Describe the final frame that viewers will remember\n\
- text: Usually \"none\" unless the content specifically requires text overlay\n\
- keywords: 5-10 keywords that capture the essence of the video\n\
\n\
Create videos that are visually striking, emotionally resonant, and perfectly matched to the audio content's mood and message.";

/// Builds prompts for the structured brief call.
pub struct VideoPromptBuilder;

impl VideoPromptBuilder {
    /// Assemble the user prompt from the summary, the related image prompt,
    /// and a short transcript excerpt.
    pub fn build_user_prompt(
        summary: &str,
        image_prompt: Option<&str>,
        transcript: Option<&str>,
    ) -> String {
        let mut parts = vec![
            "Create a cinematic 8-second video prompt based on this content:".to_string(),
            format!("\nAudio Summary: {}", summary),
        ];

        if let Some(prompt) = image_prompt {
            parts.push(format!("\nRelated Visual Concept: {}", prompt));
        }

        if let Some(transcript) = transcript {
            let excerpt: String = transcript.chars().take(TRANSCRIPT_EXCERPT_CHARS).collect();
            parts.push(format!("\nTranscript excerpt: {}...", excerpt));
        }

        parts.push(
            "\nTransform this into an engaging, cinematic video narrative with rich visual \
             details. The video should capture the emotional essence and key themes of the audio."
                .to_string(),
        );

        parts.join("\n")
    }

    /// Validate a brief returned by the model.
    pub fn validate(brief: &VideoBrief) -> PipelineResult<()> {
        brief.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_prompt_structure() {
        let prompt = VideoPromptBuilder::build_user_prompt(
            "A talk about oceans",
            Some("sunlit waves"),
            Some("today we explore the deep"),
        );
        assert!(prompt.contains("Audio Summary: A talk about oceans"));
        assert!(prompt.contains("Related Visual Concept: sunlit waves"));
        assert!(prompt.contains("Transcript excerpt: today we explore the deep..."));
    }

    #[test]
    fn test_user_prompt_without_optional_context() {
        let prompt = VideoPromptBuilder::build_user_prompt("Just a summary", None, None);
        assert!(prompt.contains("Audio Summary: Just a summary"));
        assert!(!prompt.contains("Related Visual Concept"));
        assert!(!prompt.contains("Transcript excerpt"));
    }

    #[test]
    fn test_transcript_excerpt_is_bounded() {
        let long = "x".repeat(1000);
        let prompt = VideoPromptBuilder::build_user_prompt("s", None, Some(&long));
        let excerpt_line = prompt
            .lines()
            .find(|l| l.starts_with("Transcript excerpt:"))
            .unwrap();
        assert!(excerpt_line.len() < 250);
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let multibyte = "é".repeat(500);
        // Must not panic on non-ASCII boundaries.
        let prompt = VideoPromptBuilder::build_user_prompt("s", None, Some(&multibyte));
        assert!(prompt.contains("Transcript excerpt:"));
    }
}
