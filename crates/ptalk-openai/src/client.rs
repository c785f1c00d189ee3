//! OpenAI API client.

use std::time::Duration;

use base64::Engine;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use schemars::schema_for;
use tracing::{debug, warn};

use ptalk_models::VideoBrief;

use crate::error::{OpenAiError, OpenAiResult};
use crate::types::{
    ChatMessage, ChatRequest, ChatResponse, Completion, ContentPart, GeneratedImage, ImageRequest,
    ImageResponse, ImageUrl, JsonSchemaFormat, ResponseFormat, TranscriptionResponse,
};

// =============================================================================
// Configuration
// =============================================================================

/// OpenAI client configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API base URL (overridable for tests)
    pub base_url: String,
    /// API key
    pub api_key: String,
    /// Model for summarization, titles, and image prompts
    pub text_model: String,
    /// Vision-capable model for image-based titles
    pub vision_model: String,
    /// Image generation model
    pub image_model: String,
    /// Speech-to-text model
    pub whisper_model: String,
    /// Structured-output model for video briefs
    pub brief_model: String,
    /// Request timeout
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> OpenAiResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| OpenAiError::config_error("OPENAI_API_KEY not set"))?;

        Ok(Self {
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            text_model: std::env::var("GPT_TEXT_MODEL").unwrap_or_else(|_| "gpt-5".to_string()),
            vision_model: std::env::var("GPT_VISION_MODEL")
                .unwrap_or_else(|_| "gpt-5-mini".to_string()),
            image_model: std::env::var("GPT_IMAGE_MODEL")
                .unwrap_or_else(|_| "gpt-image-1".to_string()),
            whisper_model: std::env::var("WHISPER_MODEL")
                .unwrap_or_else(|_| "whisper-1".to_string()),
            brief_model: std::env::var("VIDEO_PROMPT_MODEL")
                .unwrap_or_else(|_| "gpt-4o-2024-08-06".to_string()),
            timeout: Duration::from_secs(
                std::env::var("OPENAI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
        })
    }
}

// =============================================================================
// Client
// =============================================================================

/// OpenAI REST API client.
#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a new client.
    pub fn new(config: OpenAiConfig) -> OpenAiResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("ptalk-openai/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(OpenAiError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> OpenAiResult<Self> {
        Self::new(OpenAiConfig::from_env()?)
    }

    // =========================================================================
    // Transcription
    // =========================================================================

    /// Transcribe audio bytes. The filename carries the container format
    /// hint the API uses to pick a decoder.
    pub async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> OpenAiResult<String> {
        let url = format!("{}/audio/transcriptions", self.config.base_url);

        let file_part = Part::bytes(audio)
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| OpenAiError::invalid_response(e.to_string()))?;

        let form = Form::new()
            .text("model", self.config.whisper_model.clone())
            .part("file", file_part);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;
        let parsed: TranscriptionResponse = Self::parse_response(response).await?;

        debug!(chars = parsed.text.len(), "Transcription completed");
        Ok(parsed.text)
    }

    // =========================================================================
    // Text generation
    // =========================================================================

    /// One instructed text call against the text model.
    pub async fn respond(&self, instructions: &str, input: &str) -> OpenAiResult<Completion> {
        let request = ChatRequest {
            model: self.config.text_model.clone(),
            messages: vec![ChatMessage::system(instructions), ChatMessage::user(input)],
            temperature: None,
            max_tokens: None,
            response_format: None,
        };
        self.chat(request).await
    }

    /// Vision-based call: image bytes plus a text prompt, against the
    /// vision model.
    pub async fn respond_with_image(
        &self,
        image_png: &[u8],
        text_prompt: &str,
    ) -> OpenAiResult<Completion> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image_png);
        let request = ChatRequest {
            model: self.config.vision_model.clone(),
            messages: vec![ChatMessage::user_parts(vec![
                ContentPart::Text {
                    text: text_prompt.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:image/png;base64,{}", encoded),
                    },
                },
            ])],
            temperature: None,
            max_tokens: None,
            response_format: None,
        };
        self.chat(request).await
    }

    /// Schema-constrained call producing a structured video brief.
    ///
    /// Returns the parsed brief plus the call metadata; shape violations
    /// surface as `SchemaViolation` and are not retried here.
    pub async fn generate_brief(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> OpenAiResult<(VideoBrief, Completion)> {
        let schema = serde_json::to_value(schema_for!(VideoBrief))?;
        let request = ChatRequest {
            model: self.config.brief_model.clone(),
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(user_prompt),
            ],
            temperature: Some(0.8),
            max_tokens: Some(1500),
            response_format: Some(ResponseFormat::JsonSchema {
                json_schema: JsonSchemaFormat {
                    name: "video_brief".to_string(),
                    schema,
                    strict: false,
                },
            }),
        };

        let completion = self.chat(request).await?;
        let brief: VideoBrief = serde_json::from_str(strip_code_fences(&completion.text))
            .map_err(|e| OpenAiError::schema_violation(format!("{}", e)))?;

        Ok((brief, completion))
    }

    // =========================================================================
    // Image generation
    // =========================================================================

    /// Render an image from a prompt.
    pub async fn generate_image(&self, prompt: &str) -> OpenAiResult<GeneratedImage> {
        let url = format!("{}/images/generations", self.config.base_url);

        debug!(prompt_chars = prompt.chars().count(), "Generating image");

        let request = ImageRequest {
            model: self.config.image_model.clone(),
            prompt: prompt.to_string(),
            size: "1024x1024".to_string(),
            quality: "auto".to_string(),
            n: 1,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;
        let parsed: ImageResponse = Self::parse_response(response).await?;

        let data = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| OpenAiError::invalid_response("No image data in response"))?;

        let b64 = data
            .b64_json
            .ok_or_else(|| OpenAiError::invalid_response("No image payload received"))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64.as_bytes())
            .map_err(|e| OpenAiError::invalid_response(format!("Invalid image base64: {}", e)))?;

        Ok(GeneratedImage {
            bytes,
            revised_prompt: data.revised_prompt.unwrap_or_else(|| prompt.to_string()),
        })
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    async fn chat(&self, request: ChatRequest) -> OpenAiResult<Completion> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;
        let parsed: ChatResponse = Self::parse_response(response).await?;

        if parsed.usage.is_none() {
            // Usage tracking is best-effort; callers proceed without it.
            warn!(model = %parsed.model, "No usage metadata in response");
        }

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OpenAiError::invalid_response("No content in response"))?;

        Ok(Completion {
            id: parsed.id,
            model: parsed.model,
            text,
            usage: parsed.usage,
        })
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> OpenAiResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OpenAiError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let prefix: String = body.chars().take(200).collect();
            OpenAiError::invalid_response(format!(
                "Failed to parse response: {} (body prefix: {})",
                e, prefix
            ))
        })
    }
}

/// Strip markdown code fences some models wrap around JSON output.
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix("```json").unwrap_or(text);
    let text = text.strip_prefix("```").unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
    }
}
