//! Wiremock tests for the OpenAI client.

use std::time::Duration;

use base64::Engine;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ptalk_openai::{OpenAiClient, OpenAiConfig, OpenAiError};

fn test_client(base_url: &str) -> OpenAiClient {
    OpenAiClient::new(OpenAiConfig {
        base_url: base_url.to_string(),
        api_key: "test-key".to_string(),
        text_model: "gpt-5".to_string(),
        vision_model: "gpt-5-mini".to_string(),
        image_model: "gpt-image-1".to_string(),
        whisper_model: "whisper-1".to_string(),
        brief_model: "gpt-4o-2024-08-06".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn chat_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-123",
        "model": "gpt-5",
        "choices": [{"message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19}
    })
}

#[tokio::test]
async fn transcribe_returns_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "hello world"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let text = client
        .transcribe(vec![0u8; 16], "clip.wav")
        .await
        .unwrap();
    assert_eq!(text, "hello world");
}

#[tokio::test]
async fn respond_carries_instructions_and_usage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Summarize the following"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("A short summary.")))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let completion = client
        .respond("Summarize the following", "some transcript")
        .await
        .unwrap();

    assert_eq!(completion.text, "A short summary.");
    assert_eq!(completion.id, "chatcmpl-123");
    let usage = completion.usage.unwrap();
    assert_eq!(usage.prompt_tokens, 12);
    assert_eq!(usage.total_tokens, 19);
}

#[tokio::test]
async fn respond_with_image_sends_data_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("data:image/png;base64,"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("Neon Dreams")))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let completion = client
        .respond_with_image(b"\x89PNG fake", "Give this artwork a title")
        .await
        .unwrap();
    assert_eq!(completion.text, "Neon Dreams");
}

#[tokio::test]
async fn generate_brief_parses_fenced_json() {
    let server = MockServer::start().await;

    let brief_json = json!({
        "description": "A drifting city of lights.",
        "style": "cinematic",
        "camera": "slow dolly forward",
        "lighting": "golden hour",
        "environment": "rooftop garden",
        "elements": ["a", "b", "c", "d", "e", "f", "g", "h"],
        "motion": "gentle parallax",
        "ending": "a fade to skyline",
        "text": "none",
        "keywords": ["city", "light", "dusk", "calm", "vast"]
    });
    let fenced = format!("```json\n{}\n```", brief_json);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("json_schema"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(&fenced)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let (brief, completion) = client
        .generate_brief("You write video briefs", "transcript here")
        .await
        .unwrap();

    assert_eq!(brief.elements.len(), 8);
    assert_eq!(brief.text, "none");
    assert!(brief.validate().is_ok());
    assert!(completion.usage.is_some());
}

#[tokio::test]
async fn generate_brief_rejects_malformed_output() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("not json at all")))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .generate_brief("system", "user")
        .await
        .unwrap_err();
    assert!(matches!(err, OpenAiError::SchemaViolation(_)));
}

#[tokio::test]
async fn generate_image_decodes_payload() {
    let server = MockServer::start().await;

    let pixels = b"fake png bytes".to_vec();
    let encoded = base64::engine::general_purpose::STANDARD.encode(&pixels);

    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .and(body_string_contains("1024x1024"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"b64_json": encoded, "revised_prompt": "a refined prompt"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let image = client.generate_image("an original prompt").await.unwrap();
    assert_eq!(image.bytes, pixels);
    assert_eq!(image.revised_prompt, "a refined prompt");
}

#[tokio::test]
async fn api_error_surfaces_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429).set_body_string("{\"error\": \"rate limited\"}"),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.respond("sys", "input").await.unwrap_err();
    match err {
        OpenAiError::RequestFailed { status, body } => {
            assert_eq!(status, 429);
            assert!(body.contains("rate limited"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
