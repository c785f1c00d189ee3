//! Wiremock tests for the Veo client.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ptalk_veo::{TokenCache, VeoClient, VeoConfig, VeoError, VideoPollOutcome, VideoRequest};

const OP_NAME: &str =
    "projects/test-proj/locations/us-central1/publishers/google/models/veo/operations/op-1";

fn test_client(base_url: &str, poll_ms: u64, timeout_ms: u64) -> VeoClient {
    let config = VeoConfig {
        project_id: "test-proj".to_string(),
        location: "us-central1".to_string(),
        model: "veo-3.0-generate-preview".to_string(),
        api_base: base_url.to_string(),
        poll_interval: Duration::from_millis(poll_ms),
        timeout: Duration::from_millis(timeout_ms),
    };
    VeoClient::with_token_cache(config, Arc::new(TokenCache::with_static_token("test-token")))
}

#[tokio::test]
async fn submit_returns_operation_name() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r":predictLongRunning$"))
        .and(body_string_contains("aspectRatio"))
        .and(body_string_contains("gs://bucket/videos/abc/"))
        .and(body_string_contains("\"negativePrompt\":\"blurry, low quality\""))
        .and(body_string_contains("\"seed\":42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": OP_NAME})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 10, 1000);
    let request = VideoRequest::new("a drifting city")
        .with_storage_uri("gs://bucket/videos/abc/")
        .with_negative_prompt("blurry, low quality")
        .with_seed(42);
    let name = client.submit(&request).await.unwrap();
    assert_eq!(name, OP_NAME);
}

#[tokio::test]
async fn await_completion_returns_video_with_gcs_uri() {
    let server = MockServer::start().await;

    // First poll: still running. Subsequent polls: done with a GCS result.
    Mock::given(method("POST"))
        .and(path_regex(r":fetchPredictOperation$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": OP_NAME,
            "done": false
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(r":fetchPredictOperation$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": OP_NAME,
            "done": true,
            "response": {
                "videos": [{
                    "gcsUri": "gs://bucket/videos/abc/sample_0.mp4",
                    "mimeType": "video/mp4"
                }]
            }
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 10, 5000);
    match client.await_completion(OP_NAME).await.unwrap() {
        VideoPollOutcome::Completed {
            gcs_uri, mime_type, ..
        } => {
            assert_eq!(gcs_uri.as_deref(), Some("gs://bucket/videos/abc/sample_0.mp4"));
            assert_eq!(mime_type.as_deref(), Some("video/mp4"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn await_completion_surfaces_operation_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r":fetchPredictOperation$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": OP_NAME,
            "done": true,
            "error": {"code": 9, "message": "prompt rejected by safety filter"}
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 10, 5000);
    let err = client.await_completion(OP_NAME).await.unwrap_err();
    match err {
        VeoError::OperationFailed(msg) => assert!(msg.contains("safety filter")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn await_completion_times_out_while_running() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r":fetchPredictOperation$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": OP_NAME,
            "done": false
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 20, 100);
    match client.await_completion(OP_NAME).await.unwrap() {
        VideoPollOutcome::TimedOut { operation_name } => {
            assert_eq!(operation_name, OP_NAME);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    // The wait budget bounds the number of polls.
    let polls = server.received_requests().await.unwrap().len();
    assert!(polls <= 6, "too many polls: {polls}");
}

#[tokio::test]
async fn transient_poll_failure_does_not_abort_wait() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r":fetchPredictOperation$"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(r":fetchPredictOperation$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": OP_NAME,
            "done": true,
            "response": {"videos": [{"bytesBase64Encoded": "QUJD", "mimeType": "video/mp4"}]}
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 10, 5000);
    match client.await_completion(OP_NAME).await.unwrap() {
        VideoPollOutcome::Completed {
            gcs_uri,
            bytes_base64,
            ..
        } => {
            assert!(gcs_uri.is_none());
            assert_eq!(bytes_base64.as_deref(), Some("QUJD"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}
