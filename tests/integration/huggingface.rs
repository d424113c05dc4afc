//! Hugging Face route integration tests

use axum::http::{header, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header as header_is, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{header_value, TestHarness};
use crate::mocks::UpstreamTestData;

#[tokio::test]
async fn test_query_inference_posts_inputs_and_parameters() {
    let harness = TestHarness::new().await;
    Mock::given(method("POST"))
        .and(path("/models/huggingfaceh4/zephyr-7b-beta"))
        .and(header_is("x-wait-for-model", "true"))
        .and(header_is("x-use-cache", "false"))
        .and(header_is("authorization", "Bearer hf-test-token"))
        .and(body_json(json!({ "inputs": "hi", "parameters": { "max_length": 5 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "generated_text": "hi there" }])))
        .expect(1)
        .mount(harness.upstream.server())
        .await;

    let response = harness
        .server
        .get("/huggingface")
        .add_query_param("inputs", "hi")
        .add_query_param("max_length", "5")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<serde_json::Value>()[0]["generated_text"], "hi there");
}

#[tokio::test]
async fn test_json_inference_selects_task_model() {
    let harness = TestHarness::new().await;
    Mock::given(method("POST"))
        .and(path("/models/facebook/bart-large-cnn"))
        .and(header_is("x-use-cache", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "summary_text": "short" }])))
        .expect(1)
        .mount(harness.upstream.server())
        .await;

    let response = harness
        .server
        .post("/huggingface/")
        .json(&json!({
            "inputs": "a long text",
            "task": "summarization",
            "use_cache": true,
            "min_length": 3,
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        harness.upstream.single_json_body().await,
        json!({ "inputs": "a long text", "parameters": { "min_length": 3 } })
    );
}

#[tokio::test]
async fn test_invalid_json_is_rejected_before_upstream() {
    let harness = TestHarness::new().await;
    harness.upstream.expect_no_calls().await;

    let response = harness
        .server
        .post("/huggingface")
        .add_header(header::CONTENT_TYPE, header_value("application/json"))
        .bytes("{not json".as_bytes().to_vec().into())
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let parse_error = serde_json::from_slice::<serde_json::Value>(b"{not json")
        .unwrap_err()
        .to_string();
    assert_eq!(response.text(), parse_error);
}

#[tokio::test]
async fn test_chat_completions_stream_from_model_endpoint() {
    let harness = TestHarness::new().await;
    Mock::given(method("POST"))
        .and(path("/models/me/chat-model/v1/chat/completions"))
        .and(header_is("accept", "text/event-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(UpstreamTestData::sse_stream(), "text/event-stream"),
        )
        .expect(1)
        .mount(harness.upstream.server())
        .await;

    let response = harness
        .server
        .post("/huggingface/chat/completions")
        .json(&json!({
            "model": "me/chat-model",
            "stream": true,
            "messages": [{ "role": "user", "content": "hi" }],
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(response.text(), UpstreamTestData::sse_stream());
}

#[tokio::test]
async fn test_other_paths_are_proxied_with_token() {
    let harness = TestHarness::new().await;
    Mock::given(method("GET"))
        .and(path("/api/xyz"))
        .and(header_is("authorization", "Bearer hf-test-token"))
        .and(header_is("x-use-cache", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_string("proxied"))
        .expect(1)
        .mount(harness.upstream.server())
        .await;

    let response = harness.server.get("/huggingface/api/xyz").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "proxied");
}

#[tokio::test]
async fn test_chat_completions_rejects_get() {
    let harness = TestHarness::new().await;
    harness.upstream.expect_no_calls().await;

    let response = harness.server.get("/huggingface/chat/completions").await;

    assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
}
