//! Perplexity route integration tests

use axum::http::{header, Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header as header_is, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{header_value, TestHarness};
use crate::mocks::UpstreamTestData;

#[tokio::test]
async fn test_query_prompt_builds_chat_body() {
    let harness = TestHarness::new().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header_is("authorization", "Bearer pplx-test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(UpstreamTestData::chat_completion()))
        .expect(1)
        .mount(harness.upstream.server())
        .await;

    let response = harness
        .server
        .get("/perplexity")
        .add_query_param("prompt", "hi")
        .add_query_param("max_tokens", "10")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        harness.upstream.single_json_body().await,
        json!({
            "model": "mistral-7b-instruct",
            "max_tokens": 10,
            "messages": [
                { "role": "system", "content": "Be precise and concise." },
                { "role": "user", "content": "hi" },
            ],
        })
    );
}

#[tokio::test]
async fn test_trailing_slash_base_is_the_chat_route() {
    let harness = TestHarness::new().await;
    harness.upstream.mock_chat_completion("/chat/completions").await;

    let response = harness
        .server
        .get("/perplexity/")
        .add_query_param("host", "elsewhere.example.com")
        .add_query_param("prompt", "hi")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = harness.upstream.single_json_body().await;
    assert_eq!(body["messages"][1]["content"], "hi");
    assert!(body.get("host").is_none());
}

#[tokio::test]
async fn test_json_body_gets_default_model() {
    let harness = TestHarness::new().await;
    harness.upstream.mock_chat_completion("/chat/completions").await;

    let response = harness
        .server
        .post("/perplexity")
        .json(&json!({ "messages": [{ "role": "user", "content": "hi" }] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = harness.upstream.single_json_body().await;
    assert_eq!(body["model"], "mistral-7b-instruct");
    assert_eq!(body["messages"][0]["content"], "hi");
}

#[tokio::test]
async fn test_caller_authorization_wins_on_passthrough() {
    let harness = TestHarness::new().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header_is("authorization", "Bearer caller-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(UpstreamTestData::chat_completion()))
        .expect(1)
        .mount(harness.upstream.server())
        .await;

    let response = harness
        .server
        .post("/perplexity/chat/completions")
        .add_header(header::AUTHORIZATION, header_value("Bearer caller-key"))
        .json(&json!({ "model": "sonar", "messages": [] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(harness.upstream.single_json_body().await["model"], "sonar");
}

#[tokio::test]
async fn test_unsupported_method_is_rejected() {
    let harness = TestHarness::new().await;
    harness.upstream.expect_no_calls().await;

    let response = harness.server.method(Method::PUT, "/perplexity").await;

    assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.text(), "Method Not Allowed");
}

#[tokio::test]
async fn test_upstream_rate_limit_is_relayed() {
    let harness = TestHarness::new().await;
    harness.upstream.mock_error(429, "slow down").await;

    let response = harness
        .server
        .get("/perplexity")
        .add_query_param("prompt", "hi")
        .await;

    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.text(), "slow down");
}
