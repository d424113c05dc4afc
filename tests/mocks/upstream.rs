//! Mock upstream provider for testing
//!
//! One wiremock server stands in for whichever provider a route forwards to.
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::mocks::upstream::{MockUpstream, UpstreamTestData};
//!
//! #[tokio::test]
//! async fn test_with_upstream_mock() {
//!     let upstream = MockUpstream::start().await;
//!     upstream.mock_chat_completion("/chat/completions").await;
//!     // point a route at upstream.uri() or pass upstream.address() as `host`
//! }
//! ```

use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, ResponseTemplate,
};

/// Mock upstream server wrapper
pub struct MockUpstream {
    server: MockServer,
}

impl MockUpstream {
    /// Start a new mock upstream server
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Get the mock server URI
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Get the mock server address (host:port)
    pub fn address(&self) -> String {
        self.server.address().to_string()
    }

    /// Access the underlying server to mount custom mocks
    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Every request the upstream received so far
    pub async fn received(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// JSON body of the only request received
    pub async fn single_json_body(&self) -> Value {
        let requests = self.received().await;
        assert_eq!(requests.len(), 1, "expected exactly one upstream request");
        serde_json::from_slice(&requests[0].body).expect("upstream body was not JSON")
    }

    /// Fail the test if anything reaches the upstream
    pub async fn expect_no_calls(&self) {
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&self.server)
            .await;
    }

    /// Non-streaming chat completion at `at`
    pub async fn mock_chat_completion(&self, at: &str) {
        Mock::given(method("POST"))
            .and(path(at))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(UpstreamTestData::chat_completion()),
            )
            .mount(&self.server)
            .await;
    }

    /// Server-sent events at `at`
    pub async fn mock_sse(&self, at: &str) {
        Mock::given(method("POST"))
            .and(path(at))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("cache-control", "no-cache")
                    .set_body_raw(UpstreamTestData::sse_stream(), "text/event-stream"),
            )
            .mount(&self.server)
            .await;
    }

    /// Error status with a plain-text body for any request
    pub async fn mock_error(&self, status: u16, body: &str) {
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }
}

/// Canned upstream payloads
pub struct UpstreamTestData;

impl UpstreamTestData {
    pub fn chat_completion() -> Value {
        json!({
            "id": "chatcmpl-test123",
            "object": "chat.completion",
            "created": 1706745600,
            "model": "mistral-7b-instruct",
            "choices": [
                {
                    "index": 0,
                    "message": { "role": "assistant", "content": "Hello!" },
                    "finish_reason": "stop"
                }
            ]
        })
    }

    pub fn sse_stream() -> &'static str {
        concat!(
            "data: {\"id\":\"chatcmpl-test123\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"id\":\"chatcmpl-test123\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"id\":\"chatcmpl-test123\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n"
        )
    }
}
