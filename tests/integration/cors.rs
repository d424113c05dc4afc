//! CORS integration tests

use axum::http::{
    header::{
        ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
        ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN, VARY,
    },
    Method, StatusCode,
};
use pretty_assertions::assert_eq;

use crate::common::{api_key_header, constants::TEST_SECRET, header_value, TestHarness};

async fn with_origin_pattern(pattern: &str) -> TestHarness {
    let pattern = pattern.to_string();
    TestHarness::with_config(move |config| config.origin = Some(pattern)).await
}

#[tokio::test]
async fn test_unconfigured_origin_gets_wildcard_without_credentials() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .get("/")
        .add_header(ORIGIN, header_value("https://x.com"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(response.headers().get(ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    assert_eq!(response.headers()[VARY], "Origin");
}

#[tokio::test]
async fn test_matching_origin_is_echoed_with_credentials() {
    let harness = with_origin_pattern("https://*.example.com").await;

    let response = harness
        .server
        .get("/")
        .add_header(ORIGIN, header_value("https://api.example.com"))
        .await;

    assert_eq!(
        response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://api.example.com"
    );
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn test_disallowed_origin_gets_no_cors_headers() {
    let harness = with_origin_pattern("https://*.example.com").await;

    let response = harness
        .server
        .get("/")
        .add_header(ORIGIN, header_value("https://evil.com"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    assert!(response.headers().get(ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
}

#[tokio::test]
async fn test_preflight_is_terminal() {
    let harness = with_origin_pattern("https://*.example.com").await;
    harness.upstream.expect_no_calls().await;

    let response = harness
        .server
        .method(Method::OPTIONS, "/v1/chat/completions")
        .add_query_param("host", harness.upstream.address())
        .add_header(ORIGIN, header_value("https://app.example.com"))
        .await;

    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    assert_eq!(response.text(), "");
    assert_eq!(
        response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.example.com"
    );
    assert_eq!(
        response.headers()[ACCESS_CONTROL_ALLOW_METHODS],
        "GET, POST, OPTIONS"
    );
    assert_eq!(
        response.headers()[ACCESS_CONTROL_ALLOW_HEADERS],
        "Accept, Content-Type, Authorization"
    );
}

#[tokio::test]
async fn test_huggingface_preflight_advertises_cache_header() {
    let harness = TestHarness::new().await;

    for path in ["/huggingface", "/huggingface/"] {
        let response = harness
            .server
            .method(Method::OPTIONS, path)
            .add_header(ORIGIN, header_value("https://x.com"))
            .await;

        assert_eq!(response.status_code(), StatusCode::NO_CONTENT, "{path}");
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_HEADERS],
            "Accept, Content-Type, X-Use-Cache",
            "{path}"
        );
    }
}

#[tokio::test]
async fn test_secret_is_checked_before_preflight() {
    let harness = TestHarness::with_secret().await;

    let response = harness
        .server
        .method(Method::OPTIONS, "/")
        .add_header(ORIGIN, header_value("https://x.com"))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = harness
        .server
        .method(Method::OPTIONS, "/")
        .add_header(ORIGIN, header_value("https://x.com"))
        .add_header(api_key_header(), header_value(TEST_SECRET))
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers()[ACCESS_CONTROL_ALLOW_HEADERS],
        "Accept, Content-Type, X-Api-Key"
    );
}
