//! Common test utilities for Waypoint
//!
//! Builds the real router over an [`AppState`] whose providers all point at
//! one mock upstream.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use waypoint::{routes, AppState, Config};

use crate::mocks::MockUpstream;

/// Test configuration constants
pub mod constants {
    pub const TEST_SECRET: &str = "s3cret";
    pub const TEST_HF_TOKEN: &str = "hf-test-token";
    pub const TEST_PPLX_KEY: &str = "pplx-test-key";
    pub const TEST_OPENAI_KEY: &str = "openai-test-key";
}

pub fn api_key_header() -> HeaderName {
    HeaderName::from_static("x-api-key")
}

pub fn header_value(value: &str) -> HeaderValue {
    value.parse().unwrap()
}

/// Config with every provider pointed at `upstream`
pub fn test_config(upstream: &MockUpstream) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        huggingface_api_url: upstream.uri(),
        huggingface_token: Some(constants::TEST_HF_TOKEN.to_string()),
        perplexity_api_url: upstream.uri(),
        perplexity_api_key: Some(constants::TEST_PPLX_KEY.to_string()),
        openai_api_url: upstream.uri(),
        openai_api_key: Some(constants::TEST_OPENAI_KEY.to_string()),
        ..Config::default()
    }
}

/// Router under test plus its mock upstream
pub struct TestHarness {
    pub server: TestServer,
    pub upstream: MockUpstream,
}

impl TestHarness {
    /// Public gateway, any origin
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Gateway protected by [`constants::TEST_SECRET`]
    pub async fn with_secret() -> Self {
        Self::with_config(|config| config.secret = Some(constants::TEST_SECRET.to_string())).await
    }

    /// Adjust the default test config before the router is built
    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let upstream = MockUpstream::start().await;
        let mut config = test_config(&upstream);
        adjust(&mut config);

        let state = Arc::new(AppState::new_for_testing(config));
        let app = routes::create_router(state);
        let server = TestServer::new(app).expect("Failed to create test server");

        Self { server, upstream }
    }
}
