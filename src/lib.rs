//! Waypoint - edge gateway for LLM provider APIs
//!
//! This library provides the core functionality for the Waypoint gateway.
//! It admits requests with an optional shared secret, applies an origin-glob
//! CORS policy, normalizes loosely-typed parameters into upstream bodies and
//! forwards requests to provider APIs while streaming responses back.

pub mod config;
pub mod error;
pub mod glob;
pub mod middleware;
pub mod params;
pub mod proxy;
pub mod routes;

use std::time::Duration;

use anyhow::Result;

pub use crate::config::Config;
pub use crate::glob::GlobMatcher;
pub use crate::middleware::{CorsPolicy, SecretGate};
pub use crate::params::{normalize, ParamValue, Parameters, ParseSpec, Parser};
pub use crate::proxy::{ForwardOptions, ProxyEngine, RouteConfig, UpstreamClient};

pub const HUGGINGFACE_DEFAULT_TASK: &str = "text-generation";
pub const HUGGINGFACE_DEFAULT_MODEL: &str = "huggingfaceh4/zephyr-7b-beta";
pub const PERPLEXITY_DEFAULT_MODEL: &str = "mistral-7b-instruct";

/// Task presets for the Hugging Face inference API
pub const HUGGINGFACE_MODELS_BY_TASK: &[(&str, &str)] = &[
    (HUGGINGFACE_DEFAULT_TASK, HUGGINGFACE_DEFAULT_MODEL),
    ("feature-extraction", "facebook/bart-base"),
    ("fill-mask", "google-bert/bert-base-uncased"),
    ("question-answering", "deepset/roberta-base-squad2"),
    ("summarization", "facebook/bart-large-cnn"),
    (
        "text-classification",
        "distilbert/distilbert-base-uncased-finetuned-sst-2-english",
    ),
    ("text-to-image", "stabilityai/stable-diffusion-xl-base-1.0"),
    ("text-to-speech", "facebook/mms-tts-eng"),
    ("token-classification", "dslim/bert-base-ner"),
    ("translation", "helsinki-nlp/opus-mt-en-fr"),
    ("zero-shot-classification", "typeform/distilbert-base-uncased-mnli"),
];

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    /// Raw request forwarding
    pub engine: ProxyEngine,
    /// JSON bodies built by route handlers
    pub upstream: UpstreamClient,
    pub secret_gate: SecretGate,
    /// Base CORS policy; route families extend it
    pub cors: CorsPolicy,
    pub huggingface: RouteConfig,
    pub perplexity: RouteConfig,
    pub openai: RouteConfig,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Result<Self> {
        // No automatic decompression: relayed bytes must match Content-Encoding
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let engine = ProxyEngine::new(http_client.clone());
        let upstream = UpstreamClient::new(http_client);

        Ok(Self::assemble(config, engine, upstream))
    }

    /// Create an application state whose upstream calls use plain http, so a
    /// local mock server can stand in for each provider.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new_for_testing(config: Config) -> Self {
        let http_client = reqwest::Client::new();
        let engine = ProxyEngine::new(http_client.clone()).with_insecure_upstream();
        let upstream = UpstreamClient::new(http_client).with_insecure_upstream();

        Self::assemble(config, engine, upstream)
    }

    fn assemble(config: Config, engine: ProxyEngine, upstream: UpstreamClient) -> Self {
        let secret_gate = SecretGate::new(config.secret.clone());
        let cors = CorsPolicy::new(config.origin.as_deref(), secret_gate.is_enabled());

        let huggingface = RouteConfig::new(
            "huggingface",
            config.huggingface_api_url.as_str(),
            HUGGINGFACE_DEFAULT_MODEL,
        )
        .with_token(config.huggingface_token.clone())
        .with_tasks(HUGGINGFACE_DEFAULT_TASK, HUGGINGFACE_MODELS_BY_TASK)
        .with_header("x-wait-for-model", "true");

        let perplexity = RouteConfig::new(
            "perplexity",
            config.perplexity_api_url.as_str(),
            PERPLEXITY_DEFAULT_MODEL,
        )
        .with_token(config.perplexity_api_key.clone());

        let openai = RouteConfig::new(
            "openai",
            config.openai_api_url.as_str(),
            config.openai_default_model.as_str(),
        )
        .with_token(config.openai_api_key.clone());

        Self {
            config,
            engine,
            upstream,
            secret_gate,
            cors,
            huggingface,
            perplexity,
            openai,
        }
    }

    /// Forward options with the gateway secret kept away from the upstream.
    pub fn forward_options(&self, route: &'static str, target_host: &str) -> ForwardOptions {
        let options = ForwardOptions::new(route, target_host);
        if self.secret_gate.is_enabled() {
            options
                .strip_query_param(middleware::secret::API_KEY_PARAM)
                .strip_request_header(middleware::secret::API_KEY_HEADER)
        } else {
            options
        }
    }
}
