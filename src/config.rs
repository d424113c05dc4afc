//! Configuration management for Waypoint
//!
//! Configuration is loaded from environment variables once at startup and is
//! read-only afterwards. Empty values count as unset.

use anyhow::{Context, Result};
use std::env;

pub const DEFAULT_HUGGINGFACE_API_URL: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_PERPLEXITY_API_URL: &str = "https://api.perplexity.ai";
pub const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Shared secret; `None` makes the gateway public
    pub secret: Option<String>,
    /// Allowed origin glob; `None` allows all origins without credentials
    pub origin: Option<String>,

    /// Hugging Face inference API URL
    pub huggingface_api_url: String,
    /// Hugging Face token
    pub huggingface_token: Option<String>,

    /// Perplexity API URL
    pub perplexity_api_url: String,
    /// Perplexity API key
    pub perplexity_api_key: Option<String>,

    /// OpenAI-compatible API URL
    pub openai_api_url: String,
    /// OpenAI-compatible API key
    pub openai_api_key: Option<String>,
    /// Model used when an OpenAI-compatible request names none
    pub openai_default_model: String,

    /// Optional bound on the time until response headers are produced
    pub request_timeout_seconds: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let perplexity_api_key = non_empty_var("PPLX_API_KEY");

        Ok(Self {
            host: non_empty_var("WAYPOINT_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: non_empty_var("WAYPOINT_PORT")
                .unwrap_or_else(|| "8787".to_string())
                .parse()
                .context("Invalid WAYPOINT_PORT")?,

            secret: non_empty_var("SECRET"),
            origin: non_empty_var("ORIGIN"),

            huggingface_api_url: non_empty_var("HF_API_URL")
                .unwrap_or_else(|| DEFAULT_HUGGINGFACE_API_URL.to_string()),
            huggingface_token: non_empty_var("HF_TOKEN"),

            perplexity_api_url: non_empty_var("PPLX_API_URL")
                .unwrap_or_else(|| DEFAULT_PERPLEXITY_API_URL.to_string()),
            openai_api_key: non_empty_var("OPENAI_API_KEY").or_else(|| perplexity_api_key.clone()),
            perplexity_api_key,

            openai_api_url: non_empty_var("OPENAI_API_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_API_URL.to_string()),
            openai_default_model: non_empty_var("OPENAI_DEFAULT_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),

            request_timeout_seconds: non_empty_var("WAYPOINT_REQUEST_TIMEOUT_SECONDS")
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("Invalid WAYPOINT_REQUEST_TIMEOUT_SECONDS")?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
            secret: None,
            origin: None,
            huggingface_api_url: DEFAULT_HUGGINGFACE_API_URL.to_string(),
            huggingface_token: None,
            perplexity_api_url: DEFAULT_PERPLEXITY_API_URL.to_string(),
            perplexity_api_key: None,
            openai_api_url: DEFAULT_OPENAI_API_URL.to_string(),
            openai_api_key: None,
            openai_default_model: DEFAULT_OPENAI_MODEL.to_string(),
            request_timeout_seconds: None,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}
