//! Per-provider route configuration
//!
//! Supplies the upstream target, model defaults and extra headers a route
//! family needs. Built once at startup.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::proxy::engine::strip_scheme;

/// Immutable configuration for one upstream provider
#[derive(Debug, Clone)]
pub struct RouteConfig {
    /// Provider name for logs and metrics
    pub name: &'static str,
    /// Upstream base URL, optionally with a path prefix
    pub base_url: String,
    /// Upstream API token
    pub token: Option<String>,
    /// Send the token as `X-Api-Key` instead of a bearer token
    pub use_api_key_auth: bool,
    /// Model used when neither the request nor the task table names one
    pub default_model: String,
    /// Task used when the request names none
    pub default_task: Option<&'static str>,
    /// Task name to model identifier
    pub models_by_task: &'static [(&'static str, &'static str)],
    /// Headers set on every upstream request
    pub extra_headers: HeaderMap,
}

impl RouteConfig {
    pub fn new(name: &'static str, base_url: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            name,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            use_api_key_auth: false,
            default_model: default_model.into(),
            default_task: None,
            models_by_task: &[],
            extra_headers: HeaderMap::new(),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_api_key_auth(mut self, use_api_key_auth: bool) -> Self {
        self.use_api_key_auth = use_api_key_auth;
        self
    }

    pub fn with_tasks(
        mut self,
        default_task: &'static str,
        models_by_task: &'static [(&'static str, &'static str)],
    ) -> Self {
        self.default_task = Some(default_task);
        self.models_by_task = models_by_task;
        self
    }

    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.extra_headers
            .insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        self
    }

    /// Preset model for a task, if the table has one
    pub fn model_for_task(&self, task: &str) -> Option<&'static str> {
        self.models_by_task
            .iter()
            .find(|(t, _)| *t == task)
            .map(|(_, model)| *model)
    }

    /// Resolve a model: explicit, then task preset, then the default.
    pub fn resolve_model(&self, explicit: Option<&str>, task: Option<&str>) -> String {
        explicit
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .or_else(|| {
                task.or(self.default_task)
                    .and_then(|t| self.model_for_task(t))
                    .map(str::to_string)
            })
            .unwrap_or_else(|| self.default_model.clone())
    }

    /// Upstream host and path prefix, without the scheme
    pub fn host(&self) -> &str {
        strip_scheme(&self.base_url)
    }
}
