//! Request logging for upstream forwarding
//!
//! Each forwarded call gets a short correlation id and a start time so the
//! start, upstream response and failure lines can be tied together.

use std::time::Instant;
use tracing::{debug, error, info, Span};
use uuid::Uuid;

/// Context for one forwarded call
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Short id for log correlation
    pub trace_id: String,
    pub start_time: Instant,
    /// Route family (`proxy`, `huggingface`, ...)
    pub route: String,
    pub method: String,
    /// Inbound path
    pub path: String,
    /// Upstream host, once resolved
    pub target: Option<String>,
    pub model: Option<String>,
    pub streaming: bool,
}

impl RequestContext {
    pub fn new(route: &str, method: &str, path: &str) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string()[..8].to_string(),
            start_time: Instant::now(),
            route: route.to_string(),
            method: method.to_string(),
            path: path.to_string(),
            target: None,
            model: None,
            streaming: false,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }

    pub fn log_request_start(&self) {
        info!(
            trace_id = %self.trace_id,
            route = %self.route,
            method = %self.method,
            path = %self.path,
            target = ?self.target,
            model = ?self.model,
            streaming = %self.streaming,
            "Forwarding request"
        );
    }

    pub fn log_upstream_request(&self, url: &str) {
        debug!(
            trace_id = %self.trace_id,
            route = %self.route,
            url = %url,
            elapsed_ms = %self.elapsed_ms(),
            "Sending request to upstream"
        );
    }

    pub fn log_upstream_response(&self, status: u16, content_length: Option<u64>) {
        info!(
            trace_id = %self.trace_id,
            route = %self.route,
            status = %status,
            content_length = ?content_length,
            elapsed_ms = %self.elapsed_ms(),
            "Response received from upstream"
        );
    }

    pub fn log_upstream_error(&self, status: u16, body: &str) {
        error!(
            trace_id = %self.trace_id,
            route = %self.route,
            target = ?self.target,
            status = %status,
            body_preview = %body.chars().take(200).collect::<String>(),
            elapsed_ms = %self.elapsed_ms(),
            "Upstream returned an error status"
        );
    }

    /// Connection-level failure, no upstream response at all
    pub fn log_connection_error(&self, error: &str, url: &str) {
        error!(
            trace_id = %self.trace_id,
            route = %self.route,
            url = %url,
            elapsed_ms = %self.elapsed_ms(),
            error = %error,
            "Connection to upstream failed"
        );
    }

    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "forward",
            trace_id = %self.trace_id,
            route = %self.route,
            method = %self.method,
            path = %self.path,
        )
    }
}
