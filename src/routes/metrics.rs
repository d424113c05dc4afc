//! Prometheus metrics endpoint
//!
//! Exposes gateway metrics in Prometheus format for monitoring.

use std::time::Instant;

use axum::response::{IntoResponse, Response};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

use crate::error::{AppError, AppResult};

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    let _ = &*PROMETHEUS_HANDLE;
    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "waypoint_requests_total",
        "Total number of forwarded requests by route and status"
    );
    metrics::describe_histogram!(
        "waypoint_request_duration_seconds",
        "Time until upstream response headers, in seconds"
    );
    metrics::describe_counter!(
        "waypoint_upstream_errors_total",
        "Failed forwards by route and error kind"
    );
}

/// Prometheus metrics endpoint handler
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a finished request
pub fn record_request(route: &str, status: u16, duration_secs: f64) {
    metrics::counter!(
        "waypoint_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("waypoint_request_duration_seconds", "route" => route.to_string())
        .record(duration_secs);
}

/// Record a failed forward
pub fn record_upstream_error(route: &str, kind: &str) {
    metrics::counter!(
        "waypoint_upstream_errors_total",
        "route" => route.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record the outcome of a handler and pass it through unchanged.
pub fn observe(route: &str, start: Instant, result: AppResult<Response>) -> AppResult<Response> {
    let duration = start.elapsed().as_secs_f64();
    match &result {
        Ok(response) => record_request(route, response.status().as_u16(), duration),
        Err(err) => {
            record_request(route, err.status().as_u16(), duration);
            if matches!(err, AppError::Upstream { .. } | AppError::Network(_)) {
                record_upstream_error(route, err.kind());
            }
        }
    }
    result
}
