//! Health check endpoints
//!
//! - base path of each route family with no query - plain `OK`
//! - `/_waypoint/live` - liveness probe

use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::middleware::secret::API_KEY_PARAM;

/// Health status enum
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
}

/// Simple health response for liveness
#[derive(Debug, Serialize)]
pub struct SimpleHealthResponse {
    pub status: HealthStatus,
}

/// Whether a query string on a base path is a health check: empty, or
/// exactly `api_key=<secret>` when a secret is configured.
pub fn is_health_check(query: Option<&str>, secret: Option<&str>) -> bool {
    match query {
        None | Some("") => true,
        Some(query) => secret.is_some_and(|secret| {
            query
                .strip_prefix(API_KEY_PARAM)
                .and_then(|rest| rest.strip_prefix('='))
                == Some(secret)
        }),
    }
}

/// Plain-text health response
pub async fn ok() -> &'static str {
    "OK"
}

/// Liveness probe endpoint
pub async fn liveness_check() -> (StatusCode, Json<SimpleHealthResponse>) {
    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}
