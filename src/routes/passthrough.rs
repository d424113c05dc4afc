//! Generic pass-through proxy
//!
//! Forwards any request to the host named by the `host` query parameter.
//! An optional `headers` parameter adds request headers (`key=value`) or
//! strips response headers (`-key`). Both parameters are removed from the
//! forwarded query.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::Method,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::{
    error::{AppError, AppResult},
    params::{query_pairs, ParamSource},
    proxy::headers::{parse_header_directives, HeaderDirectives},
    routes::{health, metrics::observe},
    AppState,
};

const HOST_PARAM: &str = "host";
const HEADERS_PARAM: &str = "headers";

/// Base path: health check on an empty query, otherwise the generic proxy.
pub async fn root_handler(State(state): State<Arc<AppState>>, request: Request) -> AppResult<Response> {
    if request.method() == Method::GET
        && health::is_health_check(request.uri().query(), state.secret_gate.secret())
    {
        return Ok(health::ok().await.into_response());
    }
    passthrough_handler(State(state), request).await
}

/// Pass-through handler for every path without a dedicated route
pub async fn passthrough_handler(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> AppResult<Response> {
    let start = Instant::now();
    let result = forward(&state, request).await;
    observe("proxy", start, result)
}

async fn forward(state: &AppState, request: Request) -> AppResult<Response> {
    let pairs = query_pairs(request.uri().query());

    let host = pairs
        .raw(HOST_PARAM)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing required \"host\" parameter".to_string()))?
        .into_owned();
    let directives = match pairs.raw(HEADERS_PARAM) {
        Some(raw) => parse_header_directives(&raw)?,
        None => HeaderDirectives::default(),
    };

    info!(
        method = %request.method(),
        path = %request.uri().path(),
        host = %host,
        added = directives.add.len(),
        removed = directives.remove.len(),
        "Processing pass-through request"
    );

    let options = state
        .forward_options("proxy", &host)
        .strip_query_param(HOST_PARAM)
        .strip_query_param(HEADERS_PARAM)
        .add_headers(&directives.add)
        .remove_response_headers(directives.remove);

    state.engine.forward(request, options).await
}
