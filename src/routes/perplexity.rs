//! Perplexity chat routes

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{RawQuery, Request, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use bytes::Bytes;

use crate::{
    error::AppResult,
    params::query_pairs,
    proxy::JsonCall,
    routes::{chat, health, metrics::observe},
    AppState,
};

const ROUTE: &str = "perplexity";

/// `GET /` - health check, or a chat completion built from query parameters
pub async fn get_chat(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> AppResult<Response> {
    if health::is_health_check(query.as_deref(), state.secret_gate.secret()) {
        return Ok(health::ok().await.into_response());
    }

    let start = Instant::now();
    let body = chat::chat_body_from_query(
        &query_pairs(query.as_deref()),
        &state.perplexity.default_model,
    );
    let call = JsonCall::new("/chat/completions", &body)
        .streaming(chat::is_streaming(&body))
        .model(chat::model_of(&body).unwrap_or_default())
        .caller_headers(&headers);

    observe(ROUTE, start, state.upstream.post_json(&state.perplexity, call).await)
}

/// `POST /` - JSON chat body, model defaulted
pub async fn post_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let start = Instant::now();
    let body = chat::with_default_model(
        chat::parse_json_object(&body)?,
        &state.perplexity.default_model,
    );
    let call = JsonCall::new("/chat/completions", &body)
        .streaming(chat::is_streaming(&body))
        .model(chat::model_of(&body).unwrap_or_default())
        .caller_headers(&headers);

    observe(ROUTE, start, state.upstream.post_json(&state.perplexity, call).await)
}

/// `POST /chat/completions` - forwarded unchanged with the provider token
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> AppResult<Response> {
    let start = Instant::now();
    let route = &state.perplexity;
    let options = state
        .forward_options(ROUTE, route.host())
        .with_token(route.token.clone())
        .with_api_key_auth(route.use_api_key_auth)
        .add_headers(&route.extra_headers);

    observe(ROUTE, start, state.engine.forward(request, options).await)
}
