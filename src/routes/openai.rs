//! OpenAI-compatible chat routes
//!
//! `/` and `/chat/completions` behave the same: GET builds a chat body from
//! the query, POST forwards a JSON body with the model defaulted. Both go to
//! `{base}/chat/completions`.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{RawQuery, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::{
    error::AppResult,
    params::query_pairs,
    proxy::JsonCall,
    routes::{chat, health, metrics::observe},
    AppState,
};

const ROUTE: &str = "openai";

async fn send(state: &AppState, headers: &HeaderMap, body: Map<String, Value>) -> AppResult<Response> {
    let call = JsonCall::new("/chat/completions", &body)
        .streaming(chat::is_streaming(&body))
        .model(chat::model_of(&body).unwrap_or_default())
        .caller_headers(headers);

    state.upstream.post_json(&state.openai, call).await
}

/// GET - health check, or a chat completion built from query parameters
pub async fn get_chat(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> AppResult<Response> {
    if health::is_health_check(query.as_deref(), state.secret_gate.secret()) {
        return Ok(health::ok().await.into_response());
    }

    let start = Instant::now();
    let body = chat::chat_body_from_query(&query_pairs(query.as_deref()), &state.openai.default_model);
    observe(ROUTE, start, send(&state, &headers, body).await)
}

/// POST - JSON chat body
pub async fn post_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let start = Instant::now();
    let body = chat::with_default_model(chat::parse_json_object(&body)?, &state.openai.default_model);
    observe(ROUTE, start, send(&state, &headers, body).await)
}
