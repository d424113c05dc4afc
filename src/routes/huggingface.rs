//! Hugging Face inference routes
//!
//! `GET /` builds `{inputs, parameters}` from the query, `POST /` from a JSON
//! body, `POST /chat/completions` forwards a chat body to the model's
//! OpenAI-compatible endpoint, and every other path is proxied as-is.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{RawQuery, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::{json, Map, Value};

use crate::{
    error::AppResult,
    params::{normalize, query_pairs, ParamSource, ParseSpec, Parser},
    proxy::JsonCall,
    routes::{chat, health, metrics::observe},
    AppState,
};

const ROUTE: &str = "huggingface";

pub const USE_CACHE_HEADER: HeaderName = HeaderName::from_static("x-use-cache");

/// Keys that select the model or shape `inputs` and are never sent as
/// inference parameters
const RESERVED: &[&str] = &["context", "inputs", "model", "question", "task", "use_cache"];

fn query_spec() -> ParseSpec {
    ParseSpec::new()
        // images
        .param("height", Parser::Integer)
        .param("width", Parser::Integer)
        .param("guidance_scale", Parser::Float)
        .param("num_inference_steps", Parser::Integer)
        // classification
        .param("candidate_labels", Parser::StringArray)
        .param("multi_label", Parser::Boolean)
        // generation and summarization
        .param("max_length", Parser::Integer)
        .param("max_time", Parser::Float)
        .param("min_length", Parser::Integer)
        .param("repetition_penalty", Parser::Float)
        .param("temperature", Parser::Float)
        .param("top_k", Parser::Integer)
        .param("top_p", Parser::Float)
}

/// Inference request after the model and cache flag are pulled out
#[derive(Debug, PartialEq)]
struct Inference {
    model: String,
    use_cache: bool,
    body: Value,
}

/// `{context, question}` for question answering, else plain `inputs`.
fn resolve_inputs(inputs: Option<Value>, context: Option<Value>, question: Option<Value>) -> Value {
    match (context, question) {
        (Some(context), Some(question)) if is_truthy(&context) && is_truthy(&question) => {
            json!({ "context": context, "question": question })
        }
        _ => inputs.unwrap_or(Value::Null),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn inference_from_query(state: &AppState, query: Option<&str>) -> Inference {
    let pairs = query_pairs(query);
    let text = |key: &str| {
        pairs
            .raw(key)
            .filter(|v| !v.is_empty())
            .map(|v| v.into_owned())
    };

    let parameters = normalize(&pairs, &query_spec(), RESERVED);
    let inputs = resolve_inputs(
        Some(Value::String(text("inputs").unwrap_or_default())),
        text("context").map(Value::String),
        text("question").map(Value::String),
    );
    let model = state
        .huggingface
        .resolve_model(text("model").as_deref(), text("task").as_deref());

    Inference {
        model,
        use_cache: text("use_cache").as_deref() == Some("true"),
        body: json!({ "inputs": inputs, "parameters": parameters }),
    }
}

fn inference_from_json(state: &AppState, mut body: Map<String, Value>) -> Inference {
    let inputs = body.remove("inputs");
    let context = body.remove("context");
    let question = body.remove("question");
    let explicit_model = body.remove("model");
    let task = body.remove("task");
    let use_cache = body
        .remove("use_cache")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let model = state.huggingface.resolve_model(
        explicit_model.as_ref().and_then(Value::as_str),
        task.as_ref().and_then(Value::as_str),
    );
    let parameters: Map<String, Value> = body
        .into_iter()
        .filter(|(key, _)| !RESERVED.contains(&key.as_str()))
        .collect();

    Inference {
        model,
        use_cache,
        body: json!({
            "inputs": resolve_inputs(inputs, context, question),
            "parameters": parameters,
        }),
    }
}

async fn run_inference(state: &AppState, headers: &HeaderMap, inference: Inference) -> AppResult<Response> {
    let path = format!("/models/{}", inference.model);
    let call = JsonCall::new(path, &inference.body)
        .model(inference.model.as_str())
        .caller_headers(headers)
        .header(USE_CACHE_HEADER, cache_value(inference.use_cache));

    state.upstream.post_json(&state.huggingface, call).await
}

fn cache_value(use_cache: bool) -> HeaderValue {
    HeaderValue::from_static(if use_cache { "true" } else { "false" })
}

/// `GET /` - health check, or inference from query parameters
pub async fn get_inference(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> AppResult<Response> {
    if health::is_health_check(query.as_deref(), state.secret_gate.secret()) {
        return Ok(health::ok().await.into_response());
    }

    let start = Instant::now();
    let inference = inference_from_query(&state, query.as_deref());
    observe(ROUTE, start, run_inference(&state, &headers, inference).await)
}

/// `POST /` - inference from a JSON body
pub async fn post_inference(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let start = Instant::now();
    let json = chat::parse_json_object(&body)?;
    let inference = inference_from_json(&state, json);
    observe(ROUTE, start, run_inference(&state, &headers, inference).await)
}

/// `POST /chat/completions` - chat body sent to the model's chat endpoint
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let start = Instant::now();
    let body = chat::with_default_model(
        chat::parse_json_object(&body)?,
        &state.huggingface.default_model,
    );
    let model = chat::model_of(&body).unwrap_or_else(|| state.huggingface.default_model.clone());
    let path = format!("/models/{}/v1/chat/completions", model);

    let call = JsonCall::new(path, &body)
        .streaming(chat::is_streaming(&body))
        .model(model.as_str())
        .caller_headers(&headers)
        .header(USE_CACHE_HEADER, cache_value(false));

    observe(ROUTE, start, state.upstream.post_json(&state.huggingface, call).await)
}

/// Any other path - proxied to the inference host
pub async fn proxy(State(state): State<Arc<AppState>>, request: Request) -> AppResult<Response> {
    let start = Instant::now();
    let route = &state.huggingface;

    let use_cache = request
        .headers()
        .get(&USE_CACHE_HEADER)
        .cloned()
        .unwrap_or_else(|| cache_value(false));

    let options = state
        .forward_options(ROUTE, route.host())
        .with_token(route.token.clone())
        .with_api_key_auth(route.use_api_key_auth)
        .add_headers(&route.extra_headers)
        .add_header(USE_CACHE_HEADER, use_cache);

    observe(ROUTE, start, state.engine.forward(request, options).await)
}
