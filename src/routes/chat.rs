//! Shared chat-completion body construction
//!
//! GET routes accept a flat query (`prompt`, `system`, sampling knobs) and
//! turn it into an OpenAI-style chat body. POST routes accept a JSON object.

use serde_json::{json, Map, Value};

use crate::error::{AppError, AppResult};
use crate::params::{normalize, ParamSource, ParamValue, ParseSpec, Parser};

pub const DEFAULT_SYSTEM_PROMPT: &str = "Be precise and concise.";

/// Query rules for chat-style GET requests
pub fn chat_query_spec(default_model: &str) -> ParseSpec {
    ParseSpec::new()
        .param_or("model", Parser::String, default_model)
        .param_or("prompt", Parser::String, "")
        .param_or("system", Parser::String, DEFAULT_SYSTEM_PROMPT)
        .param("max_tokens", Parser::Integer)
        .param("temperature", Parser::Float)
        .param("top_p", Parser::Float)
        .param("top_k", Parser::Integer)
        .param("stream", Parser::Boolean)
        .param("presence_penalty", Parser::Float)
        .param("frequency_penalty", Parser::Float)
        .param("stop", Parser::StringArray)
}

/// Build a chat body from query parameters. `prompt` and `system` become the
/// `messages` array and are not sent as top-level fields.
pub fn chat_body_from_query<S>(source: &S, default_model: &str) -> Map<String, Value>
where
    S: ParamSource + ?Sized,
{
    let params = normalize(source, &chat_query_spec(default_model), &[]);
    let system = params
        .get("system")
        .and_then(ParamValue::as_str)
        .unwrap_or(DEFAULT_SYSTEM_PROMPT)
        .to_string();
    let prompt = params
        .get("prompt")
        .and_then(ParamValue::as_str)
        .unwrap_or_default()
        .to_string();

    let mut body: Map<String, Value> = params
        .into_json()
        .into_iter()
        .filter(|(key, _)| key != "prompt" && key != "system")
        .collect();
    body.insert(
        "messages".to_string(),
        json!([
            { "role": "system", "content": system },
            { "role": "user", "content": prompt },
        ]),
    );
    body
}

/// Parse a request body that must be a JSON object.
pub fn parse_json_object(bytes: &[u8]) -> AppResult<Map<String, Value>> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
        Err(e) => Err(AppError::BadRequest(e.to_string())),
    }
}

/// Fill in `model` when the body names none.
pub fn with_default_model(mut body: Map<String, Value>, default_model: &str) -> Map<String, Value> {
    let missing = body
        .get("model")
        .and_then(Value::as_str)
        .map_or(true, str::is_empty);
    if missing {
        body.insert("model".to_string(), Value::String(default_model.to_string()));
    }
    body
}

pub fn is_streaming(body: &Map<String, Value>) -> bool {
    body.get("stream").and_then(Value::as_bool).unwrap_or(false)
}

pub fn model_of(body: &Map<String, Value>) -> Option<String> {
    body.get("model").and_then(Value::as_str).map(str::to_string)
}
