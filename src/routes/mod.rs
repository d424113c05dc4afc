//! HTTP routes for Waypoint
//!
//! This module defines all HTTP endpoints exposed by the gateway.

pub mod chat;
pub mod health;
pub mod huggingface;
pub mod metrics;
pub mod openai;
pub mod passthrough;
pub mod perplexity;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{any, get, post, MethodRouter},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    error::AppError,
    middleware::{cors::cors_middleware, secret::secret_middleware, CorsPolicy},
    AppState,
};

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

async fn not_found() -> AppError {
    AppError::NotFound
}

fn with_cors(router: Router<Arc<AppState>>, policy: CorsPolicy) -> Router<Arc<AppState>> {
    router.layer(middleware::from_fn_with_state(policy, cors_middleware))
}

/// Register `method_router` at `path` and its trailing-slash twin.
fn route_both(
    router: Router<Arc<AppState>>,
    path: &str,
    method_router: MethodRouter<Arc<AppState>>,
) -> Router<Arc<AppState>> {
    router
        .route(path, method_router.clone())
        .route(&format!("{}/", path), method_router)
}

/// `nest` serves a family at its bare prefix only, so the trailing-slash
/// base path is registered on the outer router with the family's CORS policy.
fn family_base(
    router: Router<Arc<AppState>>,
    prefix: &str,
    method_router: MethodRouter<Arc<AppState>>,
    policy: CorsPolicy,
) -> Router<Arc<AppState>> {
    router.route(
        &format!("{}/", prefix),
        method_router.layer(middleware::from_fn_with_state(policy, cors_middleware)),
    )
}

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let huggingface_cors = state.cors.clone().with_headers(["X-Use-Cache"]);
    let huggingface_base = get(huggingface::get_inference)
        .post(huggingface::post_inference)
        .fallback(method_not_allowed);
    let huggingface_routes = route_both(
        Router::new().route("/", huggingface_base.clone()),
        "/chat/completions",
        post(huggingface::chat_completions).fallback(method_not_allowed),
    )
    .fallback(huggingface::proxy);

    let perplexity_base = get(perplexity::get_chat)
        .post(perplexity::post_chat)
        .fallback(method_not_allowed);
    let perplexity_routes = route_both(
        Router::new().route("/", perplexity_base.clone()),
        "/chat/completions",
        post(perplexity::chat_completions).fallback(method_not_allowed),
    )
    .fallback(not_found);

    let openai_chat = get(openai::get_chat)
        .post(openai::post_chat)
        .fallback(method_not_allowed);
    let openai_routes = route_both(
        Router::new().route("/", openai_chat.clone()),
        "/chat/completions",
        openai_chat.clone(),
    )
    .fallback(not_found);

    // Each family gets its CORS layer before nesting so the extras stay local
    let root_routes = Router::new()
        .route("/", any(passthrough::root_handler))
        .route("/_waypoint/live", get(health::liveness_check))
        .route("/_waypoint/metrics", get(metrics::prometheus_metrics))
        .fallback(passthrough::passthrough_handler);

    let mut app = with_cors(root_routes, state.cors.clone());
    app = family_base(app, "/huggingface", huggingface_base, huggingface_cors.clone());
    app = family_base(app, "/perplexity", perplexity_base, state.cors.clone());
    app = family_base(app, "/openai", openai_chat, state.cors.clone());

    let mut app = app
        .nest("/huggingface", with_cors(huggingface_routes, huggingface_cors))
        .nest("/perplexity", with_cors(perplexity_routes, state.cors.clone()))
        .nest("/openai", with_cors(openai_routes, state.cors.clone()))
        // Runs before CORS and every handler, health checks included
        .layer(middleware::from_fn_with_state(
            state.secret_gate.clone(),
            secret_middleware,
        ));

    if let Some(seconds) = state.config.request_timeout_seconds {
        app = app.layer(TimeoutLayer::new(Duration::from_secs(seconds)));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}
