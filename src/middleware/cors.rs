//! CORS middleware
//!
//! Decides per request whether to attach CORS headers, based on the request's
//! `Origin` and the configured origin glob:
//! - no `Origin` header: no CORS headers at all (server-side and CLI callers)
//! - pattern configured and matched: the origin is echoed with credentials
//! - pattern configured and not matched: no CORS headers, the browser falls
//!   back to same-origin
//! - no pattern, or `*`: `Access-Control-Allow-Origin: *` without credentials
//!
//! `OPTIONS` is answered here with `204` and never reaches a handler.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
            ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN,
        },
        HeaderMap, HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::glob::GlobMatcher;
use crate::proxy::headers::merge_vary_origin;

const BASE_METHODS: [&str; 3] = ["GET", "POST", "OPTIONS"];
const BASE_HEADERS: [&str; 2] = ["Accept", "Content-Type"];

#[derive(Debug, Clone)]
enum AllowedOrigins {
    Any,
    Matching(Arc<GlobMatcher>),
}

/// Process-wide CORS policy, plus per-route extra methods and headers
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: AllowedOrigins,
    secret_configured: bool,
    extra_methods: Vec<String>,
    extra_headers: Vec<String>,
}

/// The headers a single request should get
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsDecision {
    pub allow_origin: String,
    pub allow_credentials: bool,
    pub allow_methods: String,
    pub allow_headers: String,
}

impl CorsPolicy {
    /// Build a policy from the configured origin pattern. The glob is
    /// compiled once here and shared by every request.
    pub fn new(origin_pattern: Option<&str>, secret_configured: bool) -> Self {
        let origins = match origin_pattern {
            Some(pattern) if !pattern.is_empty() && pattern != "*" => {
                AllowedOrigins::Matching(Arc::new(GlobMatcher::compile(pattern)))
            }
            _ => AllowedOrigins::Any,
        };

        Self {
            origins,
            secret_configured,
            extra_methods: Vec::new(),
            extra_headers: Vec::new(),
        }
    }

    /// Advertise additional methods for this route family.
    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_methods.extend(methods.into_iter().map(Into::into));
        self
    }

    /// Advertise additional request headers for this route family.
    pub fn with_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_headers.extend(headers.into_iter().map(Into::into));
        self
    }

    /// Decide the CORS headers for a request, or `None` to attach nothing.
    pub fn evaluate(&self, request_origin: Option<&str>) -> Option<CorsDecision> {
        let request_origin = request_origin?;

        let allow_origin = match &self.origins {
            AllowedOrigins::Any => "*".to_string(),
            AllowedOrigins::Matching(matcher) if matcher.test(request_origin) => {
                request_origin.to_string()
            }
            AllowedOrigins::Matching(matcher) => {
                debug!(
                    origin = %request_origin,
                    pattern = %matcher.pattern(),
                    "Origin not allowed, skipping CORS headers"
                );
                return None;
            }
        };
        let wildcard = allow_origin == "*";

        let allow_methods = BASE_METHODS
            .iter()
            .copied()
            .chain(self.extra_methods.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(", ");

        let mut headers: Vec<&str> = BASE_HEADERS.to_vec();
        if !wildcard {
            headers.push("Authorization");
        }
        if self.secret_configured {
            headers.push("X-Api-Key");
        }
        headers.extend(self.extra_headers.iter().map(String::as_str));

        Some(CorsDecision {
            allow_origin,
            allow_credentials: !wildcard,
            allow_methods,
            allow_headers: headers.join(", "),
        })
    }
}

impl CorsDecision {
    /// Write the decision into response headers. Values that fail header
    /// validation (an origin with control characters) are skipped.
    pub fn apply(&self, headers: &mut HeaderMap, preflight: bool) {
        if let Ok(value) = HeaderValue::from_str(&self.allow_origin) {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        if self.allow_credentials {
            headers.insert(
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        if let Ok(value) = HeaderValue::from_str(&self.allow_methods) {
            headers.insert(ACCESS_CONTROL_ALLOW_METHODS, value);
        }
        if preflight {
            if let Ok(value) = HeaderValue::from_str(&self.allow_headers) {
                headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, value);
            }
        } else {
            merge_vary_origin(headers);
        }
    }
}

/// CORS middleware
///
/// Preflights terminate here with `204` and an empty body. Other requests
/// run through the rest of the stack and get the decided headers merged into
/// whatever response comes back.
pub async fn cors_middleware(
    State(policy): State<CorsPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let decision = policy.evaluate(
        request
            .headers()
            .get(ORIGIN)
            .and_then(|v| v.to_str().ok()),
    );

    if request.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        if let Some(decision) = &decision {
            decision.apply(response.headers_mut(), true);
        }
        return response;
    }

    let mut response = next.run(request).await;
    if let Some(decision) = &decision {
        decision.apply(response.headers_mut(), false);
    }
    response
}
