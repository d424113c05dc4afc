//! Shared-secret admission middleware
//!
//! Looks for an `X-Api-Key` header or `?api_key=` query parameter and compares
//! it to the configured secret. Without a configured secret the gateway is
//! public. When both are presented the query parameter wins.

use axum::{
    extract::{Request, State},
    http::HeaderName,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, instrument, warn};

use crate::error::AppError;

/// Header carrying the gateway secret
pub const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// Query parameter carrying the gateway secret
pub const API_KEY_PARAM: &str = "api_key";

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allow,
    Reject,
}

/// Decide whether a request presenting these keys may proceed.
pub fn admit(
    configured: Option<&str>,
    header_key: Option<&str>,
    query_key: Option<&str>,
) -> Admission {
    let Some(secret) = configured else {
        return Admission::Allow;
    };

    match query_key.or(header_key) {
        Some(presented) if keys_match(secret, presented) => Admission::Allow,
        _ => Admission::Reject,
    }
}

/// Constant-time comparison over SHA-256 digests, so neither length nor
/// common prefixes leak through timing.
fn keys_match(expected: &str, presented: &str) -> bool {
    let expected = Sha256::digest(expected.as_bytes());
    let presented = Sha256::digest(presented.as_bytes());
    expected.as_slice().ct_eq(presented.as_slice()).into()
}

/// First `api_key` value in a raw query string
pub fn query_api_key(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(k, _)| k == API_KEY_PARAM)
        .map(|(_, v)| v.into_owned())
}

/// Process-wide secret, set once at startup
#[derive(Debug, Clone, Default)]
pub struct SecretGate {
    secret: Option<String>,
}

impl SecretGate {
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    pub fn admit(&self, header_key: Option<&str>, query_key: Option<&str>) -> Admission {
        admit(self.secret(), header_key, query_key)
    }
}

/// Secret admission middleware
///
/// Runs before every other layer except tracing, including CORS and the
/// health check.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn secret_middleware(
    State(gate): State<SecretGate>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !gate.is_enabled() {
        return Ok(next.run(request).await);
    }

    let admission = {
        let header_key = request
            .headers()
            .get(&API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        let query_key = query_api_key(request.uri().query());
        gate.admit(header_key, query_key.as_deref())
    };

    match admission {
        Admission::Allow => {
            debug!("Secret accepted");
            Ok(next.run(request).await)
        }
        Admission::Reject => {
            warn!("Secret missing or mismatched");
            Err(AppError::Unauthorized)
        }
    }
}
