//! Header utilities for upstream forwarding
//!
//! Hop-by-hop filtering, credential injection, `Vary` merging and the
//! `headers=` directive syntax used by the generic proxy route.

use axum::http::header::{self, HeaderName};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, VARY};

use crate::error::{AppError, AppResult};
use crate::middleware::secret::API_KEY_HEADER;

/// Hop-by-hop headers that must never be forwarded
const HOP_BY_HOP_HEADERS: &[HeaderName] = &[
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Check if a header is a hop-by-hop header that should not be forwarded
pub fn is_hop_by_hop_header(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(name) || name.as_str() == "keep-alive"
}

/// Copy inbound request headers for the outbound request, minus hop-by-hop
/// headers and `Host` (which the caller sets to the upstream host).
pub fn filter_request_headers(incoming: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(incoming.len());

    for (name, value) in incoming {
        if !is_hop_by_hop_header(name) && name != header::HOST {
            filtered.append(name.clone(), value.clone());
        }
    }

    filtered
}

/// Filter hop-by-hop headers and explicitly removed headers from a response.
///
/// Every other upstream header is preserved, including repeated ones.
pub fn filter_response_headers(response_headers: &HeaderMap, remove: &[HeaderName]) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(response_headers.len());

    for (name, value) in response_headers {
        if !is_hop_by_hop_header(name) && !remove.contains(name) {
            filtered.append(name.clone(), value.clone());
        }
    }

    filtered
}

/// Attach an upstream token unless the caller already brought an
/// `Authorization` header. API-key style upstreams get `X-Api-Key` instead
/// of a bearer token.
pub fn apply_credentials(
    headers: &mut HeaderMap,
    token: Option<&str>,
    use_api_key_auth: bool,
) -> AppResult<()> {
    let Some(token) = token else {
        return Ok(());
    };
    if headers.contains_key(AUTHORIZATION) {
        return Ok(());
    }

    let (name, value) = if use_api_key_auth {
        (API_KEY_HEADER, HeaderValue::from_str(token))
    } else {
        (AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token)))
    };
    let mut value = value
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid upstream token: {}", e)))?;
    value.set_sensitive(true);
    headers.insert(name, value);

    Ok(())
}

/// Ensure `Vary` lists `Origin`, keeping any existing values after it.
pub fn merge_vary_origin(headers: &mut HeaderMap) {
    let existing: Vec<String> = headers
        .get_all(VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect();

    let already = existing.iter().any(|v| {
        v.split(',')
            .map(str::trim)
            .any(|t| t == "*" || t.eq_ignore_ascii_case("origin"))
    });
    if already {
        return;
    }

    let merged = if existing.is_empty() {
        "Origin".to_string()
    } else {
        format!("Origin, {}", existing.join(", "))
    };
    if let Ok(value) = HeaderValue::from_str(&merged) {
        headers.insert(VARY, value);
    }
}

/// Parsed `headers=` query directives
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HeaderDirectives {
    /// Set on the outbound request
    pub add: HeaderMap,
    /// Stripped from the relayed response
    pub remove: Vec<HeaderName>,
}

/// Parse a comma-separated list of `key=value` and `-key` entries.
pub fn parse_header_directives(raw: &str) -> AppResult<HeaderDirectives> {
    let mut directives = HeaderDirectives::default();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        if let Some(name) = entry.strip_prefix('-') {
            directives.remove.push(parse_header_name(name.trim())?);
            continue;
        }

        let (name, value) = entry.split_once('=').ok_or_else(|| {
            AppError::BadRequest(format!(
                "Invalid header directive \"{}\": expected key=value or -key",
                entry
            ))
        })?;
        let name = parse_header_name(name.trim())?;
        let value = HeaderValue::from_str(value.trim()).map_err(|_| {
            AppError::BadRequest(format!("Invalid value for header \"{}\"", name))
        })?;
        directives.add.insert(name, value);
    }

    Ok(directives)
}

fn parse_header_name(name: &str) -> AppResult<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| AppError::BadRequest(format!("Invalid header name \"{}\"", name)))
}
