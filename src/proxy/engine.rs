//! Reverse-proxy engine
//!
//! Rewrites an inbound request onto an upstream host, injects credentials
//! and headers, and relays the upstream response. Bodies are streamed in
//! both directions; only error responses are buffered.

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Method, Request, Response, Uri},
};
use reqwest::header::HeaderMap;
use tracing::{debug, Instrument};
use url::{form_urlencoded, Url};

use crate::error::{AppError, AppResult};
use crate::proxy::headers::{apply_credentials, filter_request_headers, filter_response_headers};
use crate::proxy::logging::RequestContext;

/// How a single request is forwarded
#[derive(Debug, Clone, Default)]
pub struct ForwardOptions {
    /// Route family, for logs
    pub route: &'static str,
    /// Upstream host, optionally with a scheme and path prefix
    pub target_host: String,
    pub token: Option<String>,
    pub use_api_key_auth: bool,
    /// Set on the outbound request, overwriting inbound values
    pub add_headers: HeaderMap,
    /// Dropped from the inbound headers before forwarding
    pub strip_request_headers: Vec<HeaderName>,
    /// Dropped from the relayed response
    pub remove_response_headers: Vec<HeaderName>,
    /// Query parameters that configure the gateway itself
    pub strip_query: Vec<&'static str>,
}

impl ForwardOptions {
    pub fn new(route: &'static str, target_host: impl Into<String>) -> Self {
        Self {
            route,
            target_host: target_host.into(),
            ..Default::default()
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_api_key_auth(mut self, use_api_key_auth: bool) -> Self {
        self.use_api_key_auth = use_api_key_auth;
        self
    }

    pub fn add_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.add_headers.insert(name, value);
        self
    }

    pub fn add_headers(mut self, headers: &HeaderMap) -> Self {
        for (name, value) in headers {
            self.add_headers.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn strip_request_header(mut self, name: HeaderName) -> Self {
        self.strip_request_headers.push(name);
        self
    }

    pub fn remove_response_headers(mut self, names: impl IntoIterator<Item = HeaderName>) -> Self {
        self.remove_response_headers.extend(names);
        self
    }

    pub fn strip_query_param(mut self, key: &'static str) -> Self {
        self.strip_query.push(key);
        self
    }
}

/// Forwards requests to upstream hosts over a shared HTTP client
#[derive(Debug, Clone)]
pub struct ProxyEngine {
    client: reqwest::Client,
    scheme: &'static str,
}

impl ProxyEngine {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            scheme: "https",
        }
    }

    /// Forward over plain http, for tests that point at a local mock server.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn with_insecure_upstream(mut self) -> Self {
        self.scheme = "http";
        self
    }

    /// Forward `request` according to `options` and relay the response.
    pub async fn forward(
        &self,
        request: Request<Body>,
        options: ForwardOptions,
    ) -> AppResult<Response<Body>> {
        let (parts, body) = request.into_parts();
        let url = rewrite_url(self.scheme, &options.target_host, &parts.uri, &options.strip_query)?;
        let authority = url[url::Position::BeforeHost..url::Position::AfterPort].to_string();

        let ctx = RequestContext::new(options.route, parts.method.as_str(), parts.uri.path())
            .with_target(authority.as_str());
        let span = ctx.create_span();

        async move {
            ctx.log_request_start();

            let mut headers = filter_request_headers(&parts.headers);
            for name in &options.strip_request_headers {
                headers.remove(name);
            }
            let host = HeaderValue::from_str(&authority)
                .map_err(|_| AppError::BadRequest(format!("Invalid upstream host \"{}\"", authority)))?;
            headers.insert(header::HOST, host);
            apply_credentials(&mut headers, options.token.as_deref(), options.use_api_key_auth)?;
            for (name, value) in &options.add_headers {
                headers.insert(name.clone(), value.clone());
            }

            let mut builder = self
                .client
                .request(parts.method.clone(), url.as_str())
                .headers(headers);
            if parts.method != Method::GET && parts.method != Method::HEAD {
                builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
            }

            ctx.log_upstream_request(url.as_str());
            let response = builder.send().await.map_err(|e| {
                ctx.log_connection_error(&e.to_string(), url.as_str());
                AppError::Network(e)
            })?;

            relay_response(response, &options.remove_response_headers, &ctx).await
        }
        .instrument(span)
        .await
    }
}

/// Turn an upstream response into a gateway response.
///
/// Success bodies are streamed as they arrive. Anything else is read in
/// full and surfaced as [`AppError::Upstream`] with the upstream status.
pub(crate) async fn relay_response(
    response: reqwest::Response,
    remove: &[HeaderName],
    ctx: &RequestContext,
) -> AppResult<Response<Body>> {
    let status = response.status();
    ctx.log_upstream_response(status.as_u16(), response.content_length());

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        ctx.log_upstream_error(status.as_u16(), &text);
        return Err(AppError::Upstream {
            status,
            message: text,
        });
    }

    let headers = filter_response_headers(response.headers(), remove);
    let mut relayed = Response::new(Body::from_stream(response.bytes_stream()));
    *relayed.status_mut() = status;
    *relayed.headers_mut() = headers;
    Ok(relayed)
}

/// Strip a leading `scheme://` and any trailing slash.
pub fn strip_scheme(target_host: &str) -> &str {
    let host = match target_host.find("://") {
        Some(idx) => &target_host[idx + 3..],
        None => target_host,
    };
    host.trim_end_matches('/')
}

/// Build the upstream URL: the inbound path and query on the target host,
/// with the gateway's own control parameters removed.
///
/// Every kept query segment is copied byte for byte.
pub fn rewrite_url(scheme: &str, target_host: &str, uri: &Uri, strip: &[&str]) -> AppResult<Url> {
    let host = strip_scheme(target_host);
    if host.is_empty() || host.starts_with('/') {
        return Err(AppError::BadRequest(format!(
            "Invalid upstream host \"{}\"",
            target_host
        )));
    }

    let mut raw = format!("{}://{}{}", scheme, host, uri.path());
    if let Some(query) = uri.query().and_then(|q| strip_query(q, strip)) {
        raw.push('?');
        raw.push_str(&query);
    }

    debug!(url = %raw, "Rewrote upstream URL");
    Url::parse(&raw).map_err(|e| {
        AppError::BadRequest(format!("Invalid upstream host \"{}\": {}", target_host, e))
    })
}

fn strip_query(query: &str, strip: &[&str]) -> Option<String> {
    let kept: Vec<&str> = query
        .split('&')
        .filter(|segment| {
            let key = form_urlencoded::parse(segment.as_bytes()).next().map(|(k, _)| k);
            !key.is_some_and(|k| strip.contains(&&*k))
        })
        .collect();

    let query = kept.join("&");
    (!query.is_empty()).then_some(query)
}
