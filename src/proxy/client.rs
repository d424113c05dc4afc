//! JSON upstream client
//!
//! Used by routes that build the upstream body themselves. Follows the same
//! host and credential rules as [`ProxyEngine`](super::engine::ProxyEngine):
//! the scheme is forced, a caller's `Authorization` wins over the route token,
//! and responses are relayed as streams.

use axum::{
    body::Body,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Response,
    },
};
use reqwest::header::HeaderMap;
use serde::Serialize;
use tracing::Instrument;

use crate::error::{AppError, AppResult};
use crate::proxy::engine::relay_response;
use crate::proxy::headers::apply_credentials;
use crate::proxy::logging::RequestContext;
use crate::proxy::route::RouteConfig;

/// One JSON POST to an upstream route
#[derive(Debug)]
pub struct JsonCall<'a, T: Serialize> {
    /// Path appended to the route's host and prefix
    pub path: String,
    pub body: &'a T,
    pub streaming: bool,
    pub model: Option<String>,
    /// Inbound `Authorization`, forwarded in place of the route token
    pub caller_authorization: Option<HeaderValue>,
    pub extra_headers: HeaderMap,
}

impl<'a, T: Serialize> JsonCall<'a, T> {
    pub fn new(path: impl Into<String>, body: &'a T) -> Self {
        Self {
            path: path.into(),
            body,
            streaming: false,
            model: None,
            caller_authorization: None,
            extra_headers: HeaderMap::new(),
        }
    }

    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Take the caller's `Authorization` header, if any.
    pub fn caller_headers(mut self, inbound: &HeaderMap) -> Self {
        self.caller_authorization = inbound.get(AUTHORIZATION).cloned();
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.extra_headers.insert(name, value);
        self
    }
}

/// Client for routes that post a constructed JSON body
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    scheme: &'static str,
}

impl UpstreamClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            scheme: "https",
        }
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub fn with_insecure_upstream(mut self) -> Self {
        self.scheme = "http";
        self
    }

    /// POST `call.body` to `route` and relay the response.
    pub async fn post_json<T: Serialize>(
        &self,
        route: &RouteConfig,
        call: JsonCall<'_, T>,
    ) -> AppResult<Response<Body>> {
        let url = format!("{}://{}{}", self.scheme, route.host(), call.path);

        let mut ctx = RequestContext::new(route.name, "POST", &call.path)
            .with_target(route.host())
            .with_streaming(call.streaming);
        if let Some(model) = &call.model {
            ctx = ctx.with_model(model.as_str());
        }
        let span = ctx.create_span();

        async move {
            ctx.log_request_start();

            let headers = self.build_headers(route, &call)?;

            ctx.log_upstream_request(&url);
            let response = self
                .client
                .post(&url)
                .headers(headers)
                .json(call.body)
                .send()
                .await
                .map_err(|e| {
                    ctx.log_connection_error(&e.to_string(), &url);
                    AppError::Network(e)
                })?;

            relay_response(response, &[], &ctx).await
        }
        .instrument(span)
        .await
    }

    fn build_headers<T: Serialize>(
        &self,
        route: &RouteConfig,
        call: &JsonCall<'_, T>,
    ) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let accept = if call.streaming {
            "text/event-stream"
        } else {
            "application/json"
        };
        headers.insert(ACCEPT, HeaderValue::from_static(accept));

        if let Some(auth) = &call.caller_authorization {
            headers.insert(AUTHORIZATION, auth.clone());
        }
        apply_credentials(&mut headers, route.token.as_deref(), route.use_api_key_auth)?;

        for (name, value) in route.extra_headers.iter().chain(call.extra_headers.iter()) {
            headers.insert(name.clone(), value.clone());
        }

        Ok(headers)
    }
}
