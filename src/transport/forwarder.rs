//! Outbound request forwarding.
//!
//! # Responsibilities
//! - Issue exactly one outbound request per call (no retries)
//! - Follow redirects so callers only see a terminal status
//! - Stream request and response bodies without buffering them
//!
//! # Design Decisions
//! - `Forwarder` is a trait so the endpoint, interceptor and rewrite path can
//!   run against stubs
//! - The HTTP client owns connection framing; hop-by-hop fields, `host` and
//!   `accept-encoding` are dropped before sending
//! - Response bodies are decoded (gzip/br/deflate) by the client

use std::time::Duration;

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use url::Url;

use crate::config::RelayConfig;
use crate::transport::error::{RelayError, RelayResult};
use crate::transport::url::validate_target;

/// Connection-scoped fields that never cross the relay.
pub static HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHORIZATION,
    header::PROXY_AUTHENTICATE,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// A request about to leave the relay.
#[derive(Debug)]
pub struct OutboundRequest {
    pub target: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Body,
}

impl OutboundRequest {
    /// Create a request with no headers and an empty body.
    pub fn new(method: Method, target: Url) -> Self {
        Self {
            target,
            method,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }
}

/// Terminal upstream response. The body has not been read yet.
#[derive(Debug)]
pub struct ForwardResult {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

impl ForwardResult {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Body) -> Self {
        Self { status, headers, body }
    }
}

impl IntoResponse for ForwardResult {
    fn into_response(self) -> Response {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Performs the real network request for a relayed call.
pub trait Forwarder: Send + Sync {
    /// Forward `request` and return the terminal response.
    ///
    /// Fails with [`RelayError::InvalidTarget`] before any I/O when the target
    /// is not http(s), and with [`RelayError::Fetch`] on transport failure.
    fn forward(&self, request: OutboundRequest) -> BoxFuture<'_, RelayResult<ForwardResult>>;
}

/// Whether a request with this method carries a body upstream.
pub fn carries_body(method: &Method) -> bool {
    method != Method::GET && method != Method::HEAD
}

/// Drop hop-by-hop fields from a header set, including those named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed.iter() {
        headers.remove(name);
    }
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}

/// `reqwest`-backed forwarder used in production.
#[derive(Clone)]
pub struct HttpForwarder {
    client: reqwest::Client,
}

impl HttpForwarder {
    /// Build the outbound client from configuration.
    pub fn new(config: &RelayConfig) -> RelayResult<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(config.relay.max_redirects))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .no_proxy()
            .build()
            .map_err(|e| RelayError::Fetch(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Forwarder for HttpForwarder {
    fn forward(&self, request: OutboundRequest) -> BoxFuture<'_, RelayResult<ForwardResult>> {
        Box::pin(async move {
            validate_target(&request.target)?;

            let OutboundRequest {
                target,
                method,
                mut headers,
                body,
            } = request;

            strip_hop_by_hop(&mut headers);
            headers.remove(header::HOST);
            headers.remove(header::ACCEPT_ENCODING);

            tracing::debug!(method = %method, target = %target, "Forwarding request upstream");

            let with_body = carries_body(&method);
            if !with_body {
                headers.remove(header::CONTENT_LENGTH);
            }

            let mut builder = self.client.request(method, target.clone()).headers(headers);
            if with_body {
                builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
            }

            let response = builder.send().await.map_err(|e| {
                tracing::warn!(target = %target, error = %e, "Upstream request failed");
                RelayError::fetch(&e)
            })?;

            let status = response.status();
            let mut headers = response.headers().clone();
            strip_hop_by_hop(&mut headers);

            tracing::debug!(
                target = %target,
                final_url = %response.url(),
                status = %status,
                "Upstream responded"
            );

            Ok(ForwardResult {
                status,
                headers,
                body: Body::from_stream(response.bytes_stream()),
            })
        })
    }
}
