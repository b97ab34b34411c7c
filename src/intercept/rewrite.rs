//! Rewrite path: fetch an HTML page and point its root-relative links back
//! through `/proxy/`.
//!
//! The rewrite is a literal substitution of `src="/` and `href="/`. Relative
//! (non-root) links, `srcset` and script-built URLs are left alone.

use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::response::Response;
use futures_util::StreamExt;
use url::Url;

use crate::http::request::request_id_of;
use crate::http::response::{html_error_page, html_response};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::headers::{sanitize_request_with, sanitize_response};
use crate::transport::error::{RelayError, RelayResult};
use crate::transport::forwarder::{Forwarder, OutboundRequest};
use crate::transport::url::{proxy_path, target_from_path, PROXY_PREFIX};

const ROUTE: &str = "proxy";

/// A fetched page after link rewriting.
#[derive(Debug)]
pub struct ProxiedPage {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub html: String,
}

/// Fetch `target` and rewrite its root-relative links.
///
/// The body is buffered; anything larger than `max_bytes` is rejected.
pub async fn render_proxied_page(
    forwarder: &dyn Forwarder,
    target: &Url,
    headers: HeaderMap,
    max_bytes: usize,
) -> RelayResult<ProxiedPage> {
    let request = OutboundRequest::new(Method::GET, target.clone()).with_headers(headers);
    let result = forwarder.forward(request).await?;

    let mut buf: Vec<u8> = Vec::new();
    let mut stream = result.body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| RelayError::Fetch(format!("reading page body: {}", e)))?;
        if buf.len() + chunk.len() > max_bytes {
            return Err(RelayError::PageTooLarge { limit: max_bytes });
        }
        buf.extend_from_slice(&chunk);
    }

    let text = String::from_utf8_lossy(&buf);
    Ok(ProxiedPage {
        status: result.status,
        headers: sanitize_response(result.headers),
        html: rewrite_root_relative(&text, target),
    })
}

/// Rewrite `src="/` and `href="/` to load through `/proxy/` from the target's origin.
pub fn rewrite_root_relative(html: &str, target: &Url) -> String {
    let base = format!("{}/", target.origin().ascii_serialization());
    let prefix = proxy_path(&base);
    html.replace("src=\"/", &format!("src=\"{}", prefix))
        .replace("href=\"/", &format!("href=\"{}", prefix))
}

/// `GET /proxy/<encoded url>`: serve the rewritten page.
pub async fn proxy_page_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id_of(&request);

    let result = match target_from_path(request.uri().path(), PROXY_PREFIX) {
        Ok(target) => {
            let headers = sanitize_request_with(HeaderMap::new(), &state.user_agent);
            render_proxied_page(state.forwarder.as_ref(), &target, headers, state.max_page_bytes).await
        }
        Err(e) => Err(e),
    };

    let response = match result {
        Ok(page) => {
            tracing::debug!(request_id = %request_id, status = %page.status, "Serving rewritten page");
            html_response(page.status, page.headers, page.html)
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, path = %request.uri().path(), error = %e, "Rewrite path failed");
            metrics::record_upstream_error(ROUTE);
            html_error_page(&e.to_string())
        }
    };

    metrics::record_request(ROUTE, "GET", response.status().as_u16(), start);
    response
}
