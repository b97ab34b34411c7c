//! Error responses produced by the relay itself.
//!
//! # Responsibilities
//! - Map `RelayError` to a plain-text 400/500 for the bare endpoint
//! - Render the synthetic HTML error document used by the interception layer
//!   and the rewrite path
//!
//! # Design Decisions
//! - Every error body carries a human-readable message
//! - Messages embedded in HTML are escaped

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::transport::error::RelayError;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Plain-text error response for a failed relay request.
pub fn relay_error_response(err: &RelayError) -> Response {
    let status = err.status_code();
    let body = match err {
        RelayError::InvalidTarget { reason, .. } => format!("Invalid target: {}", reason),
        other => format!("Proxy error: {}", other),
    };
    (status, body).into_response()
}

/// Synthetic HTML error document (status 500).
pub fn html_error_page(message: &str) -> Response {
    let body = format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Relay Error</title>
<style>
body {{ font-family: Arial, sans-serif; padding: 40px; text-align: center; background: #f0f0f0; }}
.error {{ background: white; padding: 30px; border-radius: 10px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }}
h1 {{ color: #ff4757; }}
</style>
</head>
<body>
<div class="error">
<h1>Proxy Error</h1>
<p>{}</p>
<p>Try refreshing the page or checking the URL.</p>
<button onclick="location.reload()">Refresh Page</button>
</div>
</body>
</html>
"#,
        escape_html(message)
    );

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE))],
        body,
    )
        .into_response()
}

/// HTML response with the relay's content type.
pub fn html_response(status: StatusCode, headers: axum::http::HeaderMap, html: String) -> Response {
    let mut response = (status, html).into_response();
    let response_headers = response.headers_mut();
    for (name, value) in headers.iter() {
        response_headers.append(name.clone(), value.clone());
    }
    response_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
    response
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
