//! Bare transport endpoint: `ANY /bare/<percent-encoded absolute URL>`.
//!
//! # Request States
//! ```text
//! RECEIVE → DECODE → SANITIZE → FORWARD → STREAM_RESPONSE → DONE
//!              │                    │
//!              └→ 400               └→ 500
//! ```
//!
//! # Design Decisions
//! - The target is taken from the raw (still encoded) path; the inbound
//!   query string is not part of it
//! - Upstream status is relayed verbatim
//! - A client that disconnects mid-body just drops the stream

use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::{IntoResponse, Response};

use crate::http::request::{remove_relay_request_id, request_id_of};
use crate::http::response::relay_error_response;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::headers::{sanitize_request_with, sanitize_response};
use crate::transport::forwarder::{carries_body, ForwardResult, OutboundRequest};
use crate::transport::url::{target_from_path, BARE_PREFIX};

const ROUTE: &str = "bare";

/// Handle one bare transport request.
pub async fn bare_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id_of(&request);
    let (mut parts, body) = request.into_parts();
    remove_relay_request_id(&mut parts.headers, &parts.extensions);
    let method = parts.method.clone();

    let target = match target_from_path(parts.uri.path(), BARE_PREFIX) {
        Ok(target) => target,
        Err(e) => {
            tracing::warn!(request_id = %request_id, path = %parts.uri.path(), error = %e, "Rejected bare target");
            let response = relay_error_response(&e);
            metrics::record_request(ROUTE, method.as_str(), response.status().as_u16(), start);
            return response;
        }
    };

    tracing::debug!(request_id = %request_id, method = %method, target = %target, "Relaying bare request");

    let headers = sanitize_request_with(parts.headers, &state.user_agent);
    let body = if carries_body(&method) { body } else { Body::empty() };
    let outbound = OutboundRequest::new(method.clone(), target.clone())
        .with_headers(headers)
        .with_body(body);

    match state.forwarder.forward(outbound).await {
        Ok(result) => {
            metrics::record_request(ROUTE, method.as_str(), result.status.as_u16(), start);
            tracing::debug!(
                request_id = %request_id,
                target = %target,
                status = %result.status,
                "Streaming upstream response"
            );
            ForwardResult::new(result.status, sanitize_response(result.headers), result.body).into_response()
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, target = %target, error = %e, "Bare relay failed");
            metrics::record_upstream_error(ROUTE);
            let response = relay_error_response(&e);
            metrics::record_request(ROUTE, method.as_str(), response.status().as_u16(), start);
            response
        }
    }
}
