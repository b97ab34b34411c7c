//! Request identification.
//!
//! # Responsibilities
//! - Generate a UUID v4 `x-request-id` for every inbound request
//! - Read it back in handlers for log correlation
//! - Keep relay-generated IDs off outbound requests
//!
//! # Design Decisions
//! - IDs are assigned before tracing so every span carries one
//! - An ID supplied by the client is kept as-is

use axum::body::Body;
use axum::http::{Extensions, HeaderMap, HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRelayRequestId;

impl MakeRequestId for MakeRelayRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let value = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(value))
    }
}

/// Extension marking a request whose `x-request-id` came from the client.
#[derive(Debug, Clone, Copy)]
pub struct ClientRequestId;

/// Outermost middleware: remember whether the client sent its own ID.
pub async fn mark_client_request_id(mut request: Request<Body>, next: Next) -> Response {
    if request.headers().contains_key(X_REQUEST_ID) {
        request.extensions_mut().insert(ClientRequestId);
    }
    next.run(request).await
}

/// Drop the `x-request-id` the relay generated; a client-sent one is forwarded.
pub fn remove_relay_request_id(headers: &mut HeaderMap, extensions: &Extensions) {
    if extensions.get::<ClientRequestId>().is_none() {
        headers.remove(X_REQUEST_ID);
    }
}

/// Request ID of `request`, or "unknown".
pub fn request_id_of<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
