//! Header sanitization for relayed traffic.
//!
//! # Responsibilities
//! - Strip origin-identifying fields before a request leaves the relay
//! - Present a fixed user-agent upstream
//! - Strip length/coding fields the relay re-frames on the way back
//! - Add permissive CORS fields to relayed responses
//!
//! # Design Decisions
//! - Pure functions over `HeaderMap`: no state, applying twice is a no-op
//! - Name matching is case-insensitive (`HeaderName` is lowercase)
//! - Order and duplicates of the remaining fields are preserved

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

/// User-agent presented to upstream targets.
pub const RELAY_USER_AGENT: &str = concat!("bare-relay/", env!("CARGO_PKG_VERSION"));

/// Request fields that would reveal the relay's origin to the target.
pub static REQUEST_STRIP: [HeaderName; 3] = [header::HOST, header::ORIGIN, header::REFERER];

/// Response fields describing framing the relay does not preserve.
pub static RESPONSE_STRIP: [HeaderName; 3] = [
    header::CONTENT_ENCODING,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
];

/// Fields removed on the credentials-omitted proxy-rewrite path.
pub static PROXY_REWRITE_STRIP: [HeaderName; 4] = [
    header::ORIGIN,
    header::REFERER,
    header::COOKIE,
    header::AUTHORIZATION,
];

/// Sanitize an inbound request header set before forwarding it.
pub fn sanitize_request(headers: HeaderMap) -> HeaderMap {
    sanitize_request_with(headers, &HeaderValue::from_static(RELAY_USER_AGENT))
}

/// Same as [`sanitize_request`] with an operator-chosen user-agent.
pub fn sanitize_request_with(mut headers: HeaderMap, user_agent: &HeaderValue) -> HeaderMap {
    for name in REQUEST_STRIP.iter() {
        headers.remove(name);
    }
    headers.insert(header::USER_AGENT, user_agent.clone());
    headers
}

/// Sanitize a forwarded response header set before relaying it.
pub fn sanitize_response(mut headers: HeaderMap) -> HeaderMap {
    for name in RESPONSE_STRIP.iter() {
        headers.remove(name);
    }
    // insert() replaces every existing value for the name
    let any = HeaderValue::from_static("*");
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, any.clone());
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, any.clone());
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, any);
    headers
}

/// Strip origin and credential fields for a cross-origin, credentials-omitted fetch.
pub fn strip_proxy_request(mut headers: HeaderMap) -> HeaderMap {
    for name in PROXY_REWRITE_STRIP.iter() {
        headers.remove(name);
    }
    headers
}
