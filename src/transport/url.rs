//! Encoded-URL convention shared by `/bare/` and `/proxy/`.
//!
//! A target URL travels as a single percent-encoded path segment
//! (`encodeURIComponent` semantics). Decoding accepts only well-formed
//! escapes that yield an absolute `http`/`https` URL.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::transport::error::{RelayError, RelayResult};

/// Path prefix of the bare transport endpoint.
pub const BARE_PREFIX: &str = "/bare/";

/// Path prefix of the rewrite path.
pub const PROXY_PREFIX: &str = "/proxy/";

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a target URL as one path segment.
pub fn encode_target(target: &str) -> String {
    utf8_percent_encode(target, COMPONENT).to_string()
}

/// Check that a parsed URL is usable as a relay target.
pub fn validate_target(url: &Url) -> RelayResult<()> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(RelayError::invalid_target(
            url.as_str(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(RelayError::invalid_target(url.as_str(), "missing host"));
    }
    Ok(())
}

/// Decode an encoded target segment into an absolute http(s) URL.
pub fn decode_target(encoded: &str) -> RelayResult<Url> {
    if let Some(reason) = check_percent_encoding(encoded) {
        return Err(RelayError::invalid_target(encoded, reason));
    }

    let decoded = percent_decode_str(encoded)
        .decode_utf8()
        .map_err(|e| RelayError::invalid_target(encoded, format!("not UTF-8 after decoding: {}", e)))?;

    if decoded.is_empty() {
        return Err(RelayError::invalid_target(encoded, "empty target"));
    }

    let url = Url::parse(&decoded).map_err(|e| RelayError::invalid_target(decoded.to_string(), e.to_string()))?;
    validate_target(&url)?;
    Ok(url)
}

/// Decode the target carried by a request path under `prefix`.
pub fn target_from_path(path: &str, prefix: &str) -> RelayResult<Url> {
    match path.strip_prefix(prefix) {
        Some(encoded) => decode_target(encoded),
        None => Err(RelayError::invalid_target(path, format!("path does not start with {}", prefix))),
    }
}

/// Build the `/bare/` path for a target.
pub fn bare_path(target: &Url) -> String {
    format!("{}{}", BARE_PREFIX, encode_target(target.as_str()))
}

/// Build the `/proxy/` path for a target.
pub fn proxy_path(target: &str) -> String {
    format!("{}{}", PROXY_PREFIX, encode_target(target))
}

/// Return a description of the first malformed `%` escape, if any.
fn check_percent_encoding(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            match escape {
                Some([a, b]) if a.is_ascii_hexdigit() && b.is_ascii_hexdigit() => i += 3,
                _ => return Some(format!("malformed percent-encoding at byte {}", i)),
            }
        } else {
            i += 1;
        }
    }
    None
}
