//! Configuration validation.
//!
//! Serde handles syntax; this pass checks values. All errors are collected
//! rather than stopping at the first one.

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::RelayConfig;
use crate::intercept::engine::ENGINE_NAMES;

/// Upper bound accepted for `relay.max_redirects`.
pub const MAX_REDIRECT_LIMIT: usize = 50;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.relay.max_redirects > MAX_REDIRECT_LIMIT {
        errors.push(ValidationError::new(
            "relay.max_redirects",
            format!("must be at most {}", MAX_REDIRECT_LIMIT),
        ));
    }
    if config.relay.max_page_bytes == 0 {
        errors.push(ValidationError::new("relay.max_page_bytes", "must be greater than 0"));
    }
    if config.relay.user_agent.trim().is_empty() {
        errors.push(ValidationError::new("relay.user_agent", "must not be empty"));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == Some(0) {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0 when set"));
    }

    let engine = config.intercept.engine.as_str();
    if !ENGINE_NAMES.contains(&engine) {
        errors.push(ValidationError::new(
            "intercept.engine",
            format!("unknown engine '{}' (expected one of {:?})", engine, ENGINE_NAMES),
        ));
    }
    if engine == "bare" {
        match Url::parse(&config.intercept.relay_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(ValidationError::new(
                "intercept.relay_url",
                format!("'{}' is not an absolute http(s) URL", config.intercept.relay_url),
            )),
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
