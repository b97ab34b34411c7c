//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::security::headers::RELAY_USER_AGENT;

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Outbound forwarding behaviour.
    pub relay: ForwardConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Interception layer settings.
    pub intercept: InterceptConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Outbound forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// User-agent presented to upstream targets.
    pub user_agent: String,

    /// Maximum number of redirects followed before giving up.
    pub max_redirects: usize,

    /// Upper bound on a page buffered by the rewrite path.
    pub max_page_bytes: usize,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            user_agent: RELAY_USER_AGENT.to_string(),
            max_redirects: 10,
            max_page_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Timeout configuration for outbound and inbound operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Outbound connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed until the response head is produced.
    /// Unset means the relay imposes no deadline of its own.
    pub request_secs: Option<u64>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: None,
        }
    }
}

/// Interception layer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InterceptConfig {
    /// Serve absolute-form (forward proxy) requests through the interceptor.
    pub enabled: bool,

    /// Rewrite engine name ("none" or "bare").
    pub engine: String,

    /// Relay base URL used by the "bare" engine.
    pub relay_url: String,

    /// Hosts delegated to the engine.
    pub delegate_hosts: Vec<String>,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            engine: "none".to_string(),
            relay_url: "http://127.0.0.1:8080".to_string(),
            delegate_hosts: Vec::new(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
