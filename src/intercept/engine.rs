//! Rewrite engine capability.
//!
//! The content-rewriting engine is external; the interception layer only
//! needs three operations from it: `init`, `route` and `fetch`.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::config::InterceptConfig;
use crate::intercept::context::InterceptedRequest;
use crate::transport::client::BareClient;
use crate::transport::error::{RelayError, RelayResult};
use crate::transport::forwarder::{carries_body, ForwardResult, Forwarder, HttpForwarder, OutboundRequest};

/// Engine names accepted in `intercept.engine`.
pub const ENGINE_NAMES: [&str; 2] = ["none", "bare"];

/// Capability set of a rewrite engine.
pub trait RewriteEngine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Prepare the engine. Runs once, before its context is activated.
    fn init(&self) -> BoxFuture<'_, RelayResult<()>>;

    /// Whether the engine claims this request. Must not depend on mutable state.
    fn route(&self, request: &InterceptedRequest) -> bool;

    /// Produce the response for a claimed request.
    fn fetch(&self, request: InterceptedRequest) -> BoxFuture<'_, RelayResult<ForwardResult>>;
}

/// Engine that never claims anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEngine;

impl RewriteEngine for NoopEngine {
    fn name(&self) -> &str {
        "none"
    }

    fn init(&self) -> BoxFuture<'_, RelayResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn route(&self, _request: &InterceptedRequest) -> bool {
        false
    }

    fn fetch(&self, request: InterceptedRequest) -> BoxFuture<'_, RelayResult<ForwardResult>> {
        Box::pin(async move {
            Err(RelayError::Engine {
                engine: "none".to_string(),
                message: format!("no engine to fetch {}", request.url),
            })
        })
    }
}

/// Sends claimed requests through a bare transport.
pub struct BareTransportEngine {
    hosts: Vec<String>,
    transport: Arc<dyn Forwarder>,
}

impl BareTransportEngine {
    pub fn new(hosts: Vec<String>, transport: Arc<dyn Forwarder>) -> Self {
        let hosts = hosts.into_iter().map(|h| h.to_ascii_lowercase()).collect();
        Self { hosts, transport }
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }
}

impl RewriteEngine for BareTransportEngine {
    fn name(&self) -> &str {
        "bare"
    }

    fn init(&self) -> BoxFuture<'_, RelayResult<()>> {
        Box::pin(async move {
            if self.hosts.is_empty() {
                tracing::warn!("Bare engine has no delegate hosts and will not claim any request");
            }
            tracing::info!(hosts = ?self.hosts, "Bare engine initialized");
            Ok(())
        })
    }

    fn route(&self, request: &InterceptedRequest) -> bool {
        request
            .url
            .host_str()
            .map(|host| self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host)))
            .unwrap_or(false)
    }

    fn fetch(&self, request: InterceptedRequest) -> BoxFuture<'_, RelayResult<ForwardResult>> {
        Box::pin(async move {
            let body = if carries_body(&request.method) {
                request.body
            } else {
                axum::body::Body::empty()
            };
            let outbound = OutboundRequest::new(request.method, request.url)
                .with_headers(request.headers)
                .with_body(body);
            self.transport.forward(outbound).await
        })
    }
}

/// Build the engine named in the configuration.
pub fn engine_from_config(
    config: &InterceptConfig,
    http: HttpForwarder,
) -> RelayResult<Arc<dyn RewriteEngine>> {
    match config.engine.as_str() {
        "none" => Ok(Arc::new(NoopEngine)),
        "bare" => {
            let client = BareClient::new(&config.relay_url, http)?;
            Ok(Arc::new(BareTransportEngine::new(
                config.delegate_hosts.clone(),
                Arc::new(client),
            )))
        }
        other => Err(RelayError::Engine {
            engine: other.to_string(),
            message: "unknown engine".to_string(),
        }),
    }
}
