//! Client side of the bare transport.
//!
//! Sends a request for `target` to `<relay>/bare/<encoded target>` and hands
//! back the relay's status, headers and body stream. Implements `Forwarder`
//! so anything that forwards directly can forward through a relay instead.

use futures_util::future::BoxFuture;
use url::Url;

use crate::transport::error::{RelayError, RelayResult};
use crate::transport::forwarder::{ForwardResult, Forwarder, HttpForwarder, OutboundRequest};
use crate::transport::url::{bare_path, validate_target};

/// Forwarder that routes every request through a relay's `/bare/` endpoint.
#[derive(Clone)]
pub struct BareClient {
    relay: Url,
    http: HttpForwarder,
}

impl BareClient {
    /// Create a client for the relay at `relay` (e.g. `http://127.0.0.1:8080`).
    pub fn new(relay: &str, http: HttpForwarder) -> RelayResult<Self> {
        let relay = Url::parse(relay).map_err(|e| RelayError::invalid_target(relay, e.to_string()))?;
        validate_target(&relay)?;
        Ok(Self { relay, http })
    }

    pub fn relay(&self) -> &Url {
        &self.relay
    }

    /// Relay URL that carries `target`.
    pub fn endpoint_for(&self, target: &Url) -> RelayResult<Url> {
        validate_target(target)?;
        let base = self.relay.as_str().trim_end_matches('/');
        let endpoint = format!("{}{}", base, bare_path(target));
        Url::parse(&endpoint).map_err(|e| RelayError::invalid_target(endpoint.as_str(), e.to_string()))
    }
}

impl Forwarder for BareClient {
    fn forward(&self, request: OutboundRequest) -> BoxFuture<'_, RelayResult<ForwardResult>> {
        Box::pin(async move {
            let endpoint = self.endpoint_for(&request.target)?;
            tracing::debug!(target = %request.target, relay = %self.relay, "Sending through bare transport");

            let relayed = OutboundRequest {
                target: endpoint,
                ..request
            };
            self.http.forward(relayed).await
        })
    }
}
