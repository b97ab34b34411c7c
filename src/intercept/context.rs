//! Routing context and per-request routing decisions.
//!
//! # States
//! - Installed: built, engine not yet initialized; intercepts nothing
//! - Active: authoritative for every request it sees
//! - Superseded: replaced by a newer context; intercepts nothing
//!
//! # State Transitions
//! ```text
//! Installed → Active: activate() after a successful engine init
//! Active → Superseded: a newer context was activated
//! Installed → Superseded: replaced before activation
//! ```
//!
//! # Design Decisions
//! - Decisions are computed once per request and never revised
//! - Priority is fixed: Delegate > ProxyRewrite > Passthrough
//! - A request keeps the context it was decided with, even if superseded

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request};
use url::Url;

use crate::intercept::engine::RewriteEngine;
use crate::transport::error::{RelayError, RelayResult};
use crate::transport::url::PROXY_PREFIX;

/// One intercepted network request.
#[derive(Debug)]
pub struct InterceptedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Body,
}

impl InterceptedRequest {
    /// Create a request with no headers and an empty body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// True when the request line carries an absolute URI (forward-proxy form).
    pub fn is_absolute_form<B>(request: &Request<B>) -> bool {
        request.uri().scheme().is_some() && request.uri().authority().is_some()
    }

    /// Convert an absolute-form HTTP request.
    pub fn from_http(request: Request<Body>) -> RelayResult<Self> {
        let (parts, body) = request.into_parts();
        if parts.uri.scheme().is_none() || parts.uri.authority().is_none() {
            return Err(RelayError::invalid_target(
                parts.uri.to_string(),
                "request URI is not absolute",
            ));
        }

        let uri = parts.uri.to_string();
        let url = Url::parse(&uri).map_err(|e| RelayError::invalid_target(uri.as_str(), e.to_string()))?;

        Ok(Self {
            method: parts.method,
            url,
            headers: parts.headers,
            body,
        })
    }
}

/// Where an intercepted request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutingDecision {
    /// Hand the request to the rewrite engine.
    Delegate,
    /// Decode the `/proxy/` target and fetch it cross-origin.
    ProxyRewrite,
    /// Forward unmodified.
    Passthrough,
}

impl RoutingDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingDecision::Delegate => "delegate",
            RoutingDecision::ProxyRewrite => "proxy_rewrite",
            RoutingDecision::Passthrough => "passthrough",
        }
    }
}

impl std::fmt::Display for RoutingDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a routing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContextState {
    Installed = 0,
    Active = 1,
    Superseded = 2,
}

impl ContextState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ContextState::Installed,
            1 => ContextState::Active,
            _ => ContextState::Superseded,
        }
    }
}

/// The interception layer's view of which engine is in charge.
pub struct RoutingContext {
    version: u64,
    engine: Arc<dyn RewriteEngine>,
    state: AtomicU8,
}

impl RoutingContext {
    /// Create a context in the `Installed` state.
    pub fn new(version: u64, engine: Arc<dyn RewriteEngine>) -> Self {
        Self {
            version,
            engine,
            state: AtomicU8::new(ContextState::Installed as u8),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn engine(&self) -> &Arc<dyn RewriteEngine> {
        &self.engine
    }

    pub fn state(&self) -> ContextState {
        ContextState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_active(&self) -> bool {
        self.state() == ContextState::Active
    }

    /// Installed → Active. Returns false if the context was not `Installed`.
    pub fn activate(&self) -> bool {
        self.state
            .compare_exchange(
                ContextState::Installed as u8,
                ContextState::Active as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Mark this context as replaced.
    pub fn supersede(&self) {
        self.state.store(ContextState::Superseded as u8, Ordering::Release);
    }

    /// Classify a request.
    pub fn decide(&self, request: &InterceptedRequest) -> RoutingDecision {
        if !self.is_active() {
            return RoutingDecision::Passthrough;
        }
        if self.engine.route(request) {
            return RoutingDecision::Delegate;
        }
        if request.url.path().starts_with(PROXY_PREFIX) {
            return RoutingDecision::ProxyRewrite;
        }
        RoutingDecision::Passthrough
    }
}

impl std::fmt::Debug for RoutingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingContext")
            .field("version", &self.version)
            .field("engine", &self.engine.name())
            .field("state", &self.state())
            .finish()
    }
}
