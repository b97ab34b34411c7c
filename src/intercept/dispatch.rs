//! Interception layer dispatch.
//!
//! # Responsibilities
//! - Own the currently authoritative routing context
//! - Install new contexts (init engine, activate, supersede the old one)
//! - Classify each intercepted request once and run exactly one branch
//! - Turn any failure into a synthetic HTML error page
//!
//! # Design Decisions
//! - Context swap is lock-free (`ArcSwapOption`); a request holds the
//!   context it loaded for its whole lifetime
//! - Nothing is spawned: dropping the response future abandons the forward
//! - No per-request state outlives the request

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use axum::body::Body;
use axum::response::{IntoResponse, Response};

use crate::http::response::html_error_page;
use crate::intercept::context::{InterceptedRequest, RoutingContext, RoutingDecision};
use crate::intercept::engine::RewriteEngine;
use crate::observability::metrics;
use crate::security::headers::{sanitize_response, strip_proxy_request};
use crate::transport::error::RelayResult;
use crate::transport::forwarder::{carries_body, ForwardResult, Forwarder, OutboundRequest};
use crate::transport::url::{target_from_path, PROXY_PREFIX};

const ROUTE: &str = "intercept";

/// Request-classify-dispatch front for intercepted traffic.
pub struct Interceptor {
    current: ArcSwapOption<RoutingContext>,
    next_version: AtomicU64,
    forwarder: Arc<dyn Forwarder>,
}

impl Interceptor {
    /// Create an interceptor with no context installed (everything passes through).
    pub fn new(forwarder: Arc<dyn Forwarder>) -> Self {
        Self {
            current: ArcSwapOption::empty(),
            next_version: AtomicU64::new(1),
            forwarder,
        }
    }

    /// Currently installed context, if any.
    pub fn current(&self) -> Option<Arc<RoutingContext>> {
        self.current.load_full()
    }

    /// Install `engine` and make it authoritative immediately.
    ///
    /// On init failure the previous context stays in charge.
    pub async fn install(&self, engine: Arc<dyn RewriteEngine>) -> RelayResult<Arc<RoutingContext>> {
        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        let context = Arc::new(RoutingContext::new(version, engine));

        context.engine().init().await?;
        context.activate();

        if let Some(previous) = self.current.swap(Some(context.clone())) {
            previous.supersede();
            tracing::info!(
                version = context.version(),
                superseded = previous.version(),
                engine = %context.engine().name(),
                "Routing context activated"
            );
        } else {
            tracing::info!(
                version = context.version(),
                engine = %context.engine().name(),
                "Routing context activated"
            );
        }

        Ok(context)
    }

    /// Decide and produce the response for one intercepted request.
    pub async fn dispatch(&self, request: InterceptedRequest) -> Response {
        let start = Instant::now();
        let method = request.method.clone();
        let url = request.url.clone();

        let context = self.current();
        let decision = context
            .as_ref()
            .map(|c| c.decide(&request))
            .unwrap_or(RoutingDecision::Passthrough);

        metrics::record_decision(decision.as_str());
        tracing::debug!(method = %method, url = %url, decision = %decision, "Intercepted request");

        let result = match decision {
            RoutingDecision::Delegate => match context {
                Some(context) => self.delegate(&context, request).await,
                None => self.passthrough(request).await,
            },
            RoutingDecision::ProxyRewrite => self.proxy_rewrite(request).await,
            RoutingDecision::Passthrough => self.passthrough(request).await,
        };

        match result {
            Ok(response) => {
                metrics::record_request(ROUTE, method.as_str(), response.status().as_u16(), start);
                response
            }
            Err(e) => {
                tracing::warn!(url = %url, decision = %decision, error = %e, "Interception failed");
                metrics::record_upstream_error(ROUTE);
                let response = html_error_page(&e.to_string());
                metrics::record_request(ROUTE, method.as_str(), response.status().as_u16(), start);
                response
            }
        }
    }

    async fn delegate(&self, context: &RoutingContext, request: InterceptedRequest) -> RelayResult<Response> {
        let result = context.engine().fetch(request).await?;
        Ok(result.into_response())
    }

    async fn proxy_rewrite(&self, request: InterceptedRequest) -> RelayResult<Response> {
        let target = target_from_path(request.url.path(), PROXY_PREFIX)?;
        let body = if carries_body(&request.method) {
            request.body
        } else {
            Body::empty()
        };
        let outbound = OutboundRequest::new(request.method, target)
            .with_headers(strip_proxy_request(request.headers))
            .with_body(body);

        let result = self.forwarder.forward(outbound).await?;
        Ok(ForwardResult::new(result.status, sanitize_response(result.headers), result.body).into_response())
    }

    async fn passthrough(&self, request: InterceptedRequest) -> RelayResult<Response> {
        let outbound = OutboundRequest::new(request.method, request.url)
            .with_headers(request.headers)
            .with_body(request.body);
        let result = self.forwarder.forward(outbound).await?;
        Ok(result.into_response())
    }
}
