//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the relay handlers
//! - Wire up middleware (request ID, tracing, optional timeout, interception)
//! - Install the initial routing context and apply reloaded ones
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::http::request::{
    mark_client_request_id, remove_relay_request_id, request_id_of, MakeRelayRequestId, X_REQUEST_ID,
};
use crate::http::response::html_error_page;
use crate::intercept::context::InterceptedRequest;
use crate::intercept::dispatch::Interceptor;
use crate::intercept::engine::engine_from_config;
use crate::intercept::rewrite::proxy_page_handler;
use crate::transport::bare::bare_handler;
use crate::transport::error::{RelayError, RelayResult};
use crate::transport::forwarder::{Forwarder, HttpForwarder};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<dyn Forwarder>,
    pub interceptor: Arc<Interceptor>,
    pub user_agent: HeaderValue,
    pub max_page_bytes: usize,
    pub intercept_enabled: bool,
}

impl AppState {
    /// Build state around a forwarder.
    pub fn new(config: &RelayConfig, forwarder: Arc<dyn Forwarder>) -> RelayResult<Self> {
        let user_agent = HeaderValue::from_str(&config.relay.user_agent)
            .map_err(|e| RelayError::Fetch(format!("invalid relay.user_agent: {}", e)))?;
        Ok(Self {
            interceptor: Arc::new(Interceptor::new(forwarder.clone())),
            forwarder,
            user_agent,
            max_page_bytes: config.relay.max_page_bytes,
            intercept_enabled: config.intercept.enabled,
        })
    }
}

/// HTTP server for the relay.
pub struct RelayServer {
    router: Router,
    config: RelayConfig,
    state: AppState,
    http: HttpForwarder,
}

impl RelayServer {
    /// Create a server that forwards with a real HTTP client.
    pub fn new(config: RelayConfig) -> RelayResult<Self> {
        let http = HttpForwarder::new(&config)?;
        Self::with_forwarder(config, Arc::new(http.clone()), http)
    }

    /// Create a server with a custom forwarder.
    ///
    /// `http` is only used by engines that talk to a relay themselves.
    pub fn with_forwarder(
        config: RelayConfig,
        forwarder: Arc<dyn Forwarder>,
        http: HttpForwarder,
    ) -> RelayResult<Self> {
        let state = AppState::new(&config, forwarder)?;
        let router = build_router(&config, state.clone());
        Ok(Self {
            router,
            config,
            state,
            http,
        })
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// The interception layer served by this instance.
    pub fn interceptor(&self) -> Arc<Interceptor> {
        self.state.interceptor.clone()
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Each configuration received on `config_updates` installs a fresh
    /// routing context. Returns once `shutdown` fires and in-flight
    /// requests have drained.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let interceptor = self.state.interceptor.clone();
        install_engine(&interceptor, &self.config, &self.http).await;

        let http = self.http.clone();
        let reload_interceptor = interceptor.clone();
        let reload_task = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                tracing::info!(engine = %config.intercept.engine, "Applying reloaded interception config");
                install_engine(&reload_interceptor, &config, &http).await;
            }
        });

        let result = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        reload_task.abort();
        tracing::info!("HTTP server stopped");
        result
    }
}

/// Build and install the configured engine, keeping the current one on failure.
async fn install_engine(interceptor: &Interceptor, config: &RelayConfig, http: &HttpForwarder) {
    let engine = match engine_from_config(&config.intercept, http.clone()) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build rewrite engine");
            return;
        }
    };
    if let Err(e) = interceptor.install(engine).await {
        tracing::error!(error = %e, "Failed to install routing context");
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(config: &RelayConfig, state: AppState) -> Router {
    let mut router = Router::new()
        .route("/bare/", any(bare_handler))
        .route("/bare/{*target}", any(bare_handler))
        .route("/proxy/{*target}", get(proxy_page_handler))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), intercept_middleware))
        .with_state(state);

    if let Some(secs) = config.timeouts.request_secs {
        router = router.layer(TimeoutLayer::new(Duration::from_secs(secs)));
    }

    router
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRelayRequestId))
        .layer(middleware::from_fn(mark_client_request_id))
}

/// Hand absolute-form (forward proxy) requests to the interception layer.
async fn intercept_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.intercept_enabled || !InterceptedRequest::is_absolute_form(&request) {
        return next.run(request).await;
    }

    let request_id = request_id_of(&request);
    let (mut parts, body) = request.into_parts();
    remove_relay_request_id(&mut parts.headers, &parts.extensions);
    match InterceptedRequest::from_http(Request::from_parts(parts, body)) {
        Ok(intercepted) => state.interceptor.dispatch(intercepted).await,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Unusable intercepted request");
            html_error_page(&e.to_string())
        }
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "No matching route found")
}
