//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by route, method, status
//! - `relay_request_duration_seconds` (histogram): time until the response head
//! - `relay_upstream_errors_total` (counter): failed outbound requests by route
//! - `relay_routing_decisions_total` (counter): interception decisions
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished request.
pub fn record_request(route: &'static str, method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "relay_requests_total",
        "route" => route,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("relay_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

/// Record a failed outbound request.
pub fn record_upstream_error(route: &'static str) {
    metrics::counter!("relay_upstream_errors_total", "route" => route).increment(1);
}

/// Record an interception routing decision.
pub fn record_decision(decision: &'static str) {
    metrics::counter!("relay_routing_decisions_total", "decision" => decision).increment(1);
}
