//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define API metrics (requests, responses by status, processing time)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `api_requests_received_total` (counter): requests entering the router
//! - `api_responses_sent_total` (counter): responses by method, status
//! - `api_request_duration_seconds` (histogram): processing time
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op
//! - Recording happens in one middleware so handlers stay metric-free

use std::net::SocketAddr;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request_received() {
    metrics::counter!("api_requests_received_total").increment(1);
}

pub fn record_response(method: &str, status: u16, start_time: Instant) {
    let status = status.to_string();
    metrics::counter!(
        "api_responses_sent_total",
        "method" => method.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!("api_request_duration_seconds", "status" => status)
        .record(start_time.elapsed().as_secs_f64());
}

/// Middleware recording request and response metrics.
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    record_request_received();

    let response = next.run(request).await;
    record_response(&method, response.status().as_u16(), start_time);
    response
}
