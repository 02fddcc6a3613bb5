//! Metrics collection and exposition.
//!
//! # Metrics
//! - `porta_connections_classified_total` (counter): TLS-port connections by `protocol`
//! - `porta_ssh_sessions_total` (counter): passthrough sessions by `outcome`
//! - `porta_requests_total` (counter): requests answered by virtual hosts, by `status`

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with an HTTP scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_classification(protocol: &'static str) {
    metrics::counter!("porta_connections_classified_total", "protocol" => protocol).increment(1);
}

pub fn record_ssh_session(outcome: &'static str) {
    metrics::counter!("porta_ssh_sessions_total", "outcome" => outcome).increment(1);
}

pub fn record_request(status: u16) {
    metrics::counter!("porta_requests_total", "status" => status.to_string()).increment(1);
}
