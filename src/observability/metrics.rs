//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rpc_endpoints_registered_total` (counter): registrations by endpoint
//! - `rpc_endpoint_selected_total` (counter): attempts started by endpoint
//! - `rpc_admission_refused_total` (counter): local request-window refusals
//! - `rpc_rate_limited_total` (counter): provider throttling signals
//! - `rpc_endpoint_unhealthy_total` / `rpc_endpoint_recovered_total` (counters)
//! - `rpc_failovers_total` (counter): failovers by source and target endpoint;
//!   emitted only once a target is selected, so exhaustion adds no series
//! - `rpc_call_duration_seconds` (histogram): execute latency by operation and outcome
//! - `rpc_probe_duration_seconds` (histogram): probe latency by endpoint and outcome
//! - `rpc_endpoint_healthy` (gauge): 1=below failure threshold, 0=unhealthy

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP scrape listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

pub fn record_endpoint_registered(endpoint: &str) {
    counter!("rpc_endpoints_registered_total", "endpoint" => endpoint.to_string()).increment(1);
    gauge!("rpc_endpoint_healthy", "endpoint" => endpoint.to_string()).set(1.0);
}

pub fn record_endpoint_selected(endpoint: &str) {
    counter!("rpc_endpoint_selected_total", "endpoint" => endpoint.to_string()).increment(1);
}

pub fn record_admission_refused(endpoint: &str) {
    counter!("rpc_admission_refused_total", "endpoint" => endpoint.to_string()).increment(1);
}

pub fn record_rate_limited(endpoint: &str) {
    counter!("rpc_rate_limited_total", "endpoint" => endpoint.to_string()).increment(1);
}

pub fn record_endpoint_unhealthy(endpoint: &str) {
    counter!("rpc_endpoint_unhealthy_total", "endpoint" => endpoint.to_string()).increment(1);
    gauge!("rpc_endpoint_healthy", "endpoint" => endpoint.to_string()).set(0.0);
}

pub fn record_endpoint_recovered(endpoint: &str) {
    counter!("rpc_endpoint_recovered_total", "endpoint" => endpoint.to_string()).increment(1);
    gauge!("rpc_endpoint_healthy", "endpoint" => endpoint.to_string()).set(1.0);
}

/// `to` is empty when no replacement endpoint was eligible.
pub fn record_failover(from: &str, to: &str) {
    counter!(
        "rpc_failovers_total",
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

pub fn record_call(operation: &str, outcome: &'static str, duration: Duration) {
    histogram!(
        "rpc_call_duration_seconds",
        "operation" => operation.to_string(),
        "outcome" => outcome
    )
    .record(duration.as_secs_f64());
}

pub fn record_probe(endpoint: &str, outcome: &'static str, duration: Duration) {
    histogram!(
        "rpc_probe_duration_seconds",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome
    )
    .record(duration.as_secs_f64());
}
