//! Metrics collection and exposition.
//!
//! # Metrics
//! - `limeload_selections_total` (counter): selection attempts by outcome
//! - `limeload_pool_servers` (gauge): servers registered
//! - `limeload_pool_healthy_servers` (gauge): servers eligible for selection
//! - `limeload_backend_health` (gauge): 1=healthy, 0=otherwise or removed
//! - `limeload_server_evictions_total` (counter): servers evicted by the monitor
//! - `limeload_probe_duration_seconds` (histogram): probe latency by outcome
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests pay nothing when metrics are disabled.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus exporter and its HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_selection(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("limeload_selections_total", "outcome" => outcome).increment(1);
}

pub fn record_pool_size(total: usize, healthy: usize) {
    gauge!("limeload_pool_servers").set(total as f64);
    gauge!("limeload_pool_healthy_servers").set(healthy as f64);
}

pub fn record_backend_health(server_id: &str, healthy: bool) {
    gauge!("limeload_backend_health", "server" => server_id.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

/// A removed server keeps its series but reports 0.
pub fn record_backend_removed(server_id: &str) {
    record_backend_health(server_id, false);
}

pub fn record_eviction(server_id: &str) {
    counter!("limeload_server_evictions_total", "server" => server_id.to_string()).increment(1);
}

pub fn record_probe(duration: Duration, healthy: bool) {
    let outcome = if healthy { "healthy" } else { "unhealthy" };
    histogram!("limeload_probe_duration_seconds", "outcome" => outcome).record(duration.as_secs_f64());
}
