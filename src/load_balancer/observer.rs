//! Pool event hooks.
//!
//! Hooks run after the pool lock has been released, so an observer may call
//! back into the pool.

use crate::load_balancer::backend::{ServerRecord, ServerStatus};
use crate::load_balancer::context::SelectionContext;
use crate::load_balancer::error::PoolError;
use crate::observability::metrics;

/// Receives notifications about pool changes and selections.
///
/// Every method has a no-op default.
pub trait PoolObserver: Send + Sync {
    fn on_server_added(&self, _server: &ServerRecord) {}

    fn on_server_removed(&self, _server: &ServerRecord) {}

    fn on_status_changed(&self, _server: &ServerRecord, _previous: ServerStatus) {}

    fn on_metrics_updated(&self, _server: &ServerRecord) {}

    fn on_server_selected(&self, _server: &ServerRecord, _context: &SelectionContext) {}

    fn on_selection_failed(&self, _error: &PoolError, _context: &SelectionContext) {}
}

/// Default observer: structured logs plus metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PoolObserver for TracingObserver {
    fn on_server_added(&self, server: &ServerRecord) {
        tracing::info!(
            server_id = %server.id(),
            endpoint = %server.endpoint(),
            weight = server.weight,
            status = %server.status,
            "Server added to pool"
        );
    }

    fn on_server_removed(&self, server: &ServerRecord) {
        tracing::info!(server_id = %server.id(), endpoint = %server.endpoint(), "Server removed from pool");
        metrics::record_backend_removed(server.id());
    }

    fn on_status_changed(&self, server: &ServerRecord, previous: ServerStatus) {
        tracing::info!(
            server_id = %server.id(),
            from = %previous,
            to = %server.status,
            "Server status changed"
        );
        metrics::record_backend_health(server.id(), server.is_available());
    }

    fn on_metrics_updated(&self, server: &ServerRecord) {
        tracing::debug!(
            server_id = %server.id(),
            response_time = server.metrics.response_time,
            active_connections = server.metrics.active_connections,
            cpu_usage = server.metrics.cpu_usage,
            error_rate = server.metrics.error_rate,
            "Server metrics updated"
        );
    }

    fn on_server_selected(&self, server: &ServerRecord, context: &SelectionContext) {
        tracing::info!(
            server_id = %server.id(),
            endpoint = %server.endpoint(),
            client_ip = context.client_ip.as_deref().unwrap_or("-"),
            path = %context.request_path,
            "Server selected"
        );
        metrics::record_selection(true);
    }

    fn on_selection_failed(&self, error: &PoolError, context: &SelectionContext) {
        tracing::warn!(
            error = %error,
            client_ip = context.client_ip.as_deref().unwrap_or("-"),
            path = %context.request_path,
            "Server selection failed"
        );
        metrics::record_selection(false);
    }
}
