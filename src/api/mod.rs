//! HTTP API over a [`ServerPool`].
//!
//! # Routes
//! ```text
//! GET  /                      service info
//! GET  /select-server         select, context from query parameters
//! POST /select-server         select with a JSON SelectionContext
//! GET  /servers               healthy servers and counts
//! POST /servers               add a server
//! DELETE /servers/{id}        remove a server
//! PUT  /servers/{id}/status   change status
//! PUT  /servers/{id}/metrics  merge a metrics update
//! GET  /stats                 selection statistics
//! POST /stats/reset           reset statistics
//! GET  /health/{id}           probe one server now
//! ```

pub mod error;
pub mod handlers;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::health::HealthMonitor;
use crate::load_balancer::ServerPool;

pub use error::ApiError;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<ServerPool>,
    pub monitor: Arc<HealthMonitor>,
}

impl AppState {
    pub fn new(pool: Arc<ServerPool>, monitor: Arc<HealthMonitor>) -> Self {
        Self { pool, monitor }
    }
}

pub fn router(state: AppState) -> Router {
    use handlers::*;

    Router::new()
        .route("/", get(service_info))
        .route("/select-server", get(select_from_query).post(select_with_context))
        .route("/servers", get(list_servers).post(add_server))
        .route("/servers/{id}", delete(remove_server))
        .route("/servers/{id}/status", put(update_status))
        .route("/servers/{id}/metrics", put(update_metrics))
        .route("/stats", get(stats))
        .route("/stats/reset", post(reset_stats))
        .route("/health/{id}", get(server_health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
