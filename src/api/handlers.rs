use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::config::ServerConfig;
use crate::health::MonitorState;
use crate::load_balancer::error::ErrorKind;
use crate::load_balancer::stats::StatisticsSnapshot;
use crate::load_balancer::{MetricsUpdate, SelectionContext, ServerRecord, ServerStatus};

#[derive(Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub algorithm: &'static str,
    pub health_monitor: MonitorState,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SelectionResponse {
    pub selected: bool,
    pub server_id: Option<String>,
    pub server_address: Option<String>,
    pub server_port: Option<u16>,
    pub endpoint: Option<String>,
    pub message: String,
}

#[derive(Serialize)]
pub struct ServerList {
    pub servers: Vec<ServerRecord>,
    pub total_servers: usize,
    pub healthy_servers: usize,
    pub algorithm: &'static str,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub statistics: StatisticsSnapshot,
    pub algorithm: &'static str,
    pub server_count: usize,
    pub healthy_server_count: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub server_id: String,
    pub server_address: String,
    pub server_port: u16,
    pub status: ServerStatus,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: ServerStatus,
}

pub async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        algorithm: state.pool.algorithm_name(),
        health_monitor: state.monitor.state(),
    })
}

/// Context fields accepted as query parameters on `GET /select-server`.
#[derive(Debug, Default, Deserialize)]
pub struct SelectQuery {
    pub client_ip: Option<String>,
    pub session_id: Option<String>,
    pub request_path: Option<String>,
    pub request_method: Option<String>,
}

impl From<SelectQuery> for SelectionContext {
    fn from(query: SelectQuery) -> Self {
        let defaults = SelectionContext::default();
        SelectionContext {
            client_ip: query.client_ip,
            session_id: query.session_id,
            request_path: query.request_path.unwrap_or(defaults.request_path),
            request_method: query.request_method.unwrap_or(defaults.request_method),
            ..defaults
        }
    }
}

pub async fn select_from_query(
    State(state): State<AppState>,
    Query(query): Query<SelectQuery>,
) -> Result<Json<SelectionResponse>, ApiError> {
    select(&state, &query.into())
}

pub async fn select_with_context(
    State(state): State<AppState>,
    Json(context): Json<SelectionContext>,
) -> Result<Json<SelectionResponse>, ApiError> {
    select(&state, &context)
}

/// An empty or fully unhealthy pool is reported in the body, not as an
/// HTTP error.
fn select(state: &AppState, context: &SelectionContext) -> Result<Json<SelectionResponse>, ApiError> {
    match state.pool.select(context) {
        Ok(server) => Ok(Json(SelectionResponse {
            selected: true,
            server_id: Some(server.id().to_string()),
            server_address: Some(server.address.clone()),
            server_port: Some(server.port),
            endpoint: Some(server.endpoint()),
            message: format!("Selected server {}", server.id()),
        })),
        Err(e) if e.kind() == ErrorKind::Selection => Ok(Json(SelectionResponse {
            selected: false,
            server_id: None,
            server_address: None,
            server_port: None,
            endpoint: None,
            message: e.to_string(),
        })),
        Err(e) => Err(e.into()),
    }
}

pub async fn list_servers(State(state): State<AppState>) -> Json<ServerList> {
    let pool = &state.pool;
    Json(ServerList {
        servers: pool.list_healthy(),
        total_servers: pool.count(),
        healthy_servers: pool.healthy_count(),
        algorithm: pool.algorithm_name(),
    })
}

pub async fn add_server(
    State(state): State<AppState>,
    Json(server): Json<ServerConfig>,
) -> Result<(StatusCode, Json<ServerRecord>), ApiError> {
    let record = server.to_record()?;
    state.pool.add_server(record.clone())?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn remove_server(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ServerRecord>, ApiError> {
    Ok(Json(state.pool.remove_server(&id)?))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<ServerRecord>, ApiError> {
    state.pool.update_status(&id, update.status)?;
    Ok(Json(state.pool.get_server(&id)?))
}

pub async fn update_metrics(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<MetricsUpdate>,
) -> Result<Json<ServerRecord>, ApiError> {
    state.pool.update_metrics(&id, &update)?;
    Ok(Json(state.pool.get_server(&id)?))
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let pool = &state.pool;
    Json(StatsResponse {
        statistics: pool.statistics(),
        algorithm: pool.algorithm_name(),
        server_count: pool.count(),
        healthy_server_count: pool.healthy_count(),
    })
}

pub async fn reset_stats(State(state): State<AppState>) -> Json<StatisticsSnapshot> {
    state.pool.reset_statistics();
    Json(state.pool.statistics())
}

/// Probe one server on demand. The server stays in the pool either way.
pub async fn server_health(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HealthResponse>, ApiError> {
    let server = state.pool.get_server(&id)?;
    let report = state.monitor.check_server(&id).await?;
    Ok(Json(HealthResponse {
        server_id: report.server_id.clone(),
        server_address: report.address.clone(),
        server_port: report.port,
        status: server.status,
        healthy: report.is_healthy(),
        error: report.error().map(|e| e.to_string()),
    }))
}
