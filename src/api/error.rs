//! API error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::load_balancer::PoolError;

/// An error returned to API clients as `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<PoolError> for ApiError {
    fn from(err: PoolError) -> Self {
        let status = match &err {
            PoolError::NotFound(_) => StatusCode::NOT_FOUND,
            PoolError::AlreadyExists(_) => StatusCode::CONFLICT,
            PoolError::InvalidConfiguration { .. } | PoolError::InvalidMetric { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            PoolError::NoHealthyServers => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), detail = %self.detail, "API request failed");
        } else {
            tracing::debug!(status = self.status.as_u16(), detail = %self.detail, "API request rejected");
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}
