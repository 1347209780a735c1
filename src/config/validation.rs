//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check server definitions (ids unique, fields valid)
//! - Validate value ranges (interval and timeout > 0, paths absolute)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LimeLoadConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::LimeLoadConfig;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("servers[{index}]: {reason}")]
    InvalidServer { index: usize, reason: String },

    #[error("duplicate server id '{0}'")]
    DuplicateServer(String),

    #[error("health_check.{field} must be greater than 0")]
    ZeroDuration { field: &'static str },

    #[error("health_check.path must start with '/', got '{0}'")]
    RelativeHealthPath(String),

    #[error("observability.log_level '{0}' is not one of trace, debug, info, warn, error")]
    UnknownLogLevel(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    BadMetricsAddress(String),
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &LimeLoadConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for (index, server) in config.servers.iter().enumerate() {
        if let Err(e) = server.to_record() {
            errors.push(ValidationError::InvalidServer {
                index,
                reason: e.to_string(),
            });
        }
        if !seen.insert(server.id.as_str()) {
            errors.push(ValidationError::DuplicateServer(server.id.clone()));
        }
    }

    let health = &config.health_check;
    if health.interval_secs == 0 {
        errors.push(ValidationError::ZeroDuration { field: "interval_secs" });
    }
    if health.timeout_ms == 0 {
        errors.push(ValidationError::ZeroDuration { field: "timeout_ms" });
    }
    if !health.path.starts_with('/') {
        errors.push(ValidationError::RelativeHealthPath(health.path.clone()));
    }

    let obs = &config.observability;
    if !LOG_LEVELS.contains(&obs.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownLogLevel(obs.log_level.clone()));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadMetricsAddress(obs.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
