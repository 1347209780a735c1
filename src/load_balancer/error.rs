//! Error taxonomy for pool and selection operations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PoolError>;

/// Coarse class of a [`PoolError`], for callers that only need to know
/// whether the pool, the server definition, or the id was at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid server fields or metric values. Never retried.
    Configuration,
    /// Duplicate or unknown server id.
    Identity,
    /// Nothing eligible to select.
    Selection,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PoolError {
    #[error("invalid configuration for server '{id}': {reason}")]
    InvalidConfiguration { id: String, reason: String },

    #[error("server '{0}' already exists")]
    AlreadyExists(String),

    #[error("server '{0}' not found")]
    NotFound(String),

    #[error("no healthy servers available")]
    NoHealthyServers,

    #[error("invalid value {value} for metric '{field}'")]
    InvalidMetric { field: &'static str, value: f64 },
}

impl PoolError {
    pub fn invalid(id: impl Into<String>, reason: impl Into<String>) -> Self {
        PoolError::InvalidConfiguration {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PoolError::InvalidConfiguration { .. } | PoolError::InvalidMetric { .. } => {
                ErrorKind::Configuration
            }
            PoolError::AlreadyExists(_) | PoolError::NotFound(_) => ErrorKind::Identity,
            PoolError::NoHealthyServers => ErrorKind::Selection,
        }
    }

    /// Server id the error refers to, if any.
    pub fn server_id(&self) -> Option<&str> {
        match self {
            PoolError::InvalidConfiguration { id, .. } => Some(id),
            PoolError::AlreadyExists(id) | PoolError::NotFound(id) => Some(id),
            PoolError::NoHealthyServers | PoolError::InvalidMetric { .. } => None,
        }
    }
}
