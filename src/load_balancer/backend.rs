//! Backend server records.
//!
//! # Responsibilities
//! - Represent a single backend server and its network location
//! - Track health status (Healthy/Unhealthy/Maintenance/Unknown)
//! - Own the server's performance metrics
//! - Validate identity and location fields before a record enters a pool

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::load_balancer::error::{PoolError, Result};

/// Metrics older than this are considered stale.
pub const DEFAULT_STALE_THRESHOLD: Duration = Duration::from_secs(30);

/// Health status of a backend.
///
/// Serialises in lowercase; deserialises case-insensitively through
/// [`FromStr`], so `"HEALTHY"` and `"healthy"` are both accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    #[default]
    Healthy,
    Unhealthy,
    Maintenance,
    Unknown,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Healthy => write!(f, "HEALTHY"),
            ServerStatus::Unhealthy => write!(f, "UNHEALTHY"),
            ServerStatus::Maintenance => write!(f, "MAINTENANCE"),
            ServerStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl<'de> Deserialize<'de> for ServerStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

impl FromStr for ServerStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "healthy" => Ok(ServerStatus::Healthy),
            "unhealthy" => Ok(ServerStatus::Unhealthy),
            "maintenance" => Ok(ServerStatus::Maintenance),
            "unknown" => Ok(ServerStatus::Unknown),
            other => Err(format!("unknown server status '{}'", other)),
        }
    }
}

/// Performance metrics reported for a backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerMetrics {
    pub response_time: f64,
    pub active_connections: u64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub error_rate: f64,
    pub throughput: f64,
    #[serde(serialize_with = "serialize_unix_time")]
    pub last_updated: SystemTime,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self {
            response_time: 0.0,
            active_connections: 0,
            cpu_usage: 0.0,
            memory_usage: 0.0,
            error_rate: 0.0,
            throughput: 0.0,
            last_updated: SystemTime::now(),
        }
    }
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the last update is older than `threshold`.
    pub fn is_stale(&self, threshold: Duration) -> bool {
        self.is_stale_at(SystemTime::now(), threshold)
    }

    pub fn is_stale_at(&self, now: SystemTime, threshold: Duration) -> bool {
        // A clock that moved backwards reads as fresh.
        now.duration_since(self.last_updated)
            .map(|age| age > threshold)
            .unwrap_or(false)
    }

    /// Apply a partial update. Either every present field is applied and
    /// `last_updated` is stamped, or nothing changes.
    pub fn apply(&mut self, update: &MetricsUpdate) -> Result<()> {
        update.validate()?;

        if let Some(v) = update.response_time {
            self.response_time = v;
        }
        if let Some(v) = update.active_connections {
            self.active_connections = v;
        }
        if let Some(v) = update.cpu_usage {
            self.cpu_usage = v;
        }
        if let Some(v) = update.memory_usage {
            self.memory_usage = v;
        }
        if let Some(v) = update.error_rate {
            self.error_rate = v;
        }
        if let Some(v) = update.throughput {
            self.throughput = v;
        }
        self.last_updated = SystemTime::now();
        Ok(())
    }
}

/// Field-by-field metrics update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsUpdate {
    pub response_time: Option<f64>,
    pub active_connections: Option<u64>,
    pub cpu_usage: Option<f64>,
    pub memory_usage: Option<f64>,
    pub error_rate: Option<f64>,
    pub throughput: Option<f64>,
}

impl MetricsUpdate {
    fn validate(&self) -> Result<()> {
        let fields = [
            ("response_time", self.response_time),
            ("cpu_usage", self.cpu_usage),
            ("memory_usage", self.memory_usage),
            ("error_rate", self.error_rate),
            ("throughput", self.throughput),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(PoolError::InvalidMetric { field, value });
                }
            }
        }
        Ok(())
    }
}

/// A single backend server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerRecord {
    id: String,
    pub address: String,
    pub port: u16,
    /// Informational; round robin does not consult it.
    pub weight: f64,
    pub status: ServerStatus,
    pub metrics: ServerMetrics,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ServerRecord {
    /// Create a healthy record with weight 1.0, validating its fields.
    pub fn new(id: impl Into<String>, address: impl Into<String>, port: u16) -> Result<Self> {
        Self::builder(id, address, port).build()
    }

    pub fn builder(
        id: impl Into<String>,
        address: impl Into<String>,
        port: u16,
    ) -> ServerRecordBuilder {
        ServerRecordBuilder {
            record: ServerRecord {
                id: id.into(),
                address: address.into(),
                port,
                weight: 1.0,
                status: ServerStatus::Healthy,
                metrics: ServerMetrics::new(),
                metadata: HashMap::new(),
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// `address:port`.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Eligible for selection.
    pub fn is_available(&self) -> bool {
        self.status == ServerStatus::Healthy
    }

    /// Check the identity and location invariants.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(PoolError::invalid(&self.id, "server id must not be empty"));
        }
        if self.address.trim().is_empty() {
            return Err(PoolError::invalid(&self.id, "address must not be empty"));
        }
        if self.port == 0 {
            return Err(PoolError::invalid(&self.id, "port must be greater than 0"));
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(PoolError::invalid(
                &self.id,
                format!("weight must be a non-negative number, got {}", self.weight),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ServerRecord`]; `build` validates.
#[derive(Debug, Clone)]
pub struct ServerRecordBuilder {
    record: ServerRecord,
}

impl ServerRecordBuilder {
    pub fn weight(mut self, weight: f64) -> Self {
        self.record.weight = weight;
        self
    }

    pub fn status(mut self, status: ServerStatus) -> Self {
        self.record.status = status;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.record.metadata.insert(key.into(), value);
        self
    }

    pub fn metrics(mut self, metrics: ServerMetrics) -> Self {
        self.record.metrics = metrics;
        self
    }

    pub fn build(self) -> Result<ServerRecord> {
        self.record.validate()?;
        Ok(self.record)
    }

    /// Skip validation. Lets callers exercise the registry's own checks.
    pub fn build_unchecked(self) -> ServerRecord {
        self.record
    }
}

/// Seconds since the Unix epoch.
pub fn unix_seconds(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn serialize_unix_time<S: Serializer>(time: &SystemTime, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(unix_seconds(*time))
}
