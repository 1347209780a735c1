//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the load balancer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::health::probe::ProbeKind;
use crate::load_balancer::backend::{ServerRecord, ServerStatus};
use crate::load_balancer::error::Result;
use crate::load_balancer::AlgorithmKind;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LimeLoadConfig {
    /// API listener configuration.
    pub listener: ListenerConfig,

    /// Selection algorithm for the pool.
    pub algorithm: AlgorithmKind,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Backend server definitions.
    pub servers: Vec<ServerConfig>,
}

/// Listener configuration for the selection API.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind host (e.g., "0.0.0.0").
    pub host: String,

    /// Bind port. Overridden by the `PORT` environment variable.
    pub port: u16,
}

impl ListenerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    /// Unique server identifier.
    pub id: String,

    /// Host name or IP address.
    pub address: String,

    pub port: u16,

    /// Informational weight (default: 1.0).
    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Initial status (default: healthy).
    #[serde(default)]
    pub status: ServerStatus,

    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

fn default_weight() -> f64 {
    1.0
}

impl ServerConfig {
    pub fn new(id: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            port,
            weight: default_weight(),
            status: ServerStatus::default(),
            metadata: HashMap::new(),
        }
    }

    /// Build a validated record from this definition.
    pub fn to_record(&self) -> Result<ServerRecord> {
        let mut builder = ServerRecord::builder(&self.id, &self.address, self.port)
            .weight(self.weight)
            .status(self.status);
        for (key, value) in &self.metadata {
            builder = builder.metadata(key, value.clone());
        }
        builder.build()
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the background health monitor.
    pub enabled: bool,

    /// Polling interval in seconds.
    pub interval_secs: u64,

    /// Per-probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// Probe type (http or tcp).
    pub probe: ProbeKind,

    /// Path to probe on each server (http only).
    pub path: String,
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            timeout_ms: 1000,
            probe: ProbeKind::Http,
            path: "/health".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: LimeLoadConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.algorithm, AlgorithmKind::RoundRobin);
        assert_eq!(config.health_check.interval(), Duration::from_secs(10));
        assert_eq!(config.health_check.timeout(), Duration::from_secs(1));
        assert!(config.servers.is_empty());
    }

    #[test]
    fn test_full_config() {
        let raw = r#"
            algorithm = "round_robin"

            [listener]
            host = "127.0.0.1"
            port = 8100

            [health_check]
            interval_secs = 5
            timeout_ms = 250
            probe = "tcp"
            path = "/status"

            [observability]
            log_level = "debug"
            log_format = "json"

            [[servers]]
            id = "web-1"
            address = "10.0.0.1"
            port = 8080

            [[servers]]
            id = "web-2"
            address = "10.0.0.2"
            port = 8080
            weight = 2.5
            status = "maintenance"
            metadata = { zone = "eu-west" }
        "#;
        let config: LimeLoadConfig = toml::from_str(raw).unwrap();

        assert_eq!(config.listener.bind_address(), "127.0.0.1:8100");
        assert_eq!(config.health_check.path, "/status");
        assert_eq!(config.health_check.probe, ProbeKind::Tcp);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0].weight, 1.0);
        assert_eq!(config.servers[0].status, ServerStatus::Healthy);

        let web2 = config.servers[1].to_record().unwrap();
        assert_eq!(web2.weight, 2.5);
        assert_eq!(web2.status, ServerStatus::Maintenance);
        assert_eq!(web2.metadata["zone"], serde_json::json!("eu-west"));
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let result: std::result::Result<LimeLoadConfig, _> = toml::from_str(r#"algorithm = "least_connections""#);
        assert!(result.is_err());
    }
}
