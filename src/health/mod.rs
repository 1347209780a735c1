//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (active.rs)
//!     → Probe each HEALTHY server (probe.rs)
//!     → Failure: evict from the pool
//!     → Success: leave untouched
//! ```
//!
//! # Design Decisions
//! - One failed probe evicts; there is no failure threshold
//! - Probing never changes a server's status, only its membership
//! - Only HEALTHY servers are probed

pub mod active;
pub mod probe;
pub mod state;

use std::sync::Arc;

use crate::config::HealthCheckConfig;

pub use active::{HealthMonitor, ProbeReport};
pub use probe::{HttpProbe, Probe, ProbeError, ProbeKind, TcpProbe};
pub use state::MonitorState;

/// Build the probe described by `config`.
pub fn build_probe(config: &HealthCheckConfig) -> Arc<dyn Probe> {
    match config.probe {
        ProbeKind::Http => Arc::new(HttpProbe::new(config.path.clone(), config.timeout())),
        ProbeKind::Tcp => Arc::new(TcpProbe::new(config.timeout())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_probe_follows_config() {
        let mut config = HealthCheckConfig::default();
        assert_eq!(build_probe(&config).name(), "http");

        config.probe = ProbeKind::Tcp;
        assert_eq!(build_probe(&config).name(), "tcp");
    }
}
