//! Startup orchestration.
//!
//! Subsystems initialize in order: pool, health monitor, then the API
//! listener, so traffic only arrives once the pool is populated.

use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::api::{self, AppState};
use crate::config::LimeLoadConfig;
use crate::health::{self, HealthMonitor};
use crate::load_balancer::error::Result;
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::load_balancer::ServerPool;

/// A fully wired load balancer, ready to serve.
pub struct LimeLoad {
    config: LimeLoadConfig,
    pool: Arc<ServerPool>,
    monitor: Arc<HealthMonitor>,
}

impl LimeLoad {
    /// Build the pool and monitor from configuration. Nothing is started.
    pub fn build(config: LimeLoadConfig) -> Result<Self> {
        let pool = Arc::new(ServerPool::from_config(&config)?);
        let probe = health::build_probe(&config.health_check);
        let monitor = Arc::new(HealthMonitor::from_config(pool.clone(), probe, &config.health_check));

        tracing::info!(
            algorithm = pool.algorithm_name(),
            servers = pool.count(),
            healthy = pool.healthy_count(),
            "Server pool initialized"
        );

        Ok(Self { config, pool, monitor })
    }

    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    pub fn state(&self) -> AppState {
        AppState::new(self.pool.clone(), self.monitor.clone())
    }

    /// Start the monitor (when enabled) and serve the API until `shutdown`
    /// fires. The monitor is stopped and joined before returning.
    pub async fn run(self, listener: TcpListener, mut shutdown: ShutdownSignal) -> io::Result<()> {
        if self.config.health_check.enabled {
            self.monitor.start();
        } else {
            tracing::info!("Health monitor disabled by configuration");
        }

        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "API listening");

        let app = api::router(self.state());
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
            })
            .await;

        tracing::info!("API stopped accepting requests");
        self.monitor.stop().await;
        served
    }
}
