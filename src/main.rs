//! limeload server.
//!
//! ```text
//!     config.toml ──▶ ServerPool ◀── HealthMonitor (probe + evict)
//!                        ▲
//!     API client ───▶ axum router (select / servers / stats / health)
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use limeload::config::{self, loader};
use limeload::lifecycle::{signals, LimeLoad, Shutdown};
use limeload::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "limeload", version, about = "Round-robin server pool with active health checking")]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long, env = "LIMELOAD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => loader::parse_config("", std::env::var(loader::PORT_ENV).ok().as_deref())?,
    };

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "limeload starting");
    let source = match &args.config {
        Some(path) => path.display().to_string(),
        None => "defaults".to_string(),
    };
    tracing::info!(
        source = %source,
        listener = %config.listener.bind_address(),
        servers = config.servers.len(),
        health_check = config.health_check.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    let app = LimeLoad::build(config)?;

    let shutdown = Shutdown::new();
    let server = tokio::spawn(app.run(listener, shutdown.subscribe()));

    signals::wait_for_shutdown().await;
    shutdown.trigger();

    server.await??;
    tracing::info!("limeload stopped");
    Ok(())
}
