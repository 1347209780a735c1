//! Round-robin server pool with active health checking and an HTTP
//! selection API.

pub mod api;
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;

pub use config::LimeLoadConfig;
pub use lifecycle::{LimeLoad, Shutdown};
pub use load_balancer::ServerPool;
