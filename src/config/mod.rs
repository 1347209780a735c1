//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read, parse, PORT override)
//!     → validation.rs (semantic checks)
//!     → LimeLoadConfig (validated, immutable)
//!     → ServerPool::from_config builds the initial pool
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; the pool is rebuilt from it on every start
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{HealthCheckConfig, LimeLoadConfig, ListenerConfig, LogFormat, ObservabilityConfig, ServerConfig};
