//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Caller (API handler, health monitor)
//!     → pool.rs (take the pool lock)
//!     → Apply the configured algorithm:
//!         - round_robin.rs (rotate through healthy servers)
//!     → registry.rs (healthy snapshot in insertion order)
//!     → stats.rs (record success/failure)
//!     → observer.rs (hooks fire after the lock is released)
//!     → Return a ServerRecord snapshot or NoHealthyServers
//! ```
//!
//! # Design Decisions
//! - One lock guards the registry and the algorithm's rotation state together
//! - Only HEALTHY servers are eligible for selection
//! - Algorithms are chosen through a tagged enum, not open inheritance
//! - Weight is stored but not consulted by round robin

pub mod backend;
pub mod context;
pub mod error;
pub mod observer;
pub mod pool;
pub mod registry;
pub mod round_robin;
pub mod stats;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::load_balancer::error::Result;
use crate::load_balancer::registry::Registry;
use crate::load_balancer::round_robin::RoundRobin;

pub use backend::{MetricsUpdate, ServerMetrics, ServerRecord, ServerStatus};
pub use context::SelectionContext;
pub use error::{ErrorKind, PoolError};
pub use observer::{PoolObserver, TracingObserver};
pub use pool::ServerPool;

/// Contract every selection strategy implements.
///
/// `add_server` and `remove_server` delegate to the registry by default;
/// strategies that keep auxiliary indices override them.
pub trait SelectionAlgorithm: Send + fmt::Debug {
    fn name(&self) -> &'static str;

    fn select_server(&mut self, registry: &Registry, context: &SelectionContext) -> Result<ServerRecord>;

    fn add_server(&mut self, registry: &mut Registry, record: ServerRecord) -> Result<()> {
        registry.add(record)
    }

    fn remove_server(&mut self, registry: &mut Registry, id: &str) -> Result<ServerRecord> {
        registry.remove(id)
    }
}

/// Supported algorithms, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    #[default]
    RoundRobin,
}

/// Concrete algorithm instance held by a pool.
#[derive(Debug)]
pub enum Algorithm {
    RoundRobin(RoundRobin),
}

impl Algorithm {
    pub fn from_kind(kind: AlgorithmKind) -> Self {
        match kind {
            AlgorithmKind::RoundRobin => Algorithm::RoundRobin(RoundRobin::new()),
        }
    }

    fn inner(&self) -> &dyn SelectionAlgorithm {
        match self {
            Algorithm::RoundRobin(rr) => rr,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn SelectionAlgorithm {
        match self {
            Algorithm::RoundRobin(rr) => rr,
        }
    }
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::from_kind(AlgorithmKind::default())
    }
}

impl SelectionAlgorithm for Algorithm {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn select_server(&mut self, registry: &Registry, context: &SelectionContext) -> Result<ServerRecord> {
        self.inner_mut().select_server(registry, context)
    }

    fn add_server(&mut self, registry: &mut Registry, record: ServerRecord) -> Result<()> {
        self.inner_mut().add_server(registry, record)
    }

    fn remove_server(&mut self, registry: &mut Registry, id: &str) -> Result<ServerRecord> {
        self.inner_mut().remove_server(registry, id)
    }
}
