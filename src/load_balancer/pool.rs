//! Backend pool management.
//!
//! # Responsibilities
//! - Pair the registry with the selection algorithm behind one lock
//! - Record selection statistics for every attempt
//! - Fire observer hooks once the lock is released

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use crate::config::LimeLoadConfig;
use crate::load_balancer::{
    backend::{MetricsUpdate, ServerRecord, ServerStatus},
    context::SelectionContext,
    error::Result,
    observer::{PoolObserver, TracingObserver},
    registry::Registry,
    stats::{Statistics, StatisticsSnapshot},
    Algorithm, AlgorithmKind, SelectionAlgorithm,
};
use crate::observability::metrics;

#[derive(Debug)]
struct PoolInner {
    registry: Registry,
    algorithm: Algorithm,
    stats: Statistics,
}

/// A pool of backend servers and the algorithm that picks among them.
///
/// Shared via `Arc` between request handlers and the health monitor.
pub struct ServerPool {
    inner: Mutex<PoolInner>,
    observer: Arc<dyn PoolObserver>,
}

impl ServerPool {
    /// Create an empty pool that logs through [`TracingObserver`].
    pub fn new(kind: AlgorithmKind) -> Self {
        Self::with_observer(kind, Arc::new(TracingObserver))
    }

    pub fn with_observer(kind: AlgorithmKind, observer: Arc<dyn PoolObserver>) -> Self {
        Self {
            inner: Mutex::new(PoolInner {
                registry: Registry::new(),
                algorithm: Algorithm::from_kind(kind),
                stats: Statistics::new(),
            }),
            observer,
        }
    }

    /// Build a pool from the `[[servers]]` section of the configuration.
    pub fn from_config(config: &LimeLoadConfig) -> Result<Self> {
        let pool = Self::new(config.algorithm);
        for server in &config.servers {
            pool.add_server(server.to_record()?)?;
        }
        Ok(pool)
    }

    /// Pick the next server. Failures are counted in the statistics too.
    pub fn select(&self, context: &SelectionContext) -> Result<ServerRecord> {
        let result = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            let result = inner.algorithm.select_server(&inner.registry, context);
            match result {
                Ok(_) => inner.stats.record_success(),
                Err(_) => inner.stats.record_failure(),
            }
            result
        };

        match &result {
            Ok(server) => self.observer.on_server_selected(server, context),
            Err(e) => self.observer.on_selection_failed(e, context),
        }
        result
    }

    pub fn select_default(&self) -> Result<ServerRecord> {
        self.select(&SelectionContext::default())
    }

    pub fn add_server(&self, record: ServerRecord) -> Result<()> {
        let snapshot = record.clone();
        {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            inner.algorithm.add_server(&mut inner.registry, record)?;
            Self::publish_sizes(&inner.registry);
        }
        metrics::record_backend_health(snapshot.id(), snapshot.is_available());
        self.observer.on_server_added(&snapshot);
        Ok(())
    }

    pub fn remove_server(&self, id: &str) -> Result<ServerRecord> {
        let removed = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            let removed = inner.algorithm.remove_server(&mut inner.registry, id)?;
            Self::publish_sizes(&inner.registry);
            removed
        };
        self.observer.on_server_removed(&removed);
        Ok(removed)
    }

    /// Remove `id` only if its current record satisfies `predicate`, checked
    /// under the same lock as the removal. `Ok(None)` when it does not match.
    pub fn remove_if<F>(&self, id: &str, predicate: F) -> Result<Option<ServerRecord>>
    where
        F: FnOnce(&ServerRecord) -> bool,
    {
        let removed = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            if !predicate(inner.registry.get(id)?) {
                return Ok(None);
            }
            let removed = inner.algorithm.remove_server(&mut inner.registry, id)?;
            Self::publish_sizes(&inner.registry);
            removed
        };
        self.observer.on_server_removed(&removed);
        Ok(Some(removed))
    }

    /// Snapshot of one server.
    pub fn get_server(&self, id: &str) -> Result<ServerRecord> {
        self.inner.lock().registry.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().registry.contains(id)
    }

    /// Healthy servers in rotation order.
    pub fn list_healthy(&self) -> Vec<ServerRecord> {
        self.inner.lock().registry.list_healthy()
    }

    /// Every server in insertion order.
    pub fn list_servers(&self) -> Vec<ServerRecord> {
        self.inner.lock().registry.list_all()
    }

    pub fn count(&self) -> usize {
        self.inner.lock().registry.count()
    }

    pub fn healthy_count(&self) -> usize {
        self.inner.lock().registry.healthy_count()
    }

    pub fn update_status(&self, id: &str, status: ServerStatus) -> Result<()> {
        let (server, previous) = {
            let mut inner = self.inner.lock();
            let previous = inner.registry.update_status(id, status)?;
            Self::publish_sizes(&inner.registry);
            (inner.registry.get(id)?.clone(), previous)
        };
        if previous != status {
            self.observer.on_status_changed(&server, previous);
        }
        Ok(())
    }

    pub fn update_metrics(&self, id: &str, update: &MetricsUpdate) -> Result<()> {
        let server = {
            let mut inner = self.inner.lock();
            inner.registry.update_metrics(id, update)?;
            inner.registry.get(id)?.clone()
        };
        self.observer.on_metrics_updated(&server);
        Ok(())
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        self.inner.lock().stats.snapshot()
    }

    pub fn reset_statistics(&self) {
        self.inner.lock().stats.reset();
        tracing::info!("Selection statistics reset");
    }

    pub fn algorithm_name(&self) -> &'static str {
        self.inner.lock().algorithm.name()
    }

    fn publish_sizes(registry: &Registry) {
        metrics::record_pool_size(registry.count(), registry.healthy_count());
    }
}

impl fmt::Display for ServerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        write!(
            f,
            "{} (servers: {}, healthy: {})",
            inner.algorithm.name(),
            inner.registry.count(),
            inner.registry.healthy_count()
        )
    }
}

impl fmt::Debug for ServerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerPool")
            .field("inner", &*self.inner.lock())
            .finish_non_exhaustive()
    }
}
