//! Server registry.
//!
//! # Responsibilities
//! - Own the id → record mapping for one pool
//! - Reject duplicate ids and invalid records
//! - Expose healthy servers in a stable, insertion-ordered sequence
//!
//! The registry is not synchronized on its own; [`ServerPool`] wraps it in
//! the pool lock together with the selection algorithm.
//!
//! [`ServerPool`]: crate::load_balancer::pool::ServerPool

use std::collections::{BTreeMap, HashMap};

use crate::load_balancer::backend::{MetricsUpdate, ServerRecord, ServerStatus};
use crate::load_balancer::error::{PoolError, Result};

#[derive(Debug, Default)]
pub struct Registry {
    /// Insertion sequence → record. Iteration order is the rotation order.
    servers: BTreeMap<u64, ServerRecord>,
    /// Server id → insertion sequence.
    index: HashMap<String, u64>,
    next_seq: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: ServerRecord) -> Result<()> {
        record.validate()?;
        if self.index.contains_key(record.id()) {
            return Err(PoolError::AlreadyExists(record.id().to_string()));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(record.id().to_string(), seq);
        self.servers.insert(seq, record);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<ServerRecord> {
        let seq = self
            .index
            .remove(id)
            .ok_or_else(|| PoolError::NotFound(id.to_string()))?;
        self.servers
            .remove(&seq)
            .ok_or_else(|| PoolError::NotFound(id.to_string()))
    }

    pub fn get(&self, id: &str) -> Result<&ServerRecord> {
        self.index
            .get(id)
            .and_then(|seq| self.servers.get(seq))
            .ok_or_else(|| PoolError::NotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut ServerRecord> {
        match self.index.get(id) {
            Some(seq) => self
                .servers
                .get_mut(seq)
                .ok_or_else(|| PoolError::NotFound(id.to_string())),
            None => Err(PoolError::NotFound(id.to_string())),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Healthy records in insertion order.
    pub fn list_healthy(&self) -> Vec<ServerRecord> {
        self.healthy().cloned().collect()
    }

    pub fn list_all(&self) -> Vec<ServerRecord> {
        self.servers.values().cloned().collect()
    }

    /// Position of `id` within [`Registry::list_healthy`], if it is healthy.
    pub fn position_in_healthy(&self, id: &str) -> Option<usize> {
        self.healthy().position(|s| s.id() == id)
    }

    /// Set a new status, returning the previous one.
    pub fn update_status(&mut self, id: &str, status: ServerStatus) -> Result<ServerStatus> {
        let server = self.get_mut(id)?;
        let previous = server.status;
        server.status = status;
        Ok(previous)
    }

    pub fn update_metrics(&mut self, id: &str, update: &MetricsUpdate) -> Result<()> {
        self.get_mut(id)?.metrics.apply(update)
    }

    pub fn count(&self) -> usize {
        self.servers.len()
    }

    pub fn healthy_count(&self) -> usize {
        self.healthy().count()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    fn healthy(&self) -> impl Iterator<Item = &ServerRecord> {
        self.servers.values().filter(|s| s.is_available())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(id: &str) -> ServerRecord {
        ServerRecord::new(id, "10.0.0.1", 8080).unwrap()
    }

    fn ids(records: &[ServerRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id()).collect()
    }

    #[test]
    fn test_add_get_remove() {
        let mut registry = Registry::new();
        registry.add(server("a")).unwrap();
        registry.add(server("b")).unwrap();
        assert_eq!(registry.count(), 2);
        assert_eq!(registry.get("a").unwrap().id(), "a");

        let removed = registry.remove("a").unwrap();
        assert_eq!(removed.id(), "a");
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.get("a"), Err(PoolError::NotFound("a".into())));
        assert_eq!(registry.remove("a"), Err(PoolError::NotFound("a".into())));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = Registry::new();
        registry.add(server("a")).unwrap();
        let err = registry.add(server("a")).unwrap_err();
        assert_eq!(err, PoolError::AlreadyExists("a".into()));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_invalid_record_never_enters() {
        let mut registry = Registry::new();
        let bad = ServerRecord::builder("a", "", 8080).build_unchecked();
        assert!(matches!(registry.add(bad), Err(PoolError::InvalidConfiguration { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_healthy_order_is_insertion_order() {
        let mut registry = Registry::new();
        for id in ["c", "a", "b"] {
            registry.add(server(id)).unwrap();
        }
        assert_eq!(ids(&registry.list_healthy()), vec!["c", "a", "b"]);

        registry.update_status("a", ServerStatus::Maintenance).unwrap();
        assert_eq!(ids(&registry.list_healthy()), vec!["c", "b"]);
        assert_eq!(registry.position_in_healthy("b"), Some(1));
        assert_eq!(registry.position_in_healthy("a"), None);
        assert_eq!(registry.healthy_count(), 2);

        // Re-adding after removal goes to the back of the rotation.
        registry.remove("c").unwrap();
        registry.add(server("c")).unwrap();
        assert_eq!(ids(&registry.list_healthy()), vec!["b", "c"]);
    }

    #[test]
    fn test_update_unknown_server() {
        let mut registry = Registry::new();
        assert!(registry.update_status("x", ServerStatus::Healthy).is_err());
        assert!(registry.update_metrics("x", &MetricsUpdate::default()).is_err());
    }

    #[test]
    fn test_update_status_returns_previous() {
        let mut registry = Registry::new();
        registry.add(server("a")).unwrap();
        let previous = registry.update_status("a", ServerStatus::Unhealthy).unwrap();
        assert_eq!(previous, ServerStatus::Healthy);
        assert_eq!(registry.get("a").unwrap().status, ServerStatus::Unhealthy);
    }
}
