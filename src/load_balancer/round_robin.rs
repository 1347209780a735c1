//! Round-robin load balancing strategy.

use crate::load_balancer::backend::ServerRecord;
use crate::load_balancer::context::SelectionContext;
use crate::load_balancer::error::{PoolError, Result};
use crate::load_balancer::registry::Registry;
use crate::load_balancer::SelectionAlgorithm;

/// Round-robin selector.
/// Stores a cursor into the registry's ordered list of healthy servers.
#[derive(Debug, Default)]
pub struct RoundRobin {
    current_index: usize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position in the healthy list the next selection will use.
    pub fn current_index(&self) -> usize {
        self.current_index
    }
}

impl SelectionAlgorithm for RoundRobin {
    fn name(&self) -> &'static str {
        "Round Robin"
    }

    fn select_server(&mut self, registry: &Registry, _context: &SelectionContext) -> Result<ServerRecord> {
        let healthy = registry.list_healthy();
        if healthy.is_empty() {
            return Err(PoolError::NoHealthyServers);
        }

        // Pool shrank since the last call.
        if self.current_index >= healthy.len() {
            self.current_index = 0;
        }

        let selected = healthy[self.current_index].clone();
        self.current_index = (self.current_index + 1) % healthy.len();
        Ok(selected)
    }

    fn add_server(&mut self, registry: &mut Registry, record: ServerRecord) -> Result<()> {
        let was_empty = registry.healthy_count() == 0;
        registry.add(record)?;
        if was_empty {
            self.current_index = 0;
        }
        Ok(())
    }

    fn remove_server(&mut self, registry: &mut Registry, id: &str) -> Result<ServerRecord> {
        let position = registry.position_in_healthy(id);
        let removed = registry.remove(id)?;

        // Servers after the cursor shift down by one; keep pointing at the
        // same next server.
        if let Some(position) = position {
            if position < self.current_index {
                let remaining = registry.healthy_count();
                self.current_index = if remaining == 0 {
                    0
                } else {
                    (self.current_index - 1) % remaining
                };
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::backend::ServerStatus;

    fn pool_of(ids: &[&str]) -> (RoundRobin, Registry) {
        let mut lb = RoundRobin::new();
        let mut registry = Registry::new();
        for (i, id) in ids.iter().enumerate() {
            let record = ServerRecord::new(*id, format!("192.168.1.{}", i + 1), 8080).unwrap();
            lb.add_server(&mut registry, record).unwrap();
        }
        (lb, registry)
    }

    fn next(lb: &mut RoundRobin, registry: &Registry) -> String {
        lb.select_server(registry, &SelectionContext::default())
            .unwrap()
            .id()
            .to_string()
    }

    #[test]
    fn test_round_robin() {
        let (mut lb, registry) = pool_of(&["server1", "server2", "server3"]);
        let expected = ["server1", "server2", "server3", "server1", "server2", "server3"];
        for id in expected {
            assert_eq!(next(&mut lb, &registry), id);
        }
    }

    #[test]
    fn test_single_server_wraps_to_zero() {
        let (mut lb, registry) = pool_of(&["server1"]);
        assert_eq!(next(&mut lb, &registry), "server1");
        assert_eq!(lb.current_index(), 0);
    }

    #[test]
    fn test_empty_pool() {
        let (mut lb, registry) = pool_of(&[]);
        let result = lb.select_server(&registry, &SelectionContext::default());
        assert_eq!(result, Err(PoolError::NoHealthyServers));
    }

    #[test]
    fn test_context_is_ignored() {
        let (mut lb, registry) = pool_of(&["server1", "server2"]);
        let ctx = SelectionContext::new()
            .with_client_ip("192.168.1.100")
            .with_request("GET", "/api/test");
        assert_eq!(lb.select_server(&registry, &ctx).unwrap().id(), "server1");
        assert_eq!(lb.select_server(&registry, &ctx).unwrap().id(), "server2");
    }

    #[test]
    fn test_removal_before_cursor_adjusts_index() {
        let (mut lb, mut registry) = pool_of(&["server1", "server2", "server3"]);
        assert_eq!(next(&mut lb, &registry), "server1");

        lb.remove_server(&mut registry, "server1").unwrap();
        assert_eq!(lb.current_index(), 0);
        assert_eq!(next(&mut lb, &registry), "server2");
        assert_eq!(next(&mut lb, &registry), "server3");
        assert_eq!(next(&mut lb, &registry), "server2");
    }

    #[test]
    fn test_removal_of_just_selected_server() {
        let (mut lb, mut registry) = pool_of(&["server1", "server2", "server3"]);
        assert_eq!(next(&mut lb, &registry), "server1");
        assert_eq!(next(&mut lb, &registry), "server2");

        lb.remove_server(&mut registry, "server2").unwrap();
        assert_eq!(next(&mut lb, &registry), "server3");
        assert_eq!(next(&mut lb, &registry), "server1");
    }

    #[test]
    fn test_removal_at_or_after_cursor_leaves_index() {
        let (mut lb, mut registry) = pool_of(&["server1", "server2", "server3"]);
        assert_eq!(next(&mut lb, &registry), "server1");

        lb.remove_server(&mut registry, "server3").unwrap();
        assert_eq!(lb.current_index(), 1);
        assert_eq!(next(&mut lb, &registry), "server2");
        assert_eq!(next(&mut lb, &registry), "server1");
    }

    #[test]
    fn test_index_resets_when_pool_shrinks() {
        let (mut lb, mut registry) = pool_of(&["server1", "server2", "server3"]);
        next(&mut lb, &registry);
        next(&mut lb, &registry);
        assert_eq!(lb.current_index(), 2);

        lb.remove_server(&mut registry, "server2").unwrap();
        lb.remove_server(&mut registry, "server3").unwrap();
        assert_eq!(next(&mut lb, &registry), "server1");
        assert_eq!(lb.current_index(), 0);
    }

    #[test]
    fn test_add_after_emptied_pool_restarts_rotation() {
        let (mut lb, mut registry) = pool_of(&["server1", "server2"]);
        next(&mut lb, &registry);
        lb.remove_server(&mut registry, "server1").unwrap();
        lb.remove_server(&mut registry, "server2").unwrap();
        assert_eq!(lb.current_index(), 0);

        let record = ServerRecord::new("server3", "192.168.1.3", 8080).unwrap();
        lb.add_server(&mut registry, record).unwrap();
        assert_eq!(next(&mut lb, &registry), "server3");
    }

    #[test]
    fn test_unhealthy_servers_skipped() {
        let (mut lb, mut registry) = pool_of(&["server1", "server2", "server3"]);
        registry.update_status("server2", ServerStatus::Unhealthy).unwrap();

        let picks: Vec<String> = (0..4).map(|_| next(&mut lb, &registry)).collect();
        assert_eq!(picks, vec!["server1", "server3", "server1", "server3"]);
    }

    #[test]
    fn test_weight_not_consulted() {
        let mut lb = RoundRobin::new();
        let mut registry = Registry::new();
        let light = ServerRecord::builder("light", "192.168.1.1", 8080).weight(0.5).build().unwrap();
        let heavy = ServerRecord::builder("heavy", "192.168.1.2", 8080).weight(2.0).build().unwrap();
        lb.add_server(&mut registry, light).unwrap();
        lb.add_server(&mut registry, heavy).unwrap();

        assert_eq!(next(&mut lb, &registry), "light");
        assert_eq!(next(&mut lb, &registry), "heavy");
        assert_eq!(next(&mut lb, &registry), "light");
        assert_eq!(registry.get("heavy").unwrap().weight, 2.0);
    }

    #[test]
    fn test_remove_unknown_server_keeps_cursor() {
        let (mut lb, mut registry) = pool_of(&["server1", "server2"]);
        next(&mut lb, &registry);
        let err = lb.remove_server(&mut registry, "nope").unwrap_err();
        assert_eq!(err, PoolError::NotFound("nope".into()));
        assert_eq!(lb.current_index(), 1);
    }
}
