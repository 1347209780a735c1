//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every healthy server
//! - Evict servers whose probe fails, on the first failure
//! - Stop cooperatively and join the loop task

use futures_util::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::health::probe::{Probe, ProbeError};
use crate::health::state::MonitorState;
use crate::load_balancer::backend::ServerRecord;
use crate::load_balancer::error::{PoolError, Result};
use crate::load_balancer::pool::ServerPool;
use crate::observability::metrics;

/// Result of probing one server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub server_id: String,
    pub address: String,
    pub port: u16,
    #[serde(skip)]
    pub duration: Duration,
    #[serde(skip)]
    pub result: std::result::Result<(), ProbeError>,
}

impl ProbeReport {
    pub fn is_healthy(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&ProbeError> {
        self.result.as_ref().err()
    }
}

/// The part of the monitor that runs inside the spawned task.
#[derive(Clone)]
struct Checker {
    pool: Arc<ServerPool>,
    probe: Arc<dyn Probe>,
    timeout: Duration,
}

impl Checker {
    async fn run(self, interval: Duration, mut stop: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = interval.as_millis() as u64,
            timeout_ms = self.timeout.as_millis() as u64,
            probe = self.probe.name(),
            "Health monitor starting"
        );

        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = stop.recv() => {
                    tracing::info!("Health monitor received stop signal, exiting loop");
                    break;
                }
                _ = ticker.tick() => {
                    self.check_all().await;
                }
            }
        }
    }

    /// Probe every healthy server concurrently, then evict the failures.
    /// Returns the number of servers evicted.
    async fn check_all(&self) -> usize {
        let servers = self.pool.list_healthy();
        if servers.is_empty() {
            tracing::debug!("No healthy servers to probe");
            return 0;
        }

        // Each probe runs in its own task so a panicking probe only fails
        // its own server.
        let tasks = servers.iter().cloned().map(|server| {
            let checker = self.clone();
            tokio::spawn(async move { checker.probe_server(&server).await })
        });
        let outcomes = join_all(tasks).await;

        let mut evicted = 0;
        for (server, outcome) in servers.iter().zip(outcomes) {
            let result = match outcome {
                Ok(report) => report.result,
                Err(e) => {
                    tracing::error!(server_id = %server.id(), error = %e, "Health probe task failed");
                    Err(ProbeError::Panicked(e.to_string()))
                }
            };

            if let Err(error) = result {
                if self.evict(server, &error) {
                    evicted += 1;
                }
            }
        }
        evicted
    }

    async fn probe_server(&self, server: &ServerRecord) -> ProbeReport {
        let start = Instant::now();
        let result = match time::timeout(self.timeout, self.probe.probe(&server.address, server.port)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        };
        let duration = start.elapsed();
        metrics::record_probe(duration, result.is_ok());

        match &result {
            Ok(()) => tracing::debug!(
                server_id = %server.id(),
                endpoint = %server.endpoint(),
                duration_ms = duration.as_millis() as u64,
                "Health check passed"
            ),
            Err(e) => tracing::warn!(
                server_id = %server.id(),
                endpoint = %server.endpoint(),
                error = %e,
                "Health check failed"
            ),
        }

        ProbeReport {
            server_id: server.id().to_string(),
            address: server.address.clone(),
            port: server.port,
            duration,
            result,
        }
    }

    /// Remove `probed` unless the pool's record changed while the probe was
    /// in flight (re-added elsewhere, or no longer HEALTHY).
    fn evict(&self, probed: &ServerRecord, error: &ProbeError) -> bool {
        let unchanged = |current: &ServerRecord| {
            current.address == probed.address && current.port == probed.port && current.is_available()
        };

        match self.pool.remove_if(probed.id(), unchanged) {
            Ok(Some(_)) => {
                tracing::warn!(
                    server_id = %probed.id(),
                    endpoint = %probed.endpoint(),
                    error = %error,
                    "Evicted unresponsive server from pool"
                );
                metrics::record_eviction(probed.id());
                true
            }
            Ok(None) => {
                tracing::debug!(server_id = %probed.id(), "Server changed during health check, not evicting");
                false
            }
            Err(PoolError::NotFound(_)) => {
                tracing::debug!(server_id = %probed.id(), "Server already removed before eviction");
                false
            }
            Err(e) => {
                tracing::error!(server_id = %probed.id(), error = %e, "Failed to evict server");
                false
            }
        }
    }
}

#[derive(Default)]
struct Control {
    state: MonitorState,
    stop_tx: Option<broadcast::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

/// Background health monitor for a [`ServerPool`].
pub struct HealthMonitor {
    checker: Checker,
    interval: Duration,
    control: Mutex<Control>,
    settled: watch::Sender<MonitorState>,
}

enum StopAction {
    Nothing,
    Wait(watch::Receiver<MonitorState>),
    Join(Option<broadcast::Sender<()>>, Option<JoinHandle<()>>),
}

impl HealthMonitor {
    pub fn new(pool: Arc<ServerPool>, probe: Arc<dyn Probe>, interval: Duration, timeout: Duration) -> Self {
        Self {
            checker: Checker { pool, probe, timeout },
            interval,
            control: Mutex::new(Control::default()),
            settled: watch::channel(MonitorState::Stopped).0,
        }
    }

    pub fn from_config(pool: Arc<ServerPool>, probe: Arc<dyn Probe>, config: &HealthCheckConfig) -> Self {
        Self::new(pool, probe, config.interval(), config.timeout())
    }

    pub fn state(&self) -> MonitorState {
        self.control.lock().state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the polling loop on the current Tokio runtime.
    /// No-op unless the monitor is stopped.
    pub fn start(&self) {
        let mut control = self.control.lock();
        if control.state != MonitorState::Stopped {
            tracing::debug!(state = %control.state, "Health monitor already started");
            return;
        }

        let (stop_tx, stop_rx) = broadcast::channel(1);
        let checker = self.checker.clone();
        let interval = self.interval;
        control.task = Some(tokio::spawn(checker.run(interval, stop_rx)));
        control.stop_tx = Some(stop_tx);
        control.state = MonitorState::Running;
        self.settled.send_replace(MonitorState::Running);
    }

    /// Signal the loop and wait for it to exit. The loop finishes the
    /// iteration in progress first. A call made while another `stop()` is
    /// joining waits for the same exit. No-op when already stopped.
    pub async fn stop(&self) {
        let action = {
            let mut control = self.control.lock();
            match control.state {
                MonitorState::Stopped => StopAction::Nothing,
                MonitorState::Stopping => StopAction::Wait(self.settled.subscribe()),
                MonitorState::Running => {
                    control.state = MonitorState::Stopping;
                    self.settled.send_replace(MonitorState::Stopping);
                    StopAction::Join(control.stop_tx.take(), control.task.take())
                }
            }
        };

        match action {
            StopAction::Nothing => {}
            StopAction::Wait(mut settled) => {
                let _ = settled.wait_for(|state| *state == MonitorState::Stopped).await;
            }
            StopAction::Join(stop_tx, task) => {
                if let Some(tx) = stop_tx {
                    let _ = tx.send(());
                }
                if let Some(task) = task {
                    if let Err(e) = task.await {
                        tracing::error!(error = %e, "Health monitor task ended abnormally");
                    }
                }

                {
                    let mut control = self.control.lock();
                    control.state = MonitorState::Stopped;
                    self.settled.send_replace(MonitorState::Stopped);
                }
                tracing::info!("Health monitor stopped");
            }
        }
    }

    /// Run one polling iteration now. Returns the number of evictions.
    pub async fn check_now(&self) -> usize {
        self.checker.check_all().await
    }

    /// Probe a single server without evicting it.
    pub async fn check_server(&self, id: &str) -> Result<ProbeReport> {
        let server = self.checker.pool.get_server(id)?;
        Ok(self.checker.probe_server(&server).await)
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        let control = self.control.get_mut();
        if let Some(tx) = control.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::AlgorithmKind;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails for addresses in `failing`, panics for `"panic"`.
    #[derive(Default)]
    struct ScriptedProbe {
        failing: Mutex<HashSet<String>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Probe for ScriptedProbe {
        async fn probe(&self, address: &str, _port: u16) -> std::result::Result<(), ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if address == "panic" {
                panic!("probe blew up");
            }
            if address == "slow" {
                time::sleep(Duration::from_secs(5)).await;
            }
            if self.failing.lock().contains(address) {
                Err(ProbeError::Connect("refused".into()))
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn pool_with(addresses: &[&str]) -> Arc<ServerPool> {
        let pool = Arc::new(ServerPool::new(AlgorithmKind::RoundRobin));
        for (i, address) in addresses.iter().enumerate() {
            pool.add_server(ServerRecord::new(format!("s{}", i + 1), *address, 8080).unwrap())
                .unwrap();
        }
        pool
    }

    fn monitor(pool: &Arc<ServerPool>, probe: &Arc<ScriptedProbe>, interval_ms: u64) -> HealthMonitor {
        HealthMonitor::new(
            pool.clone(),
            probe.clone(),
            Duration::from_millis(interval_ms),
            Duration::from_millis(100),
        )
    }

    #[tokio::test]
    async fn test_check_now_evicts_failures_only() {
        let pool = pool_with(&["a", "b", "c"]);
        let probe = Arc::new(ScriptedProbe::default());
        probe.failing.lock().insert("b".into());

        let monitor = monitor(&pool, &probe, 1000);
        assert_eq!(monitor.check_now().await, 1);
        let remaining: Vec<String> = pool.list_healthy().iter().map(|s| s.id().to_string()).collect();
        assert_eq!(remaining, vec!["s1", "s3"]);
        assert_eq!(monitor.check_now().await, 0);
    }

    #[tokio::test]
    async fn test_panicking_probe_only_fails_its_server() {
        let pool = pool_with(&["a", "panic", "c"]);
        let probe = Arc::new(ScriptedProbe::default());
        let monitor = monitor(&pool, &probe, 1000);

        assert_eq!(monitor.check_now().await, 1);
        assert_eq!(pool.count(), 2);
        assert!(pool.get_server("s2").is_err());
    }

    #[tokio::test]
    async fn test_slow_probe_times_out_and_is_evicted() {
        let pool = pool_with(&["a", "slow"]);
        let probe = Arc::new(ScriptedProbe::default());
        let monitor = monitor(&pool, &probe, 1000);

        let start = Instant::now();
        assert_eq!(monitor.check_now().await, 1);
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(pool.contains("s1"));
        assert!(!pool.contains("s2"));
    }

    #[tokio::test]
    async fn test_non_healthy_servers_not_probed() {
        let pool = pool_with(&["a", "b"]);
        pool.update_status("s2", crate::load_balancer::ServerStatus::Maintenance).unwrap();
        let probe = Arc::new(ScriptedProbe::default());
        probe.failing.lock().insert("b".into());

        let monitor = monitor(&pool, &probe, 1000);
        assert_eq!(monitor.check_now().await, 0);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
        assert!(pool.contains("s2"));
    }

    #[tokio::test]
    async fn test_lifecycle_is_idempotent() {
        let pool = pool_with(&["a"]);
        let probe = Arc::new(ScriptedProbe::default());
        let monitor = monitor(&pool, &probe, 20);

        assert_eq!(monitor.state(), MonitorState::Stopped);
        monitor.stop().await;
        assert_eq!(monitor.state(), MonitorState::Stopped);

        monitor.start();
        monitor.start();
        assert_eq!(monitor.state(), MonitorState::Running);

        monitor.stop().await;
        assert_eq!(monitor.state(), MonitorState::Stopped);

        // Restartable after a stop.
        monitor.start();
        assert_eq!(monitor.state(), MonitorState::Running);
        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_stop_halts_probing() {
        let pool = pool_with(&["a", "b"]);
        let probe = Arc::new(ScriptedProbe::default());
        let monitor = monitor(&pool, &probe, 20);

        monitor.start();
        time::sleep(Duration::from_millis(100)).await;
        monitor.stop().await;

        let calls = probe.calls.load(Ordering::SeqCst);
        assert!(calls >= 2);
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(probe.calls.load(Ordering::SeqCst), calls);
        assert_eq!(pool.count(), 2);
    }

    #[tokio::test]
    async fn test_stop_does_not_wait_full_interval() {
        let pool = pool_with(&["a"]);
        let probe = Arc::new(ScriptedProbe::default());
        let monitor = monitor(&pool, &probe, 60_000);

        monitor.start();
        time::sleep(Duration::from_millis(50)).await;
        let start = Instant::now();
        monitor.stop().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_check_server_reports_without_evicting() {
        let pool = pool_with(&["a"]);
        let probe = Arc::new(ScriptedProbe::default());
        probe.failing.lock().insert("a".into());
        let monitor = monitor(&pool, &probe, 1000);

        let report = monitor.check_server("s1").await.unwrap();
        assert!(!report.is_healthy());
        assert_eq!(report.error(), Some(&ProbeError::Connect("refused".into())));
        assert!(pool.contains("s1"));

        assert_eq!(
            monitor.check_server("missing").await.unwrap_err(),
            PoolError::NotFound("missing".into())
        );
    }

    /// Holds the check for `"old"` until released, then fails it.
    #[derive(Default)]
    struct GatedProbe {
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl Probe for GatedProbe {
        async fn probe(&self, address: &str, _port: u16) -> std::result::Result<(), ProbeError> {
            if address == "old" {
                self.entered.notify_one();
                self.release.notified().await;
                return Err(ProbeError::Connect("refused".into()));
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "gated"
        }
    }

    fn gated_monitor(pool: &Arc<ServerPool>, probe: &Arc<GatedProbe>) -> HealthMonitor {
        HealthMonitor::new(pool.clone(), probe.clone(), Duration::from_secs(60), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_readded_server_survives_stale_failure() {
        let pool = pool_with(&["old"]);
        let probe = Arc::new(GatedProbe::default());
        let monitor = gated_monitor(&pool, &probe);

        let replace = async {
            probe.entered.notified().await;
            pool.remove_server("s1").unwrap();
            pool.add_server(ServerRecord::new("s1", "new", 8080).unwrap()).unwrap();
            probe.release.notify_one();
        };
        let (evicted, ()) = tokio::join!(monitor.check_now(), replace);

        assert_eq!(evicted, 0);
        assert_eq!(pool.get_server("s1").unwrap().address, "new");
    }

    #[tokio::test]
    async fn test_server_put_in_maintenance_mid_check_is_kept() {
        let pool = pool_with(&["old"]);
        let probe = Arc::new(GatedProbe::default());
        let monitor = gated_monitor(&pool, &probe);

        let park = async {
            probe.entered.notified().await;
            pool.update_status("s1", crate::load_balancer::ServerStatus::Maintenance).unwrap();
            probe.release.notify_one();
        };
        let (evicted, ()) = tokio::join!(monitor.check_now(), park);

        assert_eq!(evicted, 0);
        assert!(pool.contains("s1"));
    }

    #[tokio::test]
    async fn test_concurrent_stops_both_wait_for_exit() {
        let pool = pool_with(&["slow"]);
        let probe = Arc::new(ScriptedProbe::default());
        let monitor = monitor(&pool, &probe, 1000);

        monitor.start();
        time::sleep(Duration::from_millis(20)).await;

        let handle = &monitor;
        let stop_and_read = || async move {
            handle.stop().await;
            handle.state()
        };
        let (first, second) = tokio::join!(stop_and_read(), stop_and_read());
        assert_eq!(first, MonitorState::Stopped);
        assert_eq!(second, MonitorState::Stopped);
    }
}
