//! Selection statistics.

use serde::Serialize;
use std::time::SystemTime;

use crate::load_balancer::backend::unix_seconds;

/// Process-lifetime selection counters.
#[derive(Debug, Clone)]
pub struct Statistics {
    total_requests: u64,
    successful_selections: u64,
    failed_selections: u64,
    last_reset: SystemTime,
}

impl Default for Statistics {
    fn default() -> Self {
        Self {
            total_requests: 0,
            successful_selections: 0,
            failed_selections: 0,
            last_reset: SystemTime::now(),
        }
    }
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.total_requests += 1;
        self.successful_selections += 1;
    }

    pub fn record_failure(&mut self) {
        self.total_requests += 1;
        self.failed_selections += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            total_requests: self.total_requests,
            successful_selections: self.successful_selections,
            failed_selections: self.failed_selections,
            success_rate: self.successful_selections as f64 / self.total_requests.max(1) as f64,
            last_reset: unix_seconds(self.last_reset),
        }
    }
}

/// Read model of [`Statistics`]. `last_reset` is in Unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub total_requests: u64,
    pub successful_selections: u64,
    pub failed_selections: u64,
    pub success_rate: f64,
    pub last_reset: f64,
}
