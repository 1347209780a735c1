//! Health monitor lifecycle state machine.
//!
//! # State Transitions
//! ```text
//! Stopped → Running:  start()
//! Running → Stopping: stop() signals the loop
//! Stopping → Stopped: loop task joined
//! ```
//!
//! `start()` outside Stopped and `stop()` outside Running are no-ops.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    #[default]
    Stopped,
    Running,
    Stopping,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorState::Stopped => write!(f, "stopped"),
            MonitorState::Running => write!(f, "running"),
            MonitorState::Stopping => write!(f, "stopping"),
        }
    }
}
