use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::RequestFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Stopping,
}

impl RunPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Running => "running",
            RunPhase::Stopping => "stopping",
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the virtual users of the active run live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Local,
    Distributed,
}

/// Point-in-time view of the coordinator, as rendered by the front end and
/// pushed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunState {
    pub phase: RunPhase,
    pub active_user_count: usize,
    pub start_timestamp_ms: i64,
    pub slave_count: usize,
    pub run_id: Option<String>,
    pub mode: Option<RunMode>,
    pub requests_sent: u64,
    pub requests_failed: u64,
}

impl RunState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.phase == RunPhase::Idle
    }
}

/// Request totals for the current (or last) local run. Written by workers
/// without locking.
#[derive(Debug, Default)]
pub struct RunCounters {
    sent: AtomicU64,
    failed: AtomicU64,
}

impl RunCounters {
    pub fn record(&self, failure: Option<RequestFailure>) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        if failure.is_some() {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}
