//! Press statistics for the current window.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::time::Instant;

/// Counters for one statistics window.
#[derive(Debug, Clone)]
pub struct Stats {
    total_presses: u64,
    blocked_presses: u64,
    presses_per_label: BTreeMap<String, u64>,
    window_start: Instant,
}

impl Stats {
    pub fn new(now: Instant) -> Self {
        Self {
            total_presses: 0,
            blocked_presses: 0,
            presses_per_label: BTreeMap::new(),
            window_start: now,
        }
    }

    pub fn record_accepted(&mut self, label: &str) {
        self.total_presses += 1;
        *self.presses_per_label.entry(label.to_string()).or_insert(0) += 1;
    }

    pub fn record_blocked(&mut self) {
        self.blocked_presses += 1;
    }

    /// Start a new window.
    pub fn reset(&mut self, now: Instant) {
        *self = Self::new(now);
    }

    pub fn total_presses(&self) -> u64 {
        self.total_presses
    }

    pub fn blocked_presses(&self) -> u64 {
        self.blocked_presses
    }

    pub fn presses_per_label(&self) -> &BTreeMap<String, u64> {
        &self.presses_per_label
    }

    pub fn window_start(&self) -> Instant {
        self.window_start
    }

    pub fn snapshot(&self, now: Instant) -> StatsSnapshot {
        StatsSnapshot {
            total_presses: self.total_presses,
            blocked_presses: self.blocked_presses,
            presses_per_label: self.presses_per_label.clone(),
            uptime_secs: now.saturating_duration_since(self.window_start).as_secs(),
            success_rate: success_rate(self.total_presses, self.blocked_presses),
        }
    }
}

/// Read-only copy of the statistics handed to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_presses: u64,
    pub blocked_presses: u64,
    pub presses_per_label: BTreeMap<String, u64>,
    /// Seconds since the window started
    pub uptime_secs: u64,
    /// Percent, one decimal
    pub success_rate: f64,
}

impl StatsSnapshot {
    /// A window with nothing recorded.
    pub fn empty() -> Self {
        Self {
            total_presses: 0,
            blocked_presses: 0,
            presses_per_label: BTreeMap::new(),
            uptime_secs: 0,
            success_rate: 100.0,
        }
    }
}

/// `(total - blocked) / total * 100`, rounded to one decimal; 100 when
/// nothing was accepted yet.
///
/// `total` counts accepted presses only, so a window with more rejected than
/// accepted lines yields a negative rate.
pub fn success_rate(total: u64, blocked: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let rate = (total as f64 - blocked as f64) / total as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}
