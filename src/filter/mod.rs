//! Input filtering and press statistics.
//!
//! Turns raw controller lines into button events. Each line goes through, in
//! order: label validation, per-button debounce, per-button spam suppression
//! (more than N accepted presses within one second), and finally acceptance.
//! Every rejected line counts as blocked.
//!
//! The filter is plain synchronous state; the supervisor owns it and feeds it
//! one line at a time, passing the line's arrival time in.

pub mod history;
pub mod stats;

pub use history::PressHistory;
pub use stats::{success_rate, Stats, StatsSnapshot};

use crate::config::FilterConfig;
use crate::error::BridgeError;
use crate::event::ButtonEvent;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Sliding window used for spam detection.
pub const SPAM_WINDOW: Duration = Duration::from_secs(1);

/// Why a line did not produce an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Not one of the configured labels
    Invalid(String),
    /// Same button accepted less than the debounce interval ago
    Debounced { label: String },
    /// Button already at its per-second limit
    Spam { label: String },
}

/// Result of feeding one line to the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    Accepted(ButtonEvent),
    Rejected(Rejection),
}

impl FilterOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    /// Status line to show the host, if this outcome warrants one.
    pub fn status_message(&self) -> Option<String> {
        match self {
            Self::Rejected(Rejection::Spam { label }) => Some(format!(
                "possible spam on button {}: check contacts",
                label
            )),
            _ => None,
        }
    }
}

/// Per-button filter state. Lives across reconnects and stats resets.
#[derive(Debug, Clone)]
struct ButtonState {
    label: String,
    last_accepted: Option<Instant>,
    history: PressHistory,
}

/// Validates, debounces and rate-limits controller input.
#[derive(Debug, Clone)]
pub struct EventFilter {
    buttons: Vec<ButtonState>,
    debounce: Duration,
    max_per_second: usize,
    stats: Stats,
}

impl EventFilter {
    /// Create a filter for the configured labels.
    ///
    /// Expects a validated config (non-zero history capacity).
    pub fn new(config: &FilterConfig, now: Instant) -> Self {
        let buttons = config
            .labels
            .iter()
            .map(|label| ButtonState {
                label: label.clone(),
                last_accepted: None,
                history: PressHistory::new(config.history_capacity.max(1), SPAM_WINDOW),
            })
            .collect();

        Self {
            buttons,
            debounce: config.debounce(),
            max_per_second: config.max_presses_per_second,
            stats: Stats::new(now),
        }
    }

    /// Run one line through validation, debounce and spam checks.
    pub fn process(&mut self, line: &str, now: Instant) -> FilterOutcome {
        let Some(button) = self.buttons.iter_mut().find(|b| b.label == line) else {
            warn!("{}", BridgeError::Validation(line.to_string()));
            self.stats.record_blocked();
            return FilterOutcome::Rejected(Rejection::Invalid(line.to_string()));
        };

        if let Some(last) = button.last_accepted {
            if now.saturating_duration_since(last) < self.debounce {
                debug!("Debounced: {} (too fast)", button.label);
                self.stats.record_blocked();
                return FilterOutcome::Rejected(Rejection::Debounced {
                    label: button.label.clone(),
                });
            }
        }

        if button.history.count_recent(now) >= self.max_per_second {
            warn!("Possible spam detected for button {}", button.label);
            self.stats.record_blocked();
            return FilterOutcome::Rejected(Rejection::Spam {
                label: button.label.clone(),
            });
        }

        button.last_accepted = Some(now);
        button.history.push(now);
        self.stats.record_accepted(&button.label);
        debug!("Button pressed: {}", button.label);

        FilterOutcome::Accepted(ButtonEvent::new(button.label.clone(), now))
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn snapshot(&self, now: Instant) -> StatsSnapshot {
        self.stats.snapshot(now)
    }

    /// Close the current statistics window and start a new one.
    ///
    /// Returns the closing snapshot. Debounce and spam history are kept.
    pub fn reset_stats(&mut self, now: Instant) -> StatsSnapshot {
        let closing = self.stats.snapshot(now);
        info!(
            total = closing.total_presses,
            blocked = closing.blocked_presses,
            success_rate = closing.success_rate,
            "Stats window closed"
        );
        self.stats.reset(now);
        closing
    }

    /// When `label` was last accepted.
    pub fn last_accepted(&self, label: &str) -> Option<Instant> {
        self.button(label).and_then(|b| b.last_accepted)
    }

    /// Spam-detection history for `label`.
    pub fn history(&self, label: &str) -> Option<&PressHistory> {
        self.button(label).map(|b| &b.history)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.buttons.iter().map(|b| b.label.as_str())
    }

    fn button(&self, label: &str) -> Option<&ButtonState> {
        self.buttons.iter().find(|b| b.label == label)
    }
}
