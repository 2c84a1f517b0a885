//! Events delivered from the bridge to the host.

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// One accepted button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonEvent {
    /// The button label as sent by the controller (`"1"`..`"5"` by default)
    pub label: String,
    /// Monotonic arrival time of the line
    pub timestamp: Instant,
    /// Wall-clock arrival time, for display
    pub received_at: DateTime<Utc>,
}

impl ButtonEvent {
    pub fn new(label: impl Into<String>, timestamp: Instant) -> Self {
        Self {
            label: label.into(),
            timestamp,
            received_at: Utc::now(),
        }
    }
}

/// Everything the bridge reports to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// Human-readable connection or warning message
    Status(String),
    /// A validated, debounced button press
    ButtonPressed(ButtonEvent),
    /// The controller at this path is connected
    Connected(String),
    /// The open connection was lost
    Disconnected,
    /// Automatic reconnection gave up
    MaxReconnectReached,
}

impl BridgeEvent {
    pub fn status(text: impl Into<String>) -> Self {
        Self::Status(text.into())
    }

    /// The status text, if this is a status event.
    pub fn as_status(&self) -> Option<&str> {
        match self {
            Self::Status(text) => Some(text),
            _ => None,
        }
    }

    /// The pressed label, if this is a button event.
    pub fn as_button(&self) -> Option<&str> {
        match self {
            Self::ButtonPressed(event) => Some(&event.label),
            _ => None,
        }
    }
}
