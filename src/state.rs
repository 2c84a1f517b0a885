//! Connection state machine states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the supervisor is in its open/close/reconnect cycle.
///
/// Owned by the supervisor task; the host only ever sees copies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "attempt", rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection and nothing scheduled.
    #[default]
    Idle,
    /// An open is in flight.
    Connecting,
    /// A link is open and lines are flowing into the filter.
    Open,
    /// `close()` is tearing the link down.
    Closing,
    /// Waiting for the reconnect delay before automatic attempt `n`.
    Reconnecting(u32),
    /// Automatic reconnection gave up; only a manual call restarts it.
    Exhausted,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// An open or close is in progress; new `connect` calls are refused.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Connecting | Self::Closing)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::Reconnecting(n) => write!(f, "reconnecting (attempt {})", n),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}
