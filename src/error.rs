//! Bridge-level error taxonomy.
//!
//! None of these cross the host boundary as failures: the supervisor turns
//! each into a status line (and a `false` from `connect`/`reconnect`). They
//! exist so the places that produce and report a fault agree on its wording.

use crate::port::PortError;
use thiserror::Error;

/// Errors produced while discovering, opening or reading the controller.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The OS refused to list serial devices.
    #[error("device enumeration failed: {0}")]
    Enumeration(String),

    /// A device handle could not be opened.
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: PortError,
    },

    /// No device was available to open.
    #[error("no serial device found")]
    NoDevice,

    /// The open connection failed mid-stream.
    #[error("connection lost: {0}")]
    Transport(#[source] PortError),

    /// The device sent a line that is not a known button label.
    #[error("invalid button data: {0:?}")]
    Validation(String),

    /// Automatic reconnection gave up.
    #[error("gave up after {attempts} reconnect attempts")]
    Exhausted { attempts: u32 },

    /// The supervisor task is no longer running.
    #[error("connection supervisor has shut down")]
    SupervisorGone,
}

impl BridgeError {
    pub fn open(path: impl Into<String>, source: PortError) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }
}

/// A specialized `Result` type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
