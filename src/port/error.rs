//! Transport error types.
//!
//! Kept separate from the bridge-level taxonomy in `crate::error`: these
//! describe what went wrong with a single serial handle, the bridge decides
//! what that means for the connection.

use thiserror::Error;

/// Errors that can occur while opening or reading a serial link.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial device was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred while reading from the device.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The port rejected its configuration (bad baud rate, busy device...).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Opening the port did not complete in time.
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Attempted to use a link that has already been closed.
    #[error("Port is not open")]
    NotOpen,

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a Timeout error from a duration.
    pub fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout(duration)
    }
}
