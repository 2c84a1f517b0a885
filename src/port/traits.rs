//! Core traits for the serial transport.
//!
//! The supervisor only ever talks to a [`SerialTransport`] (something that can
//! open a device path) and the [`SerialLink`] it hands back (a line stream
//! that can be closed). Both the tokio-serial backend and the mock used in
//! tests implement these.

use super::error::PortError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters used when opening a button controller.
///
/// Controllers speak 8N1 without flow control, so only the baud rate and the
/// driver-level read timeout are configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Driver read timeout.
    pub timeout: Duration,
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            timeout: Duration::from_secs(1),
        }
    }
}

/// An open serial connection, seen as a stream of text lines.
///
/// Implementations own the underlying handle. Dropping a link must release
/// the device even if [`SerialLink::close`] was never called.
#[async_trait]
pub trait SerialLink: Send + std::fmt::Debug {
    /// Wait for the next complete line.
    ///
    /// Lines have the delimiter and surrounding whitespace removed. Returns
    /// `Ok(None)` once the device closed the stream.
    async fn read_line(&mut self) -> Result<Option<String>, PortError>;

    /// Release the underlying handle. Closing twice is not an error.
    async fn close(&mut self) -> Result<(), PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;
}

/// Something that can open serial links by device path.
#[async_trait]
pub trait SerialTransport: Send + Sync + std::fmt::Debug {
    /// Open the device at `path`.
    async fn open(
        &self,
        path: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialLink>, PortError>;
}
