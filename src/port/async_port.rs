//! Async serial transport using tokio-serial.
//!
//! Note: This module is gated behind the `native-serial` feature flag.

use super::error::PortError;
use super::lines::LineDecoder;
use super::traits::{PortConfiguration, SerialLink, SerialTransport};
use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Bytes requested from the driver per read.
const READ_CHUNK: usize = 64;

/// Transport that opens real devices through tokio-serial.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSerialTransport;

impl TokioSerialTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SerialTransport for TokioSerialTransport {
    async fn open(
        &self,
        path: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialLink>, PortError> {
        // The driver open blocks; keep it off the runtime workers
        let path = path.to_string();
        let config = config.clone();
        let link = tokio::task::spawn_blocking(move || TokioSerialLink::open(&path, &config))
            .await
            .map_err(|e| PortError::Io(std::io::Error::other(e.to_string())))??;
        Ok(Box::new(link))
    }
}

/// A controller connection backed by `tokio_serial::SerialStream`.
pub struct TokioSerialLink {
    /// `None` once closed.
    inner: Option<tokio_serial::SerialStream>,
    decoder: LineDecoder,
    name: String,
}

impl TokioSerialLink {
    /// Open a serial port as an 8N1 line stream.
    ///
    /// # Example
    /// ```no_run
    /// use serial_button_bridge::port::{PortConfiguration, TokioSerialLink};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let link = TokioSerialLink::open("/dev/ttyACM0", &PortConfiguration::default())?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(port_name: &str, config: &PortConfiguration) -> Result<Self, PortError> {
        let builder = tokio_serial::new(port_name, config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(config.timeout);

        let inner = tokio_serial::SerialStream::open(&builder).map_err(|e| match e.kind {
            tokio_serial::ErrorKind::NoDevice => PortError::not_found(port_name),
            tokio_serial::ErrorKind::InvalidInput => PortError::config(e.to_string()),
            _ => PortError::Io(std::io::Error::other(e.to_string())),
        })?;

        Ok(Self {
            inner: Some(inner),
            decoder: LineDecoder::new(),
            name: port_name.to_string(),
        })
    }
}

#[async_trait]
impl SerialLink for TokioSerialLink {
    async fn read_line(&mut self) -> Result<Option<String>, PortError> {
        loop {
            if let Some(line) = self.decoder.next_line() {
                return Ok(Some(line));
            }

            let stream = self.inner.as_mut().ok_or(PortError::NotOpen)?;
            let mut chunk = [0u8; READ_CHUNK];
            match stream.read(&mut chunk).await {
                Ok(0) => return Ok(None),
                Ok(n) => self.decoder.feed(&chunk[..n]),
                // Quiet line, not a fault
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(PortError::Io(e)),
            }
        }
    }

    async fn close(&mut self) -> Result<(), PortError> {
        if self.inner.take().is_some() {
            debug!("Closed serial link {}", self.name);
        }
        self.decoder.reset();
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for TokioSerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioSerialLink")
            .field("name", &self.name)
            .field("open", &self.inner.is_some())
            .finish()
    }
}
