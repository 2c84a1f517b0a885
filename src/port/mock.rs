//! Mock transport for testing.
//!
//! Provides a `MockTransport` that simulates a button controller without
//! requiring hardware. Tests push bytes into the currently open link, inject
//! read errors or end-of-stream, and script open failures.

use super::error::PortError;
use super::lines::LineDecoder;
use super::traits::{PortConfiguration, SerialLink, SerialTransport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Something the mock device "sends".
#[derive(Debug)]
enum LinkInput {
    Bytes(Vec<u8>),
    Error(String),
    Eof,
}

/// Shared state between the transport and the links it opened.
#[derive(Debug, Default)]
struct MockTransportState {
    /// Feeds the most recently opened link.
    current: Option<mpsc::UnboundedSender<LinkInput>>,
    /// Number of upcoming opens that should fail.
    failing_opens: usize,
    /// When set, every open fails.
    fail_all_opens: bool,
    /// Artificial latency before an open completes.
    open_delay: Duration,
    /// Artificial latency before a close releases the link.
    close_delay: Duration,
    /// Paths passed to every open attempt, successful or not.
    open_attempts: Vec<String>,
    opened: usize,
    closed: usize,
    links_open: usize,
}

/// Mock serial transport for testing.
///
/// Cloning shares state, so a test keeps one clone for control and hands
/// another to the bridge.
///
/// # Example
/// ```
/// use serial_button_bridge::port::{MockTransport, PortConfiguration, SerialLink, SerialTransport};
///
/// # tokio_test::block_on(async {
/// let transport = MockTransport::new();
/// let mut link = transport.open("MOCK0", &PortConfiguration::default()).await.unwrap();
///
/// transport.send_line("3");
/// assert_eq!(link.read_line().await.unwrap(), Some("3".to_string()));
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockTransportState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` open attempts fail.
    pub fn fail_next_opens(&self, count: usize) {
        self.state.lock().failing_opens = count;
    }

    /// Make every open attempt fail until switched off again.
    pub fn set_fail_all_opens(&self, fail: bool) {
        self.state.lock().fail_all_opens = fail;
    }

    /// Delay every open by `delay` before it completes.
    pub fn set_open_delay(&self, delay: Duration) {
        self.state.lock().open_delay = delay;
    }

    /// Delay every explicit link close by `delay`.
    pub fn set_close_delay(&self, delay: Duration) {
        self.state.lock().close_delay = delay;
    }

    /// Push raw bytes to the current link. Returns false if no link is open.
    pub fn send_bytes(&self, data: &[u8]) -> bool {
        self.push(LinkInput::Bytes(data.to_vec()))
    }

    /// Push one `\n`-terminated line to the current link.
    pub fn send_line(&self, line: &str) -> bool {
        self.send_bytes(format!("{line}\n").as_bytes())
    }

    /// Make the current link's next read fail with an I/O error.
    pub fn fail_link(&self, message: &str) -> bool {
        self.push(LinkInput::Error(message.to_string()))
    }

    /// Make the current link report end-of-stream (device unplugged).
    pub fn end_stream(&self) -> bool {
        self.push(LinkInput::Eof)
    }

    /// Paths of every open attempt so far.
    pub fn open_attempts(&self) -> Vec<String> {
        self.state.lock().open_attempts.clone()
    }

    /// Number of successful opens.
    pub fn opened_count(&self) -> usize {
        self.state.lock().opened
    }

    /// Number of explicit `close()` calls that released a link.
    pub fn closed_count(&self) -> usize {
        self.state.lock().closed
    }

    /// Links opened and not yet closed or dropped.
    pub fn links_open(&self) -> usize {
        self.state.lock().links_open
    }

    fn push(&self, input: LinkInput) -> bool {
        let state = self.state.lock();
        match &state.current {
            Some(tx) => tx.send(input).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl SerialTransport for MockTransport {
    async fn open(
        &self,
        path: &str,
        _config: &PortConfiguration,
    ) -> Result<Box<dyn SerialLink>, PortError> {
        let delay = {
            let mut state = self.state.lock();
            state.open_attempts.push(path.to_string());
            state.open_delay
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.fail_all_opens {
            return Err(PortError::not_found(path));
        }
        if state.failing_opens > 0 {
            state.failing_opens -= 1;
            return Err(PortError::not_found(path));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.current = Some(tx);
        state.opened += 1;
        state.links_open += 1;

        Ok(Box::new(MockLink {
            name: path.to_string(),
            rx,
            decoder: LineDecoder::new(),
            open: true,
            state: Arc::clone(&self.state),
        }))
    }
}

/// Link handed out by [`MockTransport`].
pub struct MockLink {
    name: String,
    rx: mpsc::UnboundedReceiver<LinkInput>,
    decoder: LineDecoder,
    open: bool,
    state: Arc<Mutex<MockTransportState>>,
}

impl MockLink {
    fn release(&mut self) -> bool {
        if !self.open {
            return false;
        }
        self.open = false;
        self.rx.close();
        let mut state = self.state.lock();
        state.links_open = state.links_open.saturating_sub(1);
        true
    }
}

#[async_trait]
impl SerialLink for MockLink {
    async fn read_line(&mut self) -> Result<Option<String>, PortError> {
        if !self.open {
            return Err(PortError::NotOpen);
        }

        loop {
            if let Some(line) = self.decoder.next_line() {
                return Ok(Some(line));
            }

            match self.rx.recv().await {
                Some(LinkInput::Bytes(bytes)) => self.decoder.feed(&bytes),
                Some(LinkInput::Error(message)) => {
                    return Err(PortError::Io(std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe,
                        message,
                    )))
                }
                Some(LinkInput::Eof) | None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) -> Result<(), PortError> {
        let delay = self.state.lock().close_delay;
        if self.open && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.release() {
            self.state.lock().closed += 1;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for MockLink {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for MockLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLink")
            .field("name", &self.name)
            .field("open", &self.open)
            .finish()
    }
}
