//! Host-facing facade.
//!
//! `ButtonBridge` is the one type an application embeds. It combines the
//! device enumerator with the connection supervisor and remembers which
//! device the host selected.
//!
//! # Architecture
//!
//! ```text
//!            ┌──> DeviceEnumerator (blocking OS query, off the runtime)
//! host ──> ButtonBridge
//!            └──> SupervisorHandle ──> supervisor task ──> BridgeEvent stream
//! ```
//!
//! None of the device operations return errors. Failures surface as `false`,
//! an empty list, or a status line on the event stream.

use crate::config::Config;
use crate::discovery::{pick, DeviceDescriptor, DeviceEnumerator, RawPortInfo};
use crate::event::BridgeEvent;
use crate::filter::StatsSnapshot;
use crate::port::SerialTransport;
use crate::state::ConnectionState;
use crate::supervisor::{self, SupervisorHandle};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

/// Serial button controller channel.
///
/// Cloning shares the same supervisor and selection.
#[derive(Debug, Clone)]
pub struct ButtonBridge {
    supervisor: SupervisorHandle,
    enumerator: DeviceEnumerator,
    selected: Arc<Mutex<Option<DeviceDescriptor>>>,
}

impl ButtonBridge {
    /// Build a bridge and start its supervisor task.
    ///
    /// Returns the bridge and the receiving end of its event stream. Expects a
    /// validated config; must be called from within a tokio runtime.
    pub fn new(
        config: &Config,
        transport: Arc<dyn SerialTransport>,
        enumerator: DeviceEnumerator,
    ) -> (Self, mpsc::UnboundedReceiver<BridgeEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let supervisor = supervisor::spawn(config, transport, enumerator.clone(), events_tx);

        let bridge = Self {
            supervisor,
            enumerator,
            selected: Arc::new(Mutex::new(None)),
        };
        (bridge, events_rx)
    }

    /// Bridge over the system's serial ports and the given transport.
    pub fn with_transport(
        config: &Config,
        transport: Arc<dyn SerialTransport>,
    ) -> (Self, mpsc::UnboundedReceiver<BridgeEvent>) {
        let enumerator = DeviceEnumerator::new(&config.discovery);
        Self::new(config, transport, enumerator)
    }

    /// Bridge backed by real serial hardware.
    #[cfg(feature = "native-serial")]
    pub fn native(config: &Config) -> (Self, mpsc::UnboundedReceiver<BridgeEvent>) {
        Self::with_transport(config, Arc::new(crate::port::TokioSerialTransport::new()))
    }

    /// Attached serial devices in enumeration order; empty on failure.
    pub async fn list_devices(&self) -> Vec<DeviceDescriptor> {
        let enumerator = self.enumerator.clone();
        match tokio::task::spawn_blocking(move || enumerator.list_or_empty()).await {
            Ok(devices) => devices,
            Err(e) => {
                error!("Device scan task failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Pick the most likely controller and make it the selected device.
    pub async fn auto_select(&self) -> Option<DeviceDescriptor> {
        let devices = self.list_devices().await;
        let best = pick(&devices).cloned();
        match &best {
            Some(device) => {
                info!("Auto-selected {} ({})", device.path, device.description);
                *self.selected.lock() = Some(device.clone());
            }
            None => warn!("No serial devices found"),
        }
        best
    }

    /// Connect to `path`. On success the device becomes the selected one.
    ///
    /// Returns false if the open failed or another open/close is in flight.
    pub async fn connect(&self, path: &str) -> bool {
        if !self.supervisor.connect(path).await {
            return false;
        }
        let device = self.describe(path).await;
        *self.selected.lock() = Some(device);
        true
    }

    /// Select the best device and connect to it.
    ///
    /// With no device attached this reports `"not found"` and keeps retrying
    /// on the reconnect schedule.
    pub async fn auto_connect(&self) -> bool {
        let path = self.auto_select().await.map(|device| device.path);
        self.supervisor.auto_connect(path).await
    }

    /// Close the connection and stop automatic reconnection.
    pub async fn disconnect(&self) {
        self.supervisor.close().await;
    }

    /// Reset the retry counter and reconnect to the last device now.
    pub async fn reconnect(&self) -> bool {
        self.supervisor.reconnect().await
    }

    pub fn is_connected(&self) -> bool {
        self.supervisor.is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    /// Watch connection state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.supervisor.state_changes()
    }

    /// Current statistics window.
    pub async fn stats(&self) -> StatsSnapshot {
        self.supervisor.stats().await.unwrap_or_else(|e| {
            warn!("Stats unavailable: {}", e);
            StatsSnapshot::empty()
        })
    }

    /// Start a new statistics window.
    pub async fn reset_stats(&self) {
        if let Err(e) = self.supervisor.reset_stats().await {
            warn!("Stats reset failed: {}", e);
        }
    }

    pub fn selected_device(&self) -> Option<DeviceDescriptor> {
        self.selected.lock().clone()
    }

    /// Disconnect and stop the supervisor task. The bridge is inert afterwards.
    pub async fn shutdown(&self) {
        self.supervisor.shutdown().await;
    }

    /// Descriptor for `path`, from a fresh scan if the device is listed.
    async fn describe(&self, path: &str) -> DeviceDescriptor {
        let listed = self
            .list_devices()
            .await
            .into_iter()
            .find(|device| device.path == path);

        listed.unwrap_or_else(|| self.enumerator.classifier().descriptor(RawPortInfo::new(path)))
    }
}
