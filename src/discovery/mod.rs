//! Device enumeration.
//!
//! Lists attached serial devices, classifies each one and picks the best
//! device for unattended auto-connect. Enumeration is a pure query: nothing
//! here keeps state between calls.

pub mod classifier;

pub use classifier::{describe, Classifier};

use crate::config::DiscoveryConfig;
use crate::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

/// A serial device as reported by the OS, before classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPortInfo {
    /// System path (`/dev/ttyACM0`, `COM3`)
    pub path: String,
    pub manufacturer: Option<String>,
    /// USB vendor id as four lowercase hex digits
    pub vendor_id: Option<String>,
    /// USB product id as four lowercase hex digits
    pub product_id: Option<String>,
    pub serial_number: Option<String>,
}

impl RawPortInfo {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    pub fn with_usb_ids(mut self, vid: u16, pid: u16) -> Self {
        self.vendor_id = Some(format!("{:04x}", vid));
        self.product_id = Some(format!("{:04x}", pid));
        self
    }
}

/// A classified serial device, as shown to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    pub path: String,
    pub manufacturer: String,
    pub vendor_id: String,
    pub product_id: String,
    pub serial_number: String,
    pub description: String,
    /// Looks like a button controller
    pub is_candidate: bool,
}

/// Where raw port listings come from.
#[cfg_attr(test, mockall::automock)]
pub trait PortSource: Send + Sync {
    fn available(&self) -> BridgeResult<Vec<RawPortInfo>>;
}

/// The serial ports the operating system knows about.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPortSource;

impl PortSource for SystemPortSource {
    fn available(&self) -> BridgeResult<Vec<RawPortInfo>> {
        let ports =
            serialport::available_ports().map_err(|e| BridgeError::Enumeration(e.to_string()))?;

        Ok(ports
            .into_iter()
            .map(|port| {
                let info = RawPortInfo::new(port.port_name);
                match port.port_type {
                    serialport::SerialPortType::UsbPort(usb) => {
                        let mut info = info.with_usb_ids(usb.vid, usb.pid);
                        info.manufacturer = usb.manufacturer;
                        info.serial_number = usb.serial_number;
                        info
                    }
                    _ => info,
                }
            })
            .collect())
    }
}

/// A fixed listing, used for tests and for hosts that discover devices
/// themselves.
impl PortSource for Vec<RawPortInfo> {
    fn available(&self) -> BridgeResult<Vec<RawPortInfo>> {
        Ok(self.clone())
    }
}

/// Lists and classifies serial devices.
#[derive(Clone)]
pub struct DeviceEnumerator {
    classifier: Classifier,
    source: Arc<dyn PortSource>,
}

impl DeviceEnumerator {
    /// Enumerator over the system's serial ports.
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self::with_source(config, SystemPortSource)
    }

    pub fn with_source(config: &DiscoveryConfig, source: impl PortSource + 'static) -> Self {
        Self {
            classifier: Classifier::new(config),
            source: Arc::new(source),
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// List devices in OS enumeration order.
    ///
    /// # Errors
    ///
    /// - `BridgeError::Enumeration` if the OS query failed
    pub fn list(&self) -> BridgeResult<Vec<DeviceDescriptor>> {
        let ports = self.source.available()?;
        let devices: Vec<DeviceDescriptor> = ports
            .into_iter()
            .map(|port| self.classifier.descriptor(port))
            .collect();

        debug!(
            "Found {} serial devices ({} candidates)",
            devices.len(),
            devices.iter().filter(|d| d.is_candidate).count()
        );
        Ok(devices)
    }

    /// Like [`list`](Self::list), but an OS failure is logged and yields an
    /// empty list.
    pub fn list_or_empty(&self) -> Vec<DeviceDescriptor> {
        self.list().unwrap_or_else(|e| {
            error!("Error scanning devices: {}", e);
            Vec::new()
        })
    }

    /// Enumerate and pick in one step.
    pub fn find_best(&self) -> Option<DeviceDescriptor> {
        pick(&self.list_or_empty()).cloned()
    }
}

impl std::fmt::Debug for DeviceEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceEnumerator")
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

/// Best device for auto-connect: the first candidate, else the first device.
pub fn pick(devices: &[DeviceDescriptor]) -> Option<&DeviceDescriptor> {
    devices
        .iter()
        .find(|d| d.is_candidate)
        .or_else(|| devices.first())
}
