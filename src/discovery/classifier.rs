//! Heuristics that decide whether a serial device is a button controller.

use super::{DeviceDescriptor, RawPortInfo};
use crate::config::DiscoveryConfig;
use once_cell::sync::Lazy;
use regex::Regex;

/// Bare Windows COM ports (`COM3`, `com12`).
static COM_PORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^COM\d+$").expect("COM port pattern is valid"));

const UNKNOWN_MANUFACTURER: &str = "Unknown";
const NOT_AVAILABLE: &str = "N/A";

/// Classifies raw ports using the configured vendor ids and keywords.
#[derive(Debug, Clone)]
pub struct Classifier {
    vendor_ids: Vec<String>,
    keywords: Vec<String>,
    match_com_ports: bool,
}

impl Classifier {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            vendor_ids: config
                .vendor_ids
                .iter()
                .map(|id| id.trim().to_ascii_lowercase())
                .collect(),
            keywords: config
                .port_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            match_com_ports: config.match_com_ports,
        }
    }

    /// Whether `port` looks like a button controller.
    ///
    /// Vendor id allow-list first, then keywords in the manufacturer or path,
    /// then (if enabled) the bare COM port rule.
    pub fn is_candidate(&self, port: &RawPortInfo) -> bool {
        if let Some(vid) = &port.vendor_id {
            let vid = vid.to_ascii_lowercase();
            if self.vendor_ids.iter().any(|allowed| *allowed == vid) {
                return true;
            }
        }

        let manufacturer = port
            .manufacturer
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();
        let path = port.path.to_lowercase();
        if self
            .keywords
            .iter()
            .any(|k| manufacturer.contains(k.as_str()) || path.contains(k.as_str()))
        {
            return true;
        }

        self.match_com_ports && COM_PORT.is_match(&port.path)
    }

    /// Build the host-facing descriptor for `port`.
    pub fn descriptor(&self, port: RawPortInfo) -> DeviceDescriptor {
        let is_candidate = self.is_candidate(&port);
        let description = describe(&port);
        let RawPortInfo {
            path,
            manufacturer,
            vendor_id,
            product_id,
            serial_number,
        } = port;

        DeviceDescriptor {
            path,
            manufacturer: present(manufacturer).unwrap_or_else(|| UNKNOWN_MANUFACTURER.to_string()),
            vendor_id: present(vendor_id).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            product_id: present(product_id).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            serial_number: present(serial_number).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            description,
            is_candidate,
        }
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Human-readable summary: `manufacturer | VID:x PID:y | S/N:z`, or the path
/// when none of those are known.
pub fn describe(port: &RawPortInfo) -> String {
    fn non_empty(value: &Option<String>) -> Option<&str> {
        value.as_deref().filter(|s| !s.is_empty())
    }

    let mut parts = Vec::with_capacity(3);

    if let Some(manufacturer) = non_empty(&port.manufacturer) {
        parts.push(manufacturer.to_string());
    }
    if let (Some(vid), Some(pid)) = (non_empty(&port.vendor_id), non_empty(&port.product_id)) {
        parts.push(format!("VID:{} PID:{}", vid, pid));
    }
    if let Some(serial) = non_empty(&port.serial_number) {
        parts.push(format!("S/N:{}", serial));
    }

    if parts.is_empty() {
        port.path.clone()
    } else {
        parts.join(" | ")
    }
}
