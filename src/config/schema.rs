//! Configuration schema definitions.
//!
//! Every section has serde defaults, so a config file only needs the keys it
//! changes. Defaults match the stock five-button Arduino controller.

use super::error::{ConfigError, ConfigResult};
use crate::port::PortConfiguration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial connection and reconnect policy
    pub device: DeviceConfig,
    /// Controller detection heuristics
    pub discovery: DiscoveryConfig,
    /// Input validation, debounce and spam suppression
    pub filter: FilterConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values the bridge cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.device.baud_rate == 0 {
            return Err(ConfigError::invalid(
                "device.baud_rate",
                "must be greater than zero",
            ));
        }
        if self.filter.labels.is_empty() {
            return Err(ConfigError::invalid(
                "filter.labels",
                "at least one button label is required",
            ));
        }
        if self.filter.labels.iter().any(|l| l.trim() != l || l.is_empty()) {
            return Err(ConfigError::invalid(
                "filter.labels",
                "labels must be non-empty and free of surrounding whitespace",
            ));
        }
        if self.filter.history_capacity == 0 {
            return Err(ConfigError::invalid(
                "filter.history_capacity",
                "must be greater than zero",
            ));
        }
        if self.filter.max_presses_per_second == 0 {
            return Err(ConfigError::invalid(
                "filter.max_presses_per_second",
                "must be greater than zero",
            ));
        }
        if self.filter.max_presses_per_second > self.filter.history_capacity {
            return Err(ConfigError::invalid(
                "filter.max_presses_per_second",
                format!(
                    "cannot exceed filter.history_capacity ({})",
                    self.filter.history_capacity
                ),
            ));
        }
        if self.filter.stats_reset_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "filter.stats_reset_interval_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Serial connection section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Baud rate of the controller firmware
    pub baud_rate: u32,
    /// Upper bound for a single open attempt, in milliseconds
    pub connection_timeout_ms: u64,
    /// Pause between automatic reconnect attempts, in milliseconds
    pub reconnect_delay_ms: u64,
    /// Automatic reconnect attempts before giving up
    pub max_reconnect_attempts: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            connection_timeout_ms: 1000,
            reconnect_delay_ms: 3000,
            max_reconnect_attempts: 5,
        }
    }
}

impl DeviceConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Transport parameters for opening the controller.
    pub fn port_configuration(&self) -> PortConfiguration {
        PortConfiguration {
            baud_rate: self.baud_rate,
            timeout: self.connection_timeout(),
        }
    }
}

/// Controller detection section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// USB vendor ids (4 hex digits) of known controller boards
    pub vendor_ids: Vec<String>,
    /// Substrings of manufacturer names or device paths that mark a controller
    pub port_keywords: Vec<String>,
    /// Treat bare `COMn` ports as controllers
    pub match_com_ports: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            vendor_ids: ["2341", "1a86", "0403", "2a03", "10c4"]
                .into_iter()
                .map(String::from)
                .collect(),
            port_keywords: ["arduino", "usbserial", "usbmodem", "ch340", "cp210"]
                .into_iter()
                .map(String::from)
                .collect(),
            match_com_ports: cfg!(windows),
        }
    }
}

/// Input filter section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Accepted button labels; any other line is rejected
    pub labels: Vec<String>,
    /// Minimum time between two accepted presses of one button
    pub debounce_ms: u64,
    /// Accepted presses of one button within any second before the rest count as spam
    pub max_presses_per_second: usize,
    /// Timestamps remembered per button
    pub history_capacity: usize,
    /// Statistics window length in seconds
    pub stats_reset_interval_secs: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            labels: (1..=5).map(|n| n.to_string()).collect(),
            debounce_ms: 200,
            max_presses_per_second: 10,
            history_capacity: 100,
            stats_reset_interval_secs: 60,
        }
    }
}

impl FilterConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn stats_reset_interval(&self) -> Duration {
        Duration::from_secs(self.stats_reset_interval_secs)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}
