//! Configuration module for the button bridge.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `BUTTON_BRIDGE_CONFIG` environment variable (explicit path)
//! 2. `./button-bridge.toml` (current directory)
//! 3. `config.toml` in the platform config directory
//!    (`~/.config/button-bridge/` on Linux, `%APPDATA%\button-bridge\config\` on Windows)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is: `BUTTON_BRIDGE_<SECTION>_<KEY>`
//!
//! Examples:
//! - `BUTTON_BRIDGE_DEVICE_BAUD_RATE=115200`
//! - `BUTTON_BRIDGE_FILTER_DEBOUNCE_MS=150`
//! - `BUTTON_BRIDGE_DISCOVERY_VENDOR_IDS=2341,1a86`
//!
//! # Example
//!
//! ```rust,ignore
//! use serial_button_bridge::config::ConfigLoader;
//!
//! let config = ConfigLoader::load()?.into_config();
//! println!("Debounce: {:?}", config.filter.debounce());
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, DeviceConfig, DiscoveryConfig, FilterConfig, LogFormat, LoggingConfig};
