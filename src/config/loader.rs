//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "BUTTON_BRIDGE";

/// Config file name looked up in the working directory
const LOCAL_CONFIG_FILE_NAME: &str = "button-bridge.toml";

/// Config file name inside the platform config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "BUTTON_BRIDGE_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `BUTTON_BRIDGE_CONFIG` environment variable (explicit path)
    /// 2. `./button-bridge.toml` (current directory)
    /// 3. `<platform config dir>/button-bridge/config.toml`
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override file values; the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        // Still apply env overrides even with defaults
        if let Err(e) = apply_env_overrides(&mut config) {
            tracing::warn!("Ignoring environment overrides: {}", e);
            config = Config::default();
        }

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to the file it was loaded from.
    pub fn save(&self) -> ConfigResult<()> {
        let path = self
            .config_path
            .as_ref()
            .ok_or(ConfigError::NoSavePath)?;

        save_to_file(&self.config, path)
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        tracing::warn!("{} points to missing file {}", CONFIG_PATH_ENV, path.display());
    }

    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|path| path.exists())
}

/// Get the platform config directory for the bridge.
pub fn get_default_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "button-bridge")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read `BUTTON_BRIDGE_<key>` and parse it, if set.
fn env_value<T: FromStr>(key: &str, what: &str) -> ConfigResult<Option<T>> {
    let var = format!("{}_{}", ENV_PREFIX, key);
    match std::env::var(&var) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::bad_override(var, format!("Invalid {}", what))),
        Err(_) => Ok(None),
    }
}

fn env_list(key: &str) -> Option<Vec<String>> {
    std::env::var(format!("{}_{}", ENV_PREFIX, key))
        .ok()
        .map(|val| {
            val.split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern `BUTTON_BRIDGE_<SECTION>_<KEY>`,
/// for example `BUTTON_BRIDGE_DEVICE_RECONNECT_DELAY_MS=500`. List values
/// are comma separated.
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Some(val) = env_value("DEVICE_BAUD_RATE", "baud rate")? {
        config.device.baud_rate = val;
    }
    if let Some(val) = env_value("DEVICE_CONNECTION_TIMEOUT_MS", "timeout")? {
        config.device.connection_timeout_ms = val;
    }
    if let Some(val) = env_value("DEVICE_RECONNECT_DELAY_MS", "delay")? {
        config.device.reconnect_delay_ms = val;
    }
    if let Some(val) = env_value("DEVICE_MAX_RECONNECT_ATTEMPTS", "attempt count")? {
        config.device.max_reconnect_attempts = val;
    }

    if let Some(val) = env_list("DISCOVERY_VENDOR_IDS") {
        config.discovery.vendor_ids = val;
    }
    if let Some(val) = env_list("DISCOVERY_PORT_KEYWORDS") {
        config.discovery.port_keywords = val;
    }
    if let Some(val) = env_value("DISCOVERY_MATCH_COM_PORTS", "boolean")? {
        config.discovery.match_com_ports = val;
    }

    if let Some(val) = env_list("FILTER_LABELS") {
        config.filter.labels = val;
    }
    if let Some(val) = env_value("FILTER_DEBOUNCE_MS", "debounce interval")? {
        config.filter.debounce_ms = val;
    }
    if let Some(val) = env_value("FILTER_MAX_PRESSES_PER_SECOND", "press limit")? {
        config.filter.max_presses_per_second = val;
    }
    if let Some(val) = env_value("FILTER_STATS_RESET_INTERVAL_SECS", "interval")? {
        config.filter.stats_reset_interval_secs = val;
    }

    if let Ok(val) = std::env::var(format!("{}_LOGGING_LEVEL", ENV_PREFIX)) {
        config.logging.level = val;
    }

    Ok(())
}
