//! Errors raised while loading, overriding or saving the bridge config.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a valid bridge config: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot encode config as TOML: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value the bridge cannot run with, keyed by `section.field`.
    #[error("{key}: {message}")]
    Invalid { key: String, message: String },

    /// A `BUTTON_BRIDGE_*` override that does not parse.
    #[error("{var}: {message}")]
    BadOverride { var: String, message: String },

    /// `save()` on a loader that was never backed by a file.
    #[error("no config file to save to")]
    NoSavePath,
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn bad_override(var: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadOverride {
            var: var.into(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
