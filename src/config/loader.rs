use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::types::Config;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/tether/config.toml` on Unix, or the platform
    /// equivalent via `dirs::config_dir()`. Falls back to the current
    /// directory if no config dir is available.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("tether").join("config.toml")
    }

    /// Loads configuration from the default config file.
    ///
    /// A missing file yields `Config::default()`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Config::default());
        }
        Self::load_from(&path)
    }

    /// Loads and validates configuration from `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - `server.bind_addr` is a socket address
    /// - session limits are non-zero
    /// - every route path starts with `/`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "server.bind_addr '{}' is not a valid socket address",
                    self.server.bind_addr
                ),
            });
        }

        if self.session.max_sessions == 0 {
            return Err(ConfigError::ValidationError {
                message: "session.max_sessions must be at least 1".to_string(),
            });
        }

        if self.session.event_timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "session.event_timeout_ms must be at least 1".to_string(),
            });
        }

        if self.session.render_depth_limit == 0 {
            return Err(ConfigError::ValidationError {
                message: "session.render_depth_limit must be at least 1".to_string(),
            });
        }

        if let Some((name, path)) = self.routes.iter().find(|(_, path)| !path.starts_with('/')) {
            return Err(ConfigError::ValidationError {
                message: format!("route '{}' must start with '/', got '{}'", name, path),
            });
        }

        Ok(())
    }
}
