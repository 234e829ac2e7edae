//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. Environment (`FLOWSTATE_ENDPOINT`, `FLOWSTATE_RETRY_BUDGET`)
//! 4. CLI flags (not handled here)
//!
//! # Config Locations
//!
//! Searched in order:
//! 1. `$FLOWSTATE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/flowstate/config.toml`
//! 3. `~/.flowstate/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use flowstate::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! println!("Endpoint: {}", config.endpoint());
//! println!("Retry budget: {}", config.retry_budget());
//! ```

pub mod schema;

pub use schema::StoreConfig;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::namespace::DEFAULT_ROOT;

/// Default backing store endpoint (local etcd client port).
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:2379";

/// Default counter increment retry budget.
pub const DEFAULT_RETRY_BUDGET: u32 = 10;

/// Default per round-trip deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default backend provider.
pub const DEFAULT_BACKEND: &str = "etcd";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Resolved configuration.
///
/// Accessors apply defaults for anything left unset.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Merged file and environment values
    pub store: StoreConfig,
    /// Path to the config file (if one was loaded)
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default locations and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed, or if
    /// any resolved value is invalid. A missing file is not an error.
    pub fn load() -> Result<Config, ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Load configuration from an explicit file, still applying environment
    /// overrides.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let file = Self::read_config(path)?;
        Self::resolve(file, Some(path.to_path_buf()), |name| {
            std::env::var(name).ok()
        })
    }

    /// Load configuration using `env` to look up environment variables.
    pub fn load_with<F>(env: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (file, path) = match Self::find_config_file(&env) {
            Some(path) => (Self::read_config(&path)?, Some(path)),
            None => (StoreConfig::default(), None),
        };
        Self::resolve(file, path, env)
    }

    /// Layer `overrides` (typically CLI flags) on top and re-validate.
    pub fn with_overrides(self, overrides: StoreConfig) -> Result<Config, ConfigError> {
        let store = self.store.merge(overrides);
        store.validate()?;
        Ok(Config {
            store,
            path: self.path,
        })
    }

    fn resolve<F>(file: StoreConfig, path: Option<PathBuf>, env: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = file.merge(Self::env_overrides(&env)?);
        store.validate()?;
        Ok(Config { store, path })
    }

    /// Locate the first existing config file.
    fn find_config_file<F>(env: &F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        // 1. Check $FLOWSTATE_CONFIG
        if let Some(path) = env("FLOWSTATE_CONFIG").map(PathBuf::from) {
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check $XDG_CONFIG_HOME/flowstate/config.toml
        if let Some(xdg_home) = env("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("flowstate/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.flowstate/config.toml
        let path = dirs::home_dir()?.join(".flowstate/config.toml");
        path.exists().then_some(path)
    }

    fn env_overrides<F>(env: &F) -> Result<StoreConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let retry_budget = match env("FLOWSTATE_RETRY_BUDGET") {
            Some(raw) => Some(raw.trim().parse::<u32>().map_err(|_| {
                ConfigError::InvalidValue(format!(
                    "FLOWSTATE_RETRY_BUDGET must be a positive integer, got '{}'",
                    raw
                ))
            })?),
            None => None,
        };

        Ok(StoreConfig {
            endpoint: env("FLOWSTATE_ENDPOINT"),
            retry_budget,
            ..Default::default()
        })
    }

    /// Read and parse a config file.
    fn read_config(path: &Path) -> Result<StoreConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Backend provider name. Defaults to "etcd".
    pub fn backend(&self) -> &str {
        self.store.backend.as_deref().unwrap_or(DEFAULT_BACKEND)
    }

    /// Backing store endpoint. Defaults to the local etcd client port.
    pub fn endpoint(&self) -> &str {
        self.store.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    /// Namespace root. Defaults to "faasflow".
    pub fn root(&self) -> &str {
        self.store.root.as_deref().unwrap_or(DEFAULT_ROOT)
    }

    /// Counter increment retry budget. Defaults to 10.
    pub fn retry_budget(&self) -> u32 {
        self.store.retry_budget.unwrap_or(DEFAULT_RETRY_BUDGET)
    }

    /// Per round-trip deadline. Defaults to 5 seconds.
    pub fn request_timeout(&self) -> Duration {
        self.store
            .request_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Get the path to the loaded config file.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
