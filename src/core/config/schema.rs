//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Store Config
//!
//! Located at (in order of precedence):
//! 1. `$FLOWSTATE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/flowstate/config.toml`
//! 3. `~/.flowstate/config.toml` (canonical write location)
//!
//! # Validation
//!
//! Config values are validated after parsing so a bad file fails at startup
//! rather than on the first store operation.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Store configuration as written on disk.
///
/// Every field is optional; [`super::Config`] applies defaults.
///
/// # Example
///
/// ```toml
/// backend = "etcd"
/// endpoint = "http://etcd.internal:2379"
/// root = "faasflow"
/// retry_budget = 10
/// request_timeout_ms = 5000
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Backing store provider ("etcd" or "memory")
    pub backend: Option<String>,

    /// Backing store endpoint address
    pub endpoint: Option<String>,

    /// Namespace root segment
    pub root: Option<String>,

    /// Maximum read-compute-write cycles per counter increment
    pub retry_budget: Option<u32>,

    /// Deadline for a single backing-store round trip, in milliseconds
    pub request_timeout_ms: Option<u64>,
}

impl StoreConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(backend) = &self.backend {
            let valid = crate::backend::valid_backend_names();
            if !valid.contains(&backend.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid backend '{}', must be one of: {}",
                    backend,
                    valid.join(", ")
                )));
            }
        }

        if let Some(endpoint) = &self.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "endpoint '{}' must start with http:// or https://",
                    endpoint
                )));
            }
        }

        if let Some(root) = &self.root {
            if root.is_empty() || root.contains('/') || root == "." || root == ".." {
                return Err(ConfigError::InvalidValue(format!(
                    "root '{}' must be a single path segment other than '.' or '..'",
                    root
                )));
            }
        }

        if self.retry_budget == Some(0) {
            return Err(ConfigError::InvalidValue(
                "retry_budget must be at least 1".into(),
            ));
        }

        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue(
                "request_timeout_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merge(self, other: StoreConfig) -> StoreConfig {
        StoreConfig {
            backend: other.backend.or(self.backend),
            endpoint: other.endpoint.or(self.endpoint),
            root: other.root.or(self.root),
            retry_budget: other.retry_budget.or(self.retry_budget),
            request_timeout_ms: other.request_timeout_ms.or(self.request_timeout_ms),
        }
    }
}
