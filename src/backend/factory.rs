//! backend::factory
//!
//! Backend selection and creation.
//!
//! # Design
//!
//! Callers use `create_backend()` instead of importing a concrete backend,
//! so the store only ever sees `Arc<dyn KvBackend>`.
//!
//! # Example
//!
//! ```
//! use flowstate::backend::{create_backend, BackendProvider};
//! use flowstate::core::config::Config;
//!
//! let backend = create_backend(&Config::default()).unwrap();
//! assert_eq!(backend.name(), "etcd");
//!
//! assert_eq!(BackendProvider::parse("memory"), Some(BackendProvider::Memory));
//! ```

use std::sync::Arc;

use super::etcd::EtcdBackend;
use super::memory::InMemoryBackend;
use super::traits::{BackendError, KvBackend};
use crate::core::config::Config;

/// Supported backend providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendProvider {
    /// etcd v2 keys API over HTTP
    Etcd,
    /// Process-local in-memory store.
    ///
    /// State lives only as long as the process, so each `flowstate` command
    /// starts empty. Meant for tests and for embedding the library.
    Memory,
}

impl BackendProvider {
    /// Get all available providers.
    pub fn all() -> &'static [BackendProvider] {
        &[BackendProvider::Etcd, BackendProvider::Memory]
    }

    /// Get the provider name as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            BackendProvider::Etcd => "etcd",
            BackendProvider::Memory => "memory",
        }
    }

    /// Parse a provider from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "etcd" => Some(BackendProvider::Etcd),
            "memory" => Some(BackendProvider::Memory),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackendProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Names accepted for the `backend` config key.
pub fn valid_backend_names() -> Vec<&'static str> {
    BackendProvider::all().iter().map(|p| p.name()).collect()
}

/// Create the backend described by `config`.
///
/// # Errors
///
/// - `NotImplemented` if the provider name is unknown
/// - `NetworkError` if the etcd endpoint is unusable
pub fn create_backend(config: &Config) -> Result<Arc<dyn KvBackend>, BackendError> {
    let provider = BackendProvider::parse(config.backend()).ok_or_else(|| {
        BackendError::NotImplemented(format!(
            "unknown backend '{}' (valid: {})",
            config.backend(),
            valid_backend_names().join(", ")
        ))
    })?;

    match provider {
        BackendProvider::Etcd => Ok(Arc::new(EtcdBackend::with_timeout(
            config.endpoint(),
            config.request_timeout(),
        )?)),
        BackendProvider::Memory => Ok(Arc::new(InMemoryBackend::new())),
    }
}
