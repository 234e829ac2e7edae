//! backend::traits
//!
//! Capability contract for the versioned key-value service that holds
//! workflow state.
//!
//! # Design
//!
//! The `KvBackend` trait is async because every operation is a network round
//! trip. It exposes exactly four capabilities:
//! - get a key with its version
//! - set a key unconditionally
//! - set a key only if its version still matches
//! - delete a prefix recursively
//!
//! Consistency is guaranteed per key only. There are no multi-key
//! transactions and no watches.
//!
//! # Example
//!
//! ```ignore
//! use flowstate::backend::{KvBackend, BackendError};
//!
//! async fn bump(backend: &dyn KvBackend, key: &str) -> Result<(), BackendError> {
//!     let entry = backend.get(key).await?;
//!     let next = entry.value.parse::<u64>().unwrap_or(0) + 1;
//!     backend
//!         .compare_and_set(key, &next.to_string(), entry.version)
//!         .await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::Version;

/// Errors from backing store operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The key does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A conditional write was rejected because the key's version moved.
    #[error("version mismatch on {key}: expected {expected}")]
    VersionMismatch {
        /// Full key the write targeted
        key: String,
        /// Version the caller observed
        expected: Version,
    },

    /// The service answered with an error we do not map to a kind.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the service
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The round trip did not finish before its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The key has a segment the service would collapse (empty, `.`, `..`).
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The operation is not supported by this backend.
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

impl BackendError {
    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound(_))
    }

    /// Check if this is a version conflict on a conditional write.
    pub fn is_version_mismatch(&self) -> bool {
        matches!(self, BackendError::VersionMismatch { .. })
    }
}

/// Refuse keys with an empty, `.` or `..` segment.
///
/// Path-addressed services normalise such segments away, which would point
/// the request at a different key.
pub fn check_key_path(key: &str) -> Result<(), BackendError> {
    if key.split('/').any(|s| s.is_empty() || s == "." || s == "..") {
        return Err(BackendError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// A stored value together with its compare token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Full key
    pub key: String,
    /// Opaque value
    pub value: String,
    /// Version assigned by the store on the last write
    pub version: Version,
}

/// The capability contract of the backing store.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; many handles and tasks may share
/// one backend and race on the same key.
///
/// # Error Handling
///
/// - `NotFound`: key (or prefix, for reads) absent
/// - `VersionMismatch`: only from [`KvBackend::compare_and_set`]
/// - `ApiError` / `NetworkError` / `Timeout`: transport-level failures,
///   never retried by the backend itself
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Get the backend name (e.g., "etcd", "memory").
    fn name(&self) -> &'static str;

    /// Read a key's value and version.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the key does not exist
    async fn get(&self, key: &str) -> Result<Entry, BackendError>;

    /// Create or overwrite a key without any precondition.
    ///
    /// Returns the version assigned to the write.
    async fn set(&self, key: &str, value: &str) -> Result<Version, BackendError>;

    /// Overwrite a key only if its current version equals `expected`.
    ///
    /// Returns the version assigned to the write.
    ///
    /// # Errors
    ///
    /// - `VersionMismatch` if another write landed since `expected` was read
    /// - `NotFound` if the key was deleted in the meantime
    async fn compare_and_set(
        &self,
        key: &str,
        value: &str,
        expected: Version,
    ) -> Result<Version, BackendError>;

    /// Delete `prefix` and everything under it.
    ///
    /// Deleting an absent prefix succeeds.
    async fn delete_recursive(&self, prefix: &str) -> Result<(), BackendError>;
}
