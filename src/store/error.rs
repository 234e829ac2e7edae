//! store::error
//!
//! Errors surfaced by state store operations.
//!
//! Every variant names the namespace and the key (or vertex) involved, so a
//! caller can log and act without extra context. Kinds map onto the caller's
//! choices:
//!
//! - `NotFound`: nothing stored there (or the run was cleaned up)
//! - `StaleValue`: the caller's expected old value was wrong; re-read
//! - `ConcurrentModification`: the caller raced another writer; retry
//! - `RetryExhausted`: an increment lost every race in its budget
//! - `CorruptState`: a counter holds something that is not a count
//! - `Transport`: the backing store could not be reached or answered badly

use thiserror::Error;

use crate::backend::BackendError;
use crate::core::types::TypeError;

/// Errors from state store operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// An operation ran before `configure` set up a namespace.
    #[error("state store used before configure")]
    NotConfigured,

    /// The key suffix could escape the namespace.
    #[error(transparent)]
    InvalidKey(#[from] TypeError),

    /// The key (or the whole namespace) does not exist.
    #[error("not found: {key} in {namespace}")]
    NotFound { namespace: String, key: String },

    /// The stored value did not match the caller's expected old value.
    #[error("stale value for {key} in {namespace}: expected '{expected}', found '{actual}'")]
    StaleValue {
        namespace: String,
        key: String,
        expected: String,
        actual: String,
    },

    /// The key's version changed between the read and the conditional write.
    #[error("concurrent modification of {key} in {namespace}")]
    ConcurrentModification { namespace: String, key: String },

    /// A counter increment lost the race on every attempt in its budget.
    #[error("increment of {vertex} in {namespace} gave up after {attempts} attempts: {last}")]
    RetryExhausted {
        namespace: String,
        vertex: String,
        attempts: u32,
        #[source]
        last: Box<StoreError>,
    },

    /// A counter's value is not a non-negative integer.
    #[error("corrupt counter {key} in {namespace}: '{value}' is not a count")]
    CorruptState {
        namespace: String,
        key: String,
        value: String,
    },

    /// The backing store failed.
    #[error("transport error on {key} in {namespace}: {source}")]
    Transport {
        namespace: String,
        key: String,
        #[source]
        source: BackendError,
    },
}

impl StoreError {
    /// Map a backend failure that has no operation-specific meaning.
    ///
    /// `NotFound` keeps its kind; everything else is a transport failure.
    pub(crate) fn from_backend(namespace: &str, key: &str, err: BackendError) -> Self {
        match err {
            BackendError::NotFound(_) => StoreError::NotFound {
                namespace: namespace.to_string(),
                key: key.to_string(),
            },
            source => StoreError::Transport {
                namespace: namespace.to_string(),
                key: key.to_string(),
                source,
            },
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Check if this error means another writer got there first.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::StaleValue { .. } | StoreError::ConcurrentModification { .. }
        )
    }

    /// Check if a caller-level retry with fresh data may succeed.
    ///
    /// `StaleValue` is excluded: retrying with the same expected value fails
    /// the same way.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::ConcurrentModification { .. } | StoreError::RetryExhausted { .. }
        )
    }

    /// Check if this is a backing store failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Version;

    #[test]
    fn from_backend_keeps_not_found() {
        let err = StoreError::from_backend(
            "faasflow/f/r",
            "charge",
            BackendError::NotFound("faasflow/f/r/charge".into()),
        );
        assert_eq!(
            err,
            StoreError::NotFound {
                namespace: "faasflow/f/r".into(),
                key: "charge".into()
            }
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn from_backend_wraps_transport() {
        let err = StoreError::from_backend(
            "faasflow/f/r",
            "charge",
            BackendError::NetworkError("connection refused".into()),
        );
        assert!(err.is_transport());
        assert_eq!(
            err.to_string(),
            "transport error on charge in faasflow/f/r: network error: connection refused"
        );
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            StoreError::NotConfigured.to_string(),
            "state store used before configure"
        );
        assert_eq!(
            StoreError::StaleValue {
                namespace: "ns".into(),
                key: "k".into(),
                expected: "0".into(),
                actual: "1".into(),
            }
            .to_string(),
            "stale value for k in ns: expected '0', found '1'"
        );
        assert_eq!(
            StoreError::CorruptState {
                namespace: "ns".into(),
                key: "v".into(),
                value: "abc".into(),
            }
            .to_string(),
            "corrupt counter v in ns: 'abc' is not a count"
        );
    }

    #[test]
    fn retry_exhausted_carries_last_cause() {
        let err = StoreError::RetryExhausted {
            namespace: "ns".into(),
            vertex: "charge".into(),
            attempts: 10,
            last: Box::new(StoreError::ConcurrentModification {
                namespace: "ns".into(),
                key: "charge".into(),
            }),
        };

        assert!(err.is_retryable());
        assert!(err.to_string().contains("after 10 attempts"));
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "concurrent modification of charge in ns");
    }

    #[test]
    fn classification() {
        let stale = StoreError::StaleValue {
            namespace: "ns".into(),
            key: "k".into(),
            expected: "a".into(),
            actual: "b".into(),
        };
        let raced = StoreError::ConcurrentModification {
            namespace: "ns".into(),
            key: "k".into(),
        };

        assert!(stale.is_conflict() && !stale.is_retryable());
        assert!(raced.is_conflict() && raced.is_retryable());

        let transport = StoreError::from_backend(
            "ns",
            "k",
            BackendError::VersionMismatch {
                key: "ns/k".into(),
                expected: Version(3),
            },
        );
        assert!(transport.is_transport());
        assert!(!transport.is_conflict());
    }

    #[test]
    fn invalid_key_is_transparent() {
        let err: StoreError = TypeError::InvalidKey("key cannot be empty".into()).into();
        assert_eq!(err.to_string(), "invalid key: key cannot be empty");
    }
}
