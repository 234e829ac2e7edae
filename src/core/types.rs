//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`StateKey`] - Validated key suffix addressed under a namespace
//! - [`Version`] - Backing-store modify index used as the CAS token
//!
//! # Validation
//!
//! These types enforce validity at construction time. A key that could
//! escape its namespace cannot be represented.
//!
//! # Examples
//!
//! ```
//! use flowstate::core::types::StateKey;
//!
//! let key = StateKey::new("charge").unwrap();
//! assert_eq!(key.as_str(), "charge");
//!
//! assert!(StateKey::new("").is_err());
//! assert!(StateKey::new("../other-run/state").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// The suffix reserved for the pipeline-active flag.
pub const STATE_KEY: &str = "state";

/// A validated key suffix.
///
/// Suffixes are appended to a namespace prefix, so they must not be able to
/// walk out of it. Rules:
/// - Cannot be empty
/// - Cannot start or end with `/`
/// - Cannot contain an empty, `.` or `..` path segment
/// - Cannot contain ASCII control characters
///
/// Nested suffixes such as `vertex/charge` are allowed.
///
/// # Example
///
/// ```
/// use flowstate::core::types::StateKey;
///
/// let nested = StateKey::new("outputs/charge").unwrap();
/// assert_eq!(nested.as_str(), "outputs/charge");
///
/// assert!(StateKey::new("/absolute").is_err());
/// assert!(StateKey::new("a//b").is_err());
/// assert!(StateKey::new("a/./b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StateKey(String);

impl StateKey {
    /// Create a new validated key suffix.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidKey` if the suffix could escape its namespace.
    pub fn new(key: impl Into<String>) -> Result<Self, TypeError> {
        let key = key.into();
        Self::validate(&key)?;
        Ok(Self(key))
    }

    /// The distinguished pipeline-state key.
    pub fn state() -> Self {
        Self(STATE_KEY.to_string())
    }

    fn validate(key: &str) -> Result<(), TypeError> {
        if key.is_empty() {
            return Err(TypeError::InvalidKey("key cannot be empty".into()));
        }

        if key.starts_with('/') || key.ends_with('/') {
            return Err(TypeError::InvalidKey(format!(
                "key '{key}' cannot start or end with '/'"
            )));
        }

        if key.chars().any(|c| c.is_ascii_control()) {
            return Err(TypeError::InvalidKey(
                "key cannot contain control characters".into(),
            ));
        }

        for segment in key.split('/') {
            match segment {
                "" => {
                    return Err(TypeError::InvalidKey(format!(
                        "key '{key}' cannot contain '//'"
                    )))
                }
                "." | ".." => {
                    return Err(TypeError::InvalidKey(format!(
                        "key '{key}' cannot contain a '{segment}' segment"
                    )))
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StateKey {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for StateKey {
    type Error = TypeError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<StateKey> for String {
    fn from(key: StateKey) -> Self {
        key.0
    }
}

impl AsRef<str> for StateKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing per-key version assigned by the backing store.
///
/// etcd calls this the modify index. Conditional writes compare it for
/// equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(pub u64);

impl Version {
    /// Get the raw index.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
