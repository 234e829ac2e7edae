//! backend::memory
//!
//! In-memory backend implementing the same capability contract as etcd.
//!
//! # Design
//!
//! Entries live in an ordered map behind a mutex, so every operation is
//! atomic with respect to every other one. Versions come from a single
//! store-wide index that increases on every write, the way etcd's modify
//! index does.
//!
//! For tests the backend can:
//! - fail a chosen operation with a chosen error ([`FailOn`])
//! - slip a competing write in front of the next conditional writes on a key
//!   ([`InMemoryBackend::interleave_write`]), which deterministically
//!   reproduces a lost read-then-write race
//! - report every call it received ([`InMemoryBackend::operations`])
//!
//! # Example
//!
//! ```
//! use flowstate::backend::memory::InMemoryBackend;
//! use flowstate::backend::KvBackend;
//!
//! # tokio_test::block_on(async {
//! let backend = InMemoryBackend::new();
//!
//! let v1 = backend.set("faasflow/f/r/x", "0").await.unwrap();
//! let entry = backend.get("faasflow/f/r/x").await.unwrap();
//! assert_eq!(entry.value, "0");
//! assert_eq!(entry.version, v1);
//!
//! backend.compare_and_set("faasflow/f/r/x", "1", v1).await.unwrap();
//! assert!(backend.compare_and_set("faasflow/f/r/x", "2", v1).await.is_err());
//! # });
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::traits::{check_key_path, BackendError, Entry, KvBackend};
use crate::core::types::Version;

/// In-memory backend.
///
/// Cheap to clone; clones share state, so one instance can stand in for a
/// cluster that several store handles talk to.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Stored values and their versions, by full key.
    entries: BTreeMap<String, (String, Version)>,
    /// Last assigned version.
    index: u64,
    /// Operation to fail on.
    fail_on: Option<FailOn>,
    /// Pending competing writes, applied just before conditional writes.
    interleaved: Vec<Interleave>,
    /// Recorded operations for verification.
    operations: Vec<Operation>,
}

#[derive(Debug, Clone)]
struct Interleave {
    key: String,
    value: String,
    remaining: usize,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail get with the given error.
    Get(BackendError),
    /// Fail set with the given error.
    Set(BackendError),
    /// Fail compare_and_set with the given error.
    CompareAndSet(BackendError),
    /// Fail delete_recursive with the given error.
    DeleteRecursive(BackendError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Get {
        key: String,
    },
    Set {
        key: String,
        value: String,
    },
    CompareAndSet {
        key: String,
        value: String,
        expected: Version,
    },
    DeleteRecursive {
        prefix: String,
    },
}

impl Operation {
    /// The key or prefix the operation addressed.
    pub fn key(&self) -> &str {
        match self {
            Operation::Get { key }
            | Operation::Set { key, .. }
            | Operation::CompareAndSet { key, .. } => key,
            Operation::DeleteRecursive { prefix } => prefix,
        }
    }

    /// Whether the operation could modify the store.
    pub fn is_write(&self) -> bool {
        !matches!(self, Operation::Get { .. })
    }
}

impl InMemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the backend to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use flowstate::backend::memory::{FailOn, InMemoryBackend};
    /// use flowstate::backend::BackendError;
    ///
    /// let backend = InMemoryBackend::new()
    ///     .fail_on(FailOn::Get(BackendError::NetworkError("connection reset".into())));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.inner.lock().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.inner.lock().fail_on = None;
    }

    /// Make the next `times` conditional writes to `key` lose a race.
    ///
    /// Before each of them, `value` is written unconditionally, which moves
    /// the key's version past whatever the caller observed.
    pub fn interleave_write(&self, key: &str, value: &str, times: usize) {
        self.inner.lock().interleaved.push(Interleave {
            key: key.to_string(),
            value: value.to_string(),
            remaining: times,
        });
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<Operation> {
        self.inner.lock().operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.inner.lock().operations.clear();
    }

    /// Look up an entry without recording an operation.
    pub fn entry(&self, key: &str) -> Option<Entry> {
        let inner = self.inner.lock();
        inner.entries.get(key).map(|(value, version)| Entry {
            key: key.to_string(),
            value: value.clone(),
            version: *version,
        })
    }

    /// All stored keys, in order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().entries.keys().cloned().collect()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    fn check_fail(&self, expected: &str) -> Result<(), BackendError> {
        let inner = self.inner.lock();
        match &inner.fail_on {
            Some(FailOn::Get(e)) if expected == "get" => Err(e.clone()),
            Some(FailOn::Set(e)) if expected == "set" => Err(e.clone()),
            Some(FailOn::CompareAndSet(e)) if expected == "compare_and_set" => Err(e.clone()),
            Some(FailOn::DeleteRecursive(e)) if expected == "delete_recursive" => {
                Err(e.clone())
            }
            _ => Ok(()),
        }
    }
}

impl Inner {
    fn record(&mut self, op: Operation) {
        self.operations.push(op);
    }

    fn write(&mut self, key: &str, value: &str) -> Version {
        self.index += 1;
        let version = Version(self.index);
        self.entries
            .insert(key.to_string(), (value.to_string(), version));
        version
    }

    fn apply_interleaved(&mut self, key: &str) {
        let Some(pos) = self
            .interleaved
            .iter()
            .position(|i| i.key == key && i.remaining > 0)
        else {
            return;
        };

        let value = self.interleaved[pos].value.clone();
        self.interleaved[pos].remaining -= 1;
        if self.interleaved[pos].remaining == 0 {
            self.interleaved.remove(pos);
        }
        self.write(key, &value);
    }
}

#[async_trait]
impl KvBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Entry, BackendError> {
        self.inner.lock().record(Operation::Get {
            key: key.to_string(),
        });
        self.check_fail("get")?;
        check_key_path(key)?;

        self.entry(key)
            .ok_or_else(|| BackendError::NotFound(key.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<Version, BackendError> {
        self.inner.lock().record(Operation::Set {
            key: key.to_string(),
            value: value.to_string(),
        });
        self.check_fail("set")?;
        check_key_path(key)?;

        Ok(self.inner.lock().write(key, value))
    }

    async fn compare_and_set(
        &self,
        key: &str,
        value: &str,
        expected: Version,
    ) -> Result<Version, BackendError> {
        self.inner.lock().record(Operation::CompareAndSet {
            key: key.to_string(),
            value: value.to_string(),
            expected,
        });
        self.check_fail("compare_and_set")?;
        check_key_path(key)?;

        let mut inner = self.inner.lock();
        inner.apply_interleaved(key);

        let current = inner.entries.get(key).map(|(_, version)| *version);
        match current {
            None => Err(BackendError::NotFound(key.to_string())),
            Some(current) if current != expected => Err(BackendError::VersionMismatch {
                key: key.to_string(),
                expected,
            }),
            Some(_) => Ok(inner.write(key, value)),
        }
    }

    async fn delete_recursive(&self, prefix: &str) -> Result<(), BackendError> {
        self.inner.lock().record(Operation::DeleteRecursive {
            prefix: prefix.to_string(),
        });
        self.check_fail("delete_recursive")?;
        check_key_path(prefix)?;

        let child_prefix = format!("{}/", prefix);
        let mut inner = self.inner.lock();
        inner
            .entries
            .retain(|key, _| key != prefix && !key.starts_with(&child_prefix));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collapsible_keys_refused_like_etcd() {
        let backend = InMemoryBackend::new();
        backend.set("faasflow/order-flow/req-42/charge", "1").await.unwrap();

        for prefix in ["faasflow/../order-flow", "faasflow//order-flow", "faasflow/."] {
            let result = backend.delete_recursive(prefix).await;
            assert_eq!(result, Err(BackendError::InvalidKey(prefix.into())));
        }
        assert!(backend.set("a/", "1").await.is_err());
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn versions_increase_across_keys() {
        let backend = InMemoryBackend::new();

        let v1 = backend.set("a", "1").await.unwrap();
        let v2 = backend.set("b", "1").await.unwrap();
        let v3 = backend.set("a", "2").await.unwrap();

        assert!(v1 < v2 && v2 < v3);
        assert_eq!(backend.get("a").await.unwrap().version, v3);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let backend = InMemoryBackend::new();

        let result = backend.get("missing").await;
        assert_eq!(result, Err(BackendError::NotFound("missing".into())));
    }

    #[tokio::test]
    async fn compare_and_set_checks_version() {
        let backend = InMemoryBackend::new();
        let v1 = backend.set("k", "a").await.unwrap();

        let v2 = backend.compare_and_set("k", "b", v1).await.unwrap();
        assert!(v2 > v1);

        let stale = backend.compare_and_set("k", "c", v1).await;
        assert!(matches!(stale, Err(BackendError::VersionMismatch { .. })));
        assert_eq!(backend.get("k").await.unwrap().value, "b");
    }

    #[tokio::test]
    async fn compare_and_set_missing_key() {
        let backend = InMemoryBackend::new();

        let result = backend.compare_and_set("k", "v", Version(1)).await;
        assert!(matches!(result, Err(BackendError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_recursive_respects_segment_boundary() {
        let backend = InMemoryBackend::new();
        backend.set("root/f/r", "dir-value").await.unwrap();
        backend.set("root/f/r/a", "1").await.unwrap();
        backend.set("root/f/r/b/c", "2").await.unwrap();
        backend.set("root/f/r2/a", "3").await.unwrap();

        backend.delete_recursive("root/f/r").await.unwrap();

        assert_eq!(backend.keys(), vec!["root/f/r2/a".to_string()]);
    }

    #[tokio::test]
    async fn delete_recursive_absent_is_ok() {
        let backend = InMemoryBackend::new();
        backend.delete_recursive("nothing/here").await.unwrap();
        backend.delete_recursive("nothing/here").await.unwrap();
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn interleave_write_forces_mismatch() {
        let backend = InMemoryBackend::new();
        let v1 = backend.set("k", "0").await.unwrap();
        backend.interleave_write("k", "5", 1);

        let result = backend.compare_and_set("k", "1", v1).await;
        assert!(matches!(result, Err(BackendError::VersionMismatch { .. })));
        assert_eq!(backend.get("k").await.unwrap().value, "5");

        // Interference used up; a fresh read now wins.
        let current = backend.get("k").await.unwrap();
        backend
            .compare_and_set("k", "6", current.version)
            .await
            .unwrap();
        assert_eq!(backend.entry("k").unwrap().value, "6");
    }

    #[tokio::test]
    async fn interleave_only_targets_its_key() {
        let backend = InMemoryBackend::new();
        let va = backend.set("a", "0").await.unwrap();
        backend.set("b", "0").await.unwrap();
        backend.interleave_write("b", "9", 1);

        backend.compare_and_set("a", "1", va).await.unwrap();
        assert_eq!(backend.entry("b").unwrap().value, "0");
    }

    #[tokio::test]
    async fn fail_on_get() {
        let backend =
            InMemoryBackend::new().fail_on(FailOn::Get(BackendError::NetworkError("down".into())));
        backend.set("k", "v").await.unwrap();

        let result = backend.get("k").await;
        assert_eq!(result, Err(BackendError::NetworkError("down".into())));

        backend.clear_fail_on();
        assert_eq!(backend.get("k").await.unwrap().value, "v");
    }

    #[tokio::test]
    async fn operations_recorded() {
        let backend = InMemoryBackend::new();
        let v = backend.set("k", "v").await.unwrap();
        let _ = backend.get("k").await;
        let _ = backend.compare_and_set("k", "w", v).await;
        backend.delete_recursive("k").await.unwrap();

        let ops = backend.operations();
        assert_eq!(ops.len(), 4);
        assert!(matches!(ops[0], Operation::Set { .. }));
        assert!(matches!(ops[1], Operation::Get { .. }));
        assert!(matches!(ops[2], Operation::CompareAndSet { .. }));
        assert!(matches!(ops[3], Operation::DeleteRecursive { .. }));
        assert!(ops.iter().all(|op| op.key() == "k"));
        assert!(!ops[1].is_write());

        backend.clear_operations();
        assert!(backend.operations().is_empty());
    }

    #[test]
    fn backend_name() {
        assert_eq!(InMemoryBackend::new().name(), "memory");
    }

    #[test]
    fn clones_share_state() {
        let a = InMemoryBackend::new();
        let b = a.clone();
        tokio_test::block_on(a.set("k", "v")).unwrap();
        assert_eq!(b.len(), 1);
    }
}
