//! store::kv
//!
//! `StateStore` implementation over any [`KvBackend`].
//!
//! # Design
//!
//! The store is a thin, stateless-between-calls client. It owns the
//! namespace and the retry budget, holds an injected backend, and re-reads
//! from the backend on every call. Nothing is cached, so there is nothing to
//! invalidate.
//!
//! Every backend round trip runs under the request deadline. A round trip
//! that misses it surfaces as `Transport(Timeout)`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use flowstate::backend::memory::InMemoryBackend;
//! use flowstate::store::{KvStateStore, StateStore};
//!
//! # tokio_test::block_on(async {
//! let mut store = KvStateStore::new(Arc::new(InMemoryBackend::new()));
//! store.configure("order-flow", "req-42");
//!
//! store.create(&["validate", "charge"]).await.unwrap();
//! assert_eq!(store.increment_counter("charge").await.unwrap(), 1);
//! assert_eq!(store.get("charge").await.unwrap(), "1");
//! # });
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::counter::Increment;
use super::error::StoreError;
use super::traits::StateStore;
use crate::backend::etcd::EtcdBackend;
use crate::backend::{create_backend, BackendError, KvBackend};
use crate::core::config::{Config, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_BUDGET};
use crate::core::namespace::{Namespace, DEFAULT_ROOT};
use crate::core::types::StateKey;

/// Run one backend round trip under `timeout`.
pub(crate) async fn with_deadline<T, F>(
    timeout: Duration,
    round_trip: F,
) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    tokio::time::timeout(timeout, round_trip)
        .await
        .unwrap_or(Err(BackendError::Timeout(timeout)))
}

/// Per-run state store over a versioned key-value backend.
///
/// Cheap to clone. Clones share the backend but carry their own namespace,
/// so one backend can serve many concurrent runs.
#[derive(Clone)]
pub struct KvStateStore {
    backend: Arc<dyn KvBackend>,
    root: String,
    namespace: Option<Namespace>,
    retry_budget: u32,
    request_timeout: Duration,
}

impl std::fmt::Debug for KvStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStateStore")
            .field("backend", &self.backend.name())
            .field("root", &self.root)
            .field("namespace", &self.namespace)
            .field("retry_budget", &self.retry_budget)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl KvStateStore {
    /// Create an unconfigured store over `backend` with default settings.
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self {
            backend,
            root: DEFAULT_ROOT.to_string(),
            namespace: None,
            retry_budget: DEFAULT_RETRY_BUDGET,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Create a store talking to the etcd cluster at `endpoint`.
    ///
    /// No connection is made until the first operation.
    ///
    /// # Errors
    ///
    /// - `NetworkError` if `endpoint` is not a usable URL
    pub fn connect(endpoint: &str) -> Result<Self, BackendError> {
        Ok(Self::new(Arc::new(EtcdBackend::new(endpoint)?)))
    }

    /// Create a store from loaded configuration.
    ///
    /// # Errors
    ///
    /// Anything [`create_backend`] returns.
    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        Ok(Self::new(create_backend(config)?)
            .with_root(config.root())
            .with_retry_budget(config.retry_budget())
            .with_request_timeout(config.request_timeout()))
    }

    /// Set the increment retry budget. Values below 1 are raised to 1.
    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget.max(1);
        self
    }

    /// Set the namespace root used by later `configure` calls.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the per round-trip deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The namespace set by the last `configure`, if any.
    pub fn namespace(&self) -> Option<&Namespace> {
        self.namespace.as_ref()
    }

    /// The increment retry budget.
    pub fn retry_budget(&self) -> u32 {
        self.retry_budget
    }

    /// The backend this store talks to.
    pub fn backend(&self) -> &Arc<dyn KvBackend> {
        &self.backend
    }

    fn scope(&self) -> Result<&Namespace, StoreError> {
        self.namespace.as_ref().ok_or(StoreError::NotConfigured)
    }

    /// Validate `key` and derive its full backend key.
    fn locate(&self, key: &str) -> Result<(&Namespace, StateKey, String), StoreError> {
        let namespace = self.scope()?;
        let key = StateKey::new(key)?;
        let full = namespace.key(&key);
        Ok((namespace, key, full))
    }

    async fn read(
        &self,
        namespace: &Namespace,
        key: &StateKey,
        full: &str,
    ) -> Result<String, StoreError> {
        let entry = with_deadline(self.request_timeout, self.backend.get(full))
            .await
            .map_err(|e| StoreError::from_backend(namespace.prefix(), key.as_str(), e))?;
        debug!(namespace = %namespace, key = %key, version = %entry.version, "read");
        Ok(entry.value)
    }

    async fn write(
        &self,
        namespace: &Namespace,
        key: &StateKey,
        full: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let version = with_deadline(self.request_timeout, self.backend.set(full, value))
            .await
            .map_err(|e| StoreError::from_backend(namespace.prefix(), key.as_str(), e))?;
        debug!(namespace = %namespace, key = %key, version = %version, "wrote");
        Ok(())
    }
}

#[async_trait]
impl StateStore for KvStateStore {
    fn configure(&mut self, flow_name: &str, request_id: &str) {
        let namespace = Namespace::new(&self.root, flow_name, request_id);
        info!(namespace = %namespace, "configured");
        self.namespace = Some(namespace);
    }

    async fn init(&self) -> Result<(), StoreError> {
        let namespace = self.scope()?;
        debug!(namespace = %namespace, backend = self.backend.name(), "init");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String, StoreError> {
        let (namespace, key, full) = self.locate(key)?;
        self.read(namespace, &key, &full).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let (namespace, key, full) = self.locate(key)?;
        self.write(namespace, &key, &full, value).await
    }

    async fn update(&self, key: &str, old_value: &str, new_value: &str) -> Result<(), StoreError> {
        let (namespace, key, full) = self.locate(key)?;

        let entry = with_deadline(self.request_timeout, self.backend.get(&full))
            .await
            .map_err(|e| StoreError::from_backend(namespace.prefix(), key.as_str(), e))?;

        if entry.value != old_value {
            debug!(namespace = %namespace, key = %key, version = %entry.version, "stale expected value");
            return Err(StoreError::StaleValue {
                namespace: namespace.to_string(),
                key: key.to_string(),
                expected: old_value.to_string(),
                actual: entry.value,
            });
        }

        let write = self.backend.compare_and_set(&full, new_value, entry.version);
        match with_deadline(self.request_timeout, write).await {
            Ok(version) => {
                debug!(namespace = %namespace, key = %key, version = %version, "updated");
                Ok(())
            }
            Err(BackendError::VersionMismatch { .. }) => {
                warn!(namespace = %namespace, key = %key, version = %entry.version, "update lost a race");
                Err(StoreError::ConcurrentModification {
                    namespace: namespace.to_string(),
                    key: key.to_string(),
                })
            }
            Err(e) => Err(StoreError::from_backend(namespace.prefix(), key.as_str(), e)),
        }
    }

    async fn create(&self, vertices: &[&str]) -> Result<(), StoreError> {
        let namespace = self.scope()?;
        let keys = vertices
            .iter()
            .map(|vertex| StateKey::new(*vertex))
            .collect::<Result<Vec<_>, _>>()?;

        for key in &keys {
            let full = namespace.key(key);
            if let Err(err) = self.write(namespace, key, &full, "0").await {
                warn!(namespace = %namespace, vertex = %key, error = %err, "counter initialisation failed");
                return Err(err);
            }
        }
        Ok(())
    }

    async fn increment_counter(&self, vertex: &str) -> Result<u64, StoreError> {
        let namespace = self.scope()?;
        let vertex = StateKey::new(vertex)?;
        Increment::new(
            self.backend.as_ref(),
            namespace,
            vertex,
            self.retry_budget,
            self.request_timeout,
        )
        .run()
        .await
    }

    async fn set_state(&self, active: bool) -> Result<(), StoreError> {
        let namespace = self.scope()?;
        let key = StateKey::state();
        let full = namespace.key(&key);
        self.write(namespace, &key, &full, if active { "true" } else { "false" })
            .await
    }

    async fn get_state(&self) -> Result<bool, StoreError> {
        let namespace = self.scope()?;
        let key = StateKey::state();
        let full = namespace.key(&key);
        let value = self.read(namespace, &key, &full).await?;
        Ok(value == "true")
    }

    async fn cleanup(&self) -> Result<(), StoreError> {
        let namespace = self.scope()?;
        with_deadline(
            self.request_timeout,
            self.backend.delete_recursive(namespace.prefix()),
        )
        .await
        .map_err(|e| StoreError::from_backend(namespace.prefix(), namespace.prefix(), e))?;
        info!(namespace = %namespace, "cleaned up");
        Ok(())
    }
}
