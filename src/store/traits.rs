//! store::traits
//!
//! The interface a workflow engine uses to persist per-run state.
//!
//! # Lifecycle
//!
//! ```text
//! configure(flow, request) → init() → { get | set | update | create
//!     | increment_counter | set_state | get_state }* → cleanup()
//! ```
//!
//! `configure` scopes every later call to one run's namespace. `cleanup`
//! deletes everything under it; after that, reads fail with `NotFound` until
//! the handle is configured for a new run.
//!
//! # Consistency
//!
//! - `set` and `set_state` are last-writer-wins
//! - `update` is a single-shot compare-and-swap and never retries
//! - `increment_counter` retries lost races up to the retry budget
//!
//! Consistency holds per key only.

use async_trait::async_trait;

use super::error::StoreError;

/// Per-run state store.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. Any number of handles, in any
/// number of processes, may operate on the same namespace concurrently.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Scope the handle to `(flow_name, request_id)`.
    ///
    /// Pure: derives the key prefix and touches nothing remote. Calling it
    /// again replaces the namespace.
    fn configure(&mut self, flow_name: &str, request_id: &str);

    /// Lifecycle hook run once per request before first use.
    ///
    /// Idempotent and never creates an entry.
    ///
    /// # Errors
    ///
    /// - `NotConfigured` if called before [`StateStore::configure`]
    async fn init(&self) -> Result<(), StoreError>;

    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the key does not exist
    /// - `Transport` if the backing store failed
    async fn get(&self, key: &str) -> Result<String, StoreError>;

    /// Create or overwrite `key` without any precondition.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Replace `key`'s value with `new_value` if it currently holds
    /// `old_value`.
    ///
    /// Exactly one read and at most one conditional write.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the key does not exist
    /// - `StaleValue` if the stored value is not `old_value`
    /// - `ConcurrentModification` if another write landed between the read
    ///   and the conditional write
    async fn update(&self, key: &str, old_value: &str, new_value: &str) -> Result<(), StoreError>;

    /// Initialise a counter at `"0"` for each vertex.
    ///
    /// Not atomic across the batch: on failure, earlier vertices stay
    /// initialised and the error names the vertex that failed.
    async fn create(&self, vertices: &[&str]) -> Result<(), StoreError>;

    /// Atomically add one to `vertex`'s counter and return the new count.
    ///
    /// # Errors
    ///
    /// - `NotFound` / `Transport` if the read fails (never retried)
    /// - `CorruptState` if the stored value is not a count (nothing written)
    /// - `RetryExhausted` if every attempt in the budget lost its race
    async fn increment_counter(&self, vertex: &str) -> Result<u64, StoreError>;

    /// Mark the pipeline run active or inactive. Last writer wins.
    async fn set_state(&self, active: bool) -> Result<(), StoreError>;

    /// Whether the pipeline run is active.
    ///
    /// Only the literal `"true"` reads as active. Any other stored content,
    /// including garbage, reads as inactive rather than as an error.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the flag was never set
    async fn get_state(&self) -> Result<bool, StoreError>;

    /// Delete every entry under the namespace.
    ///
    /// Succeeds when nothing is stored, so calling it twice is fine.
    async fn cleanup(&self) -> Result<(), StoreError>;
}
