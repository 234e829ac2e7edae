//! Flowstate - per-run workflow state on a versioned key-value store
//!
//! Flowstate keeps the state a serverless workflow engine needs while one
//! request moves through a flow graph: arbitrary keyed values, per-vertex
//! counters that many function instances bump concurrently, and a flag
//! saying whether the run is still active.
//!
//! # Architecture
//!
//! The codebase is layered:
//!
//! - [`cli`] - Operator binary (parses args, delegates to the store)
//! - [`store`] - `StateStore` interface and its optimistic CAS engine
//! - [`backend`] - Capability contract for the key-value service (etcd v2)
//! - [`core`] - Namespaces, validated keys, and configuration
//!
//! # Correctness Invariants
//!
//! 1. Every key a run touches lies under that run's namespace
//! 2. Concurrent counter increments never lose an update
//! 3. A guarded write never silently overwrites a value it did not read
//! 4. Failures are surfaced with their namespace and key, never swallowed
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use flowstate::backend::memory::InMemoryBackend;
//! use flowstate::{KvStateStore, StateStore};
//!
//! # tokio_test::block_on(async {
//! let mut store = KvStateStore::new(Arc::new(InMemoryBackend::new()));
//! store.configure("order-flow", "req-42");
//! store.init().await.unwrap();
//!
//! store.set_state(true).await.unwrap();
//! assert!(store.get_state().await.unwrap());
//!
//! store.cleanup().await.unwrap();
//! assert!(store.get_state().await.unwrap_err().is_not_found());
//! # });
//! ```

pub mod backend;
pub mod cli;
pub mod core;
pub mod store;

pub use store::{KvStateStore, StateStore, StoreError};
