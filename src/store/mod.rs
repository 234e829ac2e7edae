//! store
//!
//! Per-run workflow state over a versioned key-value backend.
//!
//! # Modules
//!
//! - `traits`: The `StateStore` interface handed to the workflow engine
//! - `kv`: `KvStateStore`, the implementation over any `KvBackend`
//! - `counter`: The bounded retry loop behind `increment_counter`
//! - `error`: `StoreError`
//!
//! # Concurrency
//!
//! Concurrency control is optimistic throughout. The store takes no locks;
//! conditional writes at the backend decide every race. Only
//! `increment_counter` retries, and only when its conditional write lost.

mod counter;
mod error;
mod kv;
mod traits;

pub use error::StoreError;
pub use kv::KvStateStore;
pub use traits::StateStore;
