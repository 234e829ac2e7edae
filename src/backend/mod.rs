//! backend
//!
//! Abstraction for the versioned key-value service that persists workflow
//! state.
//!
//! # Architecture
//!
//! The `KvBackend` trait is the capability contract the store is written
//! against. The store holds an explicitly injected `Arc<dyn KvBackend>`;
//! there is no process-wide connection.
//!
//! # Modules
//!
//! - `traits`: Core `KvBackend` trait, `Entry`, and `BackendError`
//! - [`etcd`]: etcd v2 keys API over HTTP
//! - [`memory`]: In-memory implementation for tests and single-process use
//! - `factory`: Backend selection from configuration
//!
//! # Example
//!
//! ```ignore
//! use flowstate::backend::{create_backend, KvBackend};
//! use flowstate::core::config::Config;
//!
//! let backend = create_backend(&Config::load()?)?;
//! backend.set("faasflow/order-flow/req-42/state", "true").await?;
//! ```

pub mod etcd;
mod factory;
pub mod memory;
mod traits;

pub use factory::{create_backend, valid_backend_names, BackendProvider};
pub use traits::*;
