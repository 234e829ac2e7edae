//! core
//!
//! Core domain types, namespacing, and configuration for flowstate.
//!
//! # Modules
//!
//! - [`types`] - Strong types: StateKey, Version
//! - [`namespace`] - Per-run key prefix derivation
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents keys from escaping their namespace
//! - Configuration is strict and validated on load
//! - Nothing here performs I/O against the backing store

pub mod config;
pub mod namespace;
pub mod types;
