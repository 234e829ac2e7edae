//! core::namespace
//!
//! Hierarchical key prefix scoping all state for one workflow run.
//!
//! # Layout
//!
//! ```text
//! <root>/<flow>/<request>/<suffix>
//! ```
//!
//! The flow and request segments are escaped so that no name can make two
//! different runs share a prefix:
//! - `%` becomes `%25` and `/` becomes `%2F`
//! - a name made only of dots has every `.` written as `%2E`, since path
//!   handling collapses `.` and `..` segments
//! - the empty name becomes `%00`, since `//` is collapsed too
//!
//! Other names appear verbatim.
//!
//! # Example
//!
//! ```
//! use flowstate::core::namespace::Namespace;
//! use flowstate::core::types::StateKey;
//!
//! let ns = Namespace::new("faasflow", "order-flow", "req-42");
//! assert_eq!(ns.prefix(), "faasflow/order-flow/req-42");
//!
//! let key = StateKey::new("charge").unwrap();
//! assert_eq!(ns.key(&key), "faasflow/order-flow/req-42/charge");
//! ```

use super::types::StateKey;

/// Default namespace root.
pub const DEFAULT_ROOT: &str = "faasflow";

/// Key prefix for a single workflow run.
///
/// Immutable once built; a store handle replaces it wholesale on reconfigure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    prefix: String,
    flow_name: String,
    request_id: String,
}

impl Namespace {
    /// Derive the namespace for `(flow_name, request_id)` under `root`.
    ///
    /// This cannot fail. `root` is taken verbatim; configuration validates it.
    pub fn new(root: &str, flow_name: &str, request_id: &str) -> Self {
        let prefix = format!(
            "{}/{}/{}",
            root,
            escape_segment(flow_name),
            escape_segment(request_id)
        );
        Self {
            prefix,
            flow_name: flow_name.to_string(),
            request_id: request_id.to_string(),
        }
    }

    /// The full prefix, without a trailing slash.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The workflow name this namespace was derived from.
    pub fn flow_name(&self) -> &str {
        &self.flow_name
    }

    /// The request identifier this namespace was derived from.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Full backing-store key for a suffix.
    pub fn key(&self, suffix: &StateKey) -> String {
        format!("{}/{}", self.prefix, suffix.as_str())
    }

    /// Check whether a full key lies strictly under this namespace.
    pub fn contains(&self, key: &str) -> bool {
        key.strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1)
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix)
    }
}

/// Escape one namespace segment so it contains no `/` and is never empty,
/// `.` or `..`.
///
/// Injective: distinct inputs always produce distinct outputs. Every literal
/// `%` is escaped, so `%00` and `%2E` only ever come from this function.
fn escape_segment(segment: &str) -> String {
    if segment.is_empty() {
        return "%00".to_string();
    }
    if segment.chars().all(|c| c == '.') {
        return "%2E".repeat(segment.len());
    }

    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            _ => out.push(c),
        }
    }
    out
}
