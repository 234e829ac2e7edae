//! store::counter
//!
//! Bounded optimistic retry loop behind `increment_counter`.
//!
//! # State Machine
//!
//! ```text
//!              ┌──────────────────────────────────────────┐
//!              ▼                                          │
//!          Reading ──► Computing ──► WritingConditional ──┤ version moved
//!             │            │               │              ▼
//!             │ read fails │ not a count   │ ok       Retrying
//!             ▼            ▼               ▼              │ budget spent
//!           Failed       Failed        Succeeded      Exhausted
//! ```
//!
//! Only a rejected conditional write leads to `Retrying`. A failed read, a
//! corrupt value, or any other write failure ends the loop at once, so
//! transport errors are never retried here.
//!
//! Each successful increment replaced exactly the value it read, which is
//! what makes concurrent increments lose nothing.

use std::time::Duration;

use tracing::{debug, warn};

use super::error::StoreError;
use super::kv::with_deadline;
use crate::backend::{BackendError, KvBackend};
use crate::core::namespace::Namespace;
use crate::core::types::{StateKey, Version};

/// Where one increment currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum IncrementState {
    /// About to read the counter. `attempt` starts at 1.
    Reading { attempt: u32 },
    /// Holding the value and version just read.
    Computing {
        attempt: u32,
        value: String,
        version: Version,
    },
    /// About to write `next`, guarded by the version that was read.
    WritingConditional {
        attempt: u32,
        next: u64,
        expected: Version,
    },
    /// The conditional write lost a race.
    Retrying { attempt: u32, cause: StoreError },
    /// The new count was stored.
    Succeeded(u64),
    /// Every attempt in the budget lost its race.
    Exhausted(StoreError),
    /// A non-retryable failure.
    Failed(StoreError),
}

/// One `increment_counter` call.
pub(crate) struct Increment<'a> {
    backend: &'a dyn KvBackend,
    namespace: &'a Namespace,
    vertex: StateKey,
    key: String,
    budget: u32,
    timeout: Duration,
}

impl<'a> Increment<'a> {
    pub(crate) fn new(
        backend: &'a dyn KvBackend,
        namespace: &'a Namespace,
        vertex: StateKey,
        budget: u32,
        timeout: Duration,
    ) -> Self {
        let key = namespace.key(&vertex);
        Self {
            backend,
            namespace,
            vertex,
            key,
            budget: budget.max(1),
            timeout,
        }
    }

    /// Drive the machine to a terminal state.
    pub(crate) async fn run(self) -> Result<u64, StoreError> {
        let mut state = IncrementState::Reading { attempt: 1 };
        loop {
            state = match state {
                IncrementState::Succeeded(count) => return Ok(count),
                IncrementState::Exhausted(err) | IncrementState::Failed(err) => return Err(err),
                pending => self.step(pending).await,
            };
        }
    }

    /// Perform one transition.
    pub(crate) async fn step(&self, state: IncrementState) -> IncrementState {
        match state {
            IncrementState::Reading { attempt } => {
                match with_deadline(self.timeout, self.backend.get(&self.key)).await {
                    Ok(entry) => IncrementState::Computing {
                        attempt,
                        value: entry.value,
                        version: entry.version,
                    },
                    Err(err) => IncrementState::Failed(self.error(err)),
                }
            }

            IncrementState::Computing {
                attempt,
                value,
                version,
            } => match next_count(&value) {
                Some(next) => IncrementState::WritingConditional {
                    attempt,
                    next,
                    expected: version,
                },
                None => {
                    warn!(
                        namespace = %self.namespace,
                        vertex = %self.vertex,
                        value = %value,
                        "counter value is not a count"
                    );
                    IncrementState::Failed(StoreError::CorruptState {
                        namespace: self.namespace.to_string(),
                        key: self.vertex.to_string(),
                        value,
                    })
                }
            },

            IncrementState::WritingConditional {
                attempt,
                next,
                expected,
            } => {
                let value = next.to_string();
                let write = self.backend.compare_and_set(&self.key, &value, expected);
                match with_deadline(self.timeout, write).await {
                    Ok(version) => {
                        debug!(
                            namespace = %self.namespace,
                            vertex = %self.vertex,
                            attempt,
                            version = %version,
                            count = next,
                            "counter incremented"
                        );
                        IncrementState::Succeeded(next)
                    }
                    Err(BackendError::VersionMismatch { .. }) => {
                        debug!(
                            namespace = %self.namespace,
                            vertex = %self.vertex,
                            attempt,
                            version = %expected,
                            "counter moved under us"
                        );
                        IncrementState::Retrying {
                            attempt,
                            cause: StoreError::ConcurrentModification {
                                namespace: self.namespace.to_string(),
                                key: self.vertex.to_string(),
                            },
                        }
                    }
                    Err(err) => IncrementState::Failed(self.error(err)),
                }
            }

            IncrementState::Retrying { attempt, cause } if attempt >= self.budget => {
                warn!(
                    namespace = %self.namespace,
                    vertex = %self.vertex,
                    attempts = attempt,
                    "increment retry budget exhausted"
                );
                IncrementState::Exhausted(StoreError::RetryExhausted {
                    namespace: self.namespace.to_string(),
                    vertex: self.vertex.to_string(),
                    attempts: attempt,
                    last: Box::new(cause),
                })
            }
            IncrementState::Retrying { attempt, .. } => IncrementState::Reading {
                attempt: attempt + 1,
            },

            terminal => terminal,
        }
    }

    fn error(&self, err: BackendError) -> StoreError {
        StoreError::from_backend(self.namespace.prefix(), self.vertex.as_str(), err)
    }
}

/// Parse a stored count and add one.
///
/// `None` if the value is not a non-negative integer or the count would
/// overflow.
pub(crate) fn next_count(value: &str) -> Option<u64> {
    value.parse::<u64>().ok()?.checked_add(1)
}
