//! backend::etcd
//!
//! etcd backend using the v2 keys HTTP API.
//!
//! # Design
//!
//! This module implements the `KvBackend` trait for etcd. Every capability is
//! a single HTTP request:
//!
//! | capability | request |
//! |---|---|
//! | get | `GET /v2/keys/<key>` |
//! | set | `PUT /v2/keys/<key>` with form `value=` |
//! | compare_and_set | `PUT /v2/keys/<key>?prevIndex=<version>` with form `value=` |
//! | delete_recursive | `DELETE /v2/keys/<prefix>?recursive=true` |
//!
//! The node's `modifiedIndex` is the version. etcd reports failures as a JSON
//! body with an `errorCode`:
//! - `100` Key not found → `NotFound` (success for recursive delete)
//! - `101` Compare failed → `VersionMismatch`
//!
//! # Timeouts
//!
//! The HTTP client is built with the configured per-request timeout; an
//! expired request surfaces as `BackendError::Timeout`. Requests are never
//! retried here.
//!
//! # Example
//!
//! ```ignore
//! use flowstate::backend::etcd::EtcdBackend;
//! use flowstate::backend::KvBackend;
//!
//! let backend = EtcdBackend::new("http://127.0.0.1:2379")?;
//! let entry = backend.get("faasflow/order-flow/req-42/charge").await?;
//! println!("{} @ {}", entry.value, entry.version);
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;

use super::traits::{check_key_path, BackendError, Entry, KvBackend};
use crate::core::config::DEFAULT_REQUEST_TIMEOUT;
use crate::core::types::Version;

/// etcd error code: key not found.
const ERROR_KEY_NOT_FOUND: u32 = 100;

/// etcd error code: compare failed.
const ERROR_COMPARE_FAILED: u32 = 101;

/// etcd backend.
///
/// Holds one pooled HTTP client. Clones share the pool.
#[derive(Debug, Clone)]
pub struct EtcdBackend {
    /// HTTP client for making requests
    client: Client,
    /// Base endpoint, e.g. `http://127.0.0.1:2379`
    endpoint: Url,
    /// Per-request deadline
    timeout: Duration,
}

impl EtcdBackend {
    /// Create a backend for `endpoint` with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError` if the endpoint is not a usable base URL or the
    /// HTTP client cannot be built.
    pub fn new(endpoint: &str) -> Result<Self, BackendError> {
        Self::with_timeout(endpoint, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a backend for `endpoint` with a custom request timeout.
    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self, BackendError> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            BackendError::NetworkError(format!("invalid endpoint '{}': {}", endpoint, e))
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(BackendError::NetworkError(format!(
                "invalid endpoint '{}': not a base URL",
                endpoint
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    /// Get the endpoint this backend talks to.
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Build the keys API URL for a key.
    ///
    /// Each `/`-separated segment is percent-encoded on its own, so escaped
    /// namespace segments survive the trip intact. Empty, `.` and `..`
    /// segments are refused: the path would be normalised to another key.
    fn keys_url(&self, key: &str) -> Result<Url, BackendError> {
        check_key_path(key)?;

        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| {
                BackendError::NetworkError(format!("invalid endpoint '{}'", self.endpoint))
            })?
            .pop_if_empty()
            .extend(["v2", "keys"])
            .extend(key.split('/'));
        Ok(url)
    }

    fn map_send_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout)
        } else {
            BackendError::NetworkError(err.to_string())
        }
    }

    /// Parse a successful response into the node it carries.
    async fn node_from_response(&self, key: &str, response: Response) -> Result<Node, BackendError> {
        let status = response.status();
        let body: KeysResponse = response.json().await.map_err(|e| BackendError::ApiError {
            status: status.as_u16(),
            message: format!("Failed to parse response: {}", e),
        })?;

        body.node.ok_or_else(|| BackendError::ApiError {
            status: status.as_u16(),
            message: format!("response for {} carried no node", key),
        })
    }

    /// Turn a non-success response into a `BackendError`.
    async fn error_from_response(
        &self,
        key: &str,
        response: Response,
        expected: Option<Version>,
    ) -> BackendError {
        let status = response.status();
        let body = response.json::<EtcdErrorResponse>().await.ok();
        map_error(key, status, body, expected)
    }
}

/// Map an etcd error response to a `BackendError`.
fn map_error(
    key: &str,
    status: StatusCode,
    body: Option<EtcdErrorResponse>,
    expected: Option<Version>,
) -> BackendError {
    match (body, expected) {
        (Some(err), _) if err.error_code == ERROR_KEY_NOT_FOUND => {
            BackendError::NotFound(key.to_string())
        }
        (Some(err), Some(expected)) if err.error_code == ERROR_COMPARE_FAILED => {
            BackendError::VersionMismatch {
                key: key.to_string(),
                expected,
            }
        }
        (Some(err), _) => BackendError::ApiError {
            status: status.as_u16(),
            message: match err.cause {
                Some(cause) => format!("{} ({}): {}", err.message, err.error_code, cause),
                None => format!("{} ({})", err.message, err.error_code),
            },
        },
        (None, _) if status == StatusCode::NOT_FOUND => BackendError::NotFound(key.to_string()),
        (None, _) => BackendError::ApiError {
            status: status.as_u16(),
            message: "Unknown error".to_string(),
        },
    }
}

fn entry_from_node(key: &str, node: Node) -> Result<Entry, BackendError> {
    if node.dir {
        return Err(BackendError::ApiError {
            status: StatusCode::OK.as_u16(),
            message: format!("{} is a directory, not a value", key),
        });
    }

    Ok(Entry {
        key: key.to_string(),
        value: node.value.unwrap_or_default(),
        version: Version(node.modified_index),
    })
}

#[async_trait]
impl KvBackend for EtcdBackend {
    fn name(&self) -> &'static str {
        "etcd"
    }

    async fn get(&self, key: &str) -> Result<Entry, BackendError> {
        let response = self
            .client
            .get(self.keys_url(key)?)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(self.error_from_response(key, response, None).await);
        }

        let node = self.node_from_response(key, response).await?;
        entry_from_node(key, node)
    }

    async fn set(&self, key: &str, value: &str) -> Result<Version, BackendError> {
        let response = self
            .client
            .put(self.keys_url(key)?)
            .form(&[("value", value)])
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(self.error_from_response(key, response, None).await);
        }

        let node = self.node_from_response(key, response).await?;
        Ok(Version(node.modified_index))
    }

    async fn compare_and_set(
        &self,
        key: &str,
        value: &str,
        expected: Version,
    ) -> Result<Version, BackendError> {
        let response = self
            .client
            .put(self.keys_url(key)?)
            .query(&[("prevIndex", expected.get())])
            .form(&[("value", value)])
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(self
                .error_from_response(key, response, Some(expected))
                .await);
        }

        let node = self.node_from_response(key, response).await?;
        Ok(Version(node.modified_index))
    }

    async fn delete_recursive(&self, prefix: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .delete(self.keys_url(prefix)?)
            .query(&[("recursive", "true")])
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if response.status().is_success() {
            return Ok(());
        }

        match self.error_from_response(prefix, response, None).await {
            BackendError::NotFound(_) => Ok(()),
            other => Err(other),
        }
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct KeysResponse {
    node: Option<Node>,
}

#[derive(Debug, Deserialize)]
struct Node {
    #[serde(default)]
    value: Option<String>,
    #[serde(rename = "modifiedIndex")]
    modified_index: u64,
    #[serde(default)]
    dir: bool,
}

#[derive(Debug, Deserialize)]
struct EtcdErrorResponse {
    #[serde(rename = "errorCode")]
    error_code: u32,
    message: String,
    #[serde(default)]
    cause: Option<String>,
}
