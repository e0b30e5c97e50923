//! # Bundler Client
//!
//! Submission and inclusion polling for signed operations. Everything else in
//! the crate is pure; this module is the only one doing I/O.
//!
//! ```rust,ignore
//! use smart_account_core::bundler::{JsonRpcBundler, BundlerClient, wait_for_inclusion};
//!
//! let bundler = JsonRpcBundler::new(vec!["https://bundler.example".into()])?;
//! let hash = bundler.send_user_operation(&op, entry_point).await?;
//! let receipt = wait_for_inclusion(&bundler, hash, Duration::from_secs(60), Duration::from_secs(2)).await?;
//! ```

use crate::user_op::UserOperation;
use crate::{Error, Result};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Receipt of an included operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    pub user_op_hash: B256,
    pub sender: Address,
    pub nonce: U256,
    pub success: bool,
    #[serde(default)]
    pub actual_gas_cost: U256,
    #[serde(default)]
    pub actual_gas_used: U256,
    /// Raw transaction receipt as returned by the bundler
    #[serde(default)]
    pub receipt: serde_json::Value,
}

/// Operation submission network
#[async_trait]
pub trait BundlerClient: Send + Sync {
    /// Submit a signed operation, returning its hash
    async fn send_user_operation(
        &self,
        operation: &UserOperation,
        entry_point: Address,
    ) -> Result<B256>;

    /// Receipt of an operation, `None` while it is not yet included
    async fn get_user_operation_receipt(&self, hash: B256) -> Result<Option<UserOperationReceipt>>;

    /// EntryPoints the bundler accepts
    async fn supported_entry_points(&self) -> Result<Vec<Address>>;
}

/// Poll until an operation is included
///
/// Missing receipts are retried every `interval` until `timeout` elapses;
/// any error from the client is returned immediately.
pub async fn wait_for_inclusion<C: BundlerClient + ?Sized>(
    client: &C,
    hash: B256,
    timeout: Duration,
    interval: Duration,
) -> Result<UserOperationReceipt> {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(receipt) = client.get_user_operation_receipt(hash).await? {
            debug!(hash = %hash, attempts, success = receipt.success, "Operation included");
            return Ok(receipt);
        }

        if tokio::time::Instant::now() + interval > deadline {
            return Err(Error::Timeout(format!(
                "operation {} not included after {:?} ({} attempts)",
                hash, timeout, attempts
            )));
        }
        tokio::time::sleep(interval).await;
    }
}

// ============================================================================
// Transport
// ============================================================================

/// One HTTP round trip to a bundler endpoint
///
/// Implementations return [`Error::Rpc`] only when the endpoint itself is
/// unusable (unreachable, 5xx, rate limited, non-JSON body). A JSON body is
/// handed back untouched even when it carries a JSON-RPC error object.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, url: &str, body: &serde_json::Value) -> Result<serde_json::Value>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Rpc(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Rpc(format!("{} unreachable: {}", url, e)))?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::Rpc(format!("{} answered HTTP {}", url, status)));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Rpc(format!("{} sent a non-JSON body (HTTP {}): {}", url, status, e)))
    }
}

// ============================================================================
// JSON-RPC bundler
// ============================================================================

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Bundler over JSON-RPC with endpoint failover
///
/// Only transport failures move on to the next endpoint. A JSON-RPC error
/// object is returned as [`Error::Bundler`] without trying further endpoints.
#[derive(Debug)]
pub struct JsonRpcBundler<T: Transport = HttpTransport> {
    endpoints: Vec<String>,
    transport: T,
    /// Endpoint that answered last; first in line for the next request
    preferred: AtomicUsize,
    next_id: AtomicU64,
}

impl JsonRpcBundler<HttpTransport> {
    /// Bundler client over HTTP, trying `urls` in order
    pub fn new(urls: Vec<String>) -> Result<Self> {
        Self::with_transport(urls, HttpTransport::new(REQUEST_TIMEOUT)?)
    }
}

impl<T: Transport> JsonRpcBundler<T> {
    pub fn with_transport(urls: Vec<String>, transport: T) -> Result<Self> {
        if urls.is_empty() {
            return Err(Error::InvalidConfig("At least one bundler URL required".into()));
        }
        Ok(Self {
            endpoints: urls,
            transport,
            preferred: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Call `method`, starting from the endpoint that answered last
    pub async fn request<R: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<R> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let count = self.endpoints.len();
        let start = self.preferred.load(Ordering::Relaxed);
        let mut failures = Vec::with_capacity(count);

        for index in (0..count).map(|offset| (start + offset) % count) {
            let url = &self.endpoints[index];
            match self.transport.post(url, &body).await {
                Ok(response) => {
                    self.preferred.store(index, Ordering::Relaxed);
                    return parse_rpc_response(response);
                }
                Err(e) => {
                    warn!(method, url = %url, error = %e, "Bundler endpoint failed, trying next");
                    failures.push(e.to_string());
                }
            }
        }

        Err(Error::Rpc(format!(
            "{} failed on every endpoint: {}",
            method,
            failures.join("; ")
        )))
    }
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// Extract `result` from a JSON-RPC response body
fn parse_rpc_response<R: serde::de::DeserializeOwned>(mut body: serde_json::Value) -> Result<R> {
    if let Some(error) = body.get_mut("error").map(serde_json::Value::take) {
        let error: RpcErrorObject = serde_json::from_value(error)
            .map_err(|e| Error::Rpc(format!("Malformed JSON-RPC error object: {}", e)))?;
        let message = match error.data {
            Some(data) if !data.is_null() => format!("{} ({})", error.message, data),
            _ => error.message,
        };
        return Err(Error::Bundler {
            code: error.code,
            message,
        });
    }

    let result = body
        .get_mut("result")
        .map(serde_json::Value::take)
        .ok_or_else(|| Error::Rpc("Missing result in RPC response".into()))?;

    serde_json::from_value(result)
        .map_err(|e| Error::Deserialization(format!("Failed to deserialize result: {}", e)))
}

#[async_trait]
impl<T: Transport> BundlerClient for JsonRpcBundler<T> {
    async fn send_user_operation(
        &self,
        operation: &UserOperation,
        entry_point: Address,
    ) -> Result<B256> {
        let hash: B256 = self
            .request(
                "eth_sendUserOperation",
                serde_json::json!([operation.to_rpc_format(), entry_point.to_string()]),
            )
            .await?;
        debug!(hash = %hash, sender = %operation.sender(), "Submitted user operation");
        Ok(hash)
    }

    async fn get_user_operation_receipt(&self, hash: B256) -> Result<Option<UserOperationReceipt>> {
        self.request(
            "eth_getUserOperationReceipt",
            serde_json::json!([hash.to_string()]),
        )
        .await
    }

    async fn supported_entry_points(&self) -> Result<Vec<Address>> {
        self.request("eth_supportedEntryPoints", serde_json::json!([]))
            .await
    }
}
