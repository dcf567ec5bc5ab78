// Copyright 2025 rpcmux Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP Batch Transport
//!
//! Sends one JSON-RPC batch as a single HTTPS POST and parses the envelope
//! array that comes back.
//!
//! # Failure classes
//!
//! - **Timeout**: the round trip exceeded the endpoint deadline
//!   ([`RpcMuxError::Timeout`])
//! - **Transport**: connection failures and non-success HTTP statuses
//!   ([`RpcMuxError::Transport`], status code attached when known)
//! - **Deserialization**: the body was not an envelope array
//!   ([`RpcMuxError::InvalidOperation`])
//!
//! # Example
//!
//! ```no_run
//! use rpcmux_common::auth::Credentials;
//! use rpcmux_common::protocol::JsonRpcRequest;
//! use rpcmux_common::transport::{BatchEndpoint, HttpBatchTransport};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpBatchTransport::shared()?;
//! let endpoint = BatchEndpoint {
//!     url: "https://1.rpc.thirdweb.com/".into(),
//!     credentials: Credentials::new(Some("my-client-id".into()), None, None)?,
//!     timeout: Duration::from_secs(10),
//! };
//! let batch = vec![JsonRpcRequest::new(1, "eth_blockNumber", vec![])];
//! let envelopes = transport.send_batch(&endpoint, &batch).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};

use crate::auth::Credentials;
use crate::protocol::error::{Result, RpcMuxError};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};

pub const SDK_NAME_HEADER: &str = "x-sdk-name";
pub const SDK_VERSION_HEADER: &str = "x-sdk-version";
pub const SDK_OS_HEADER: &str = "x-sdk-os";
pub const SDK_PLATFORM_HEADER: &str = "x-sdk-platform";

const SDK_NAME: &str = "rpcmux";
const SDK_PLATFORM: &str = "rust";

/// Process-wide HTTP client shared by every dispatcher
static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// SDK identification headers sent with every batch.
pub fn sdk_headers() -> [(&'static str, &'static str); 4] {
    [
        (SDK_NAME_HEADER, SDK_NAME),
        (SDK_VERSION_HEADER, env!("CARGO_PKG_VERSION")),
        (SDK_OS_HEADER, std::env::consts::OS),
        (SDK_PLATFORM_HEADER, SDK_PLATFORM),
    ]
}

/// Where and how a batch is sent.
#[derive(Debug, Clone)]
pub struct BatchEndpoint {
    pub url: String,
    pub credentials: Credentials,
    /// Hard deadline for the whole round trip
    pub timeout: Duration,
}

/// Stateless batch sender over a shared HTTP client.
///
/// Cloning is cheap; clones share the same connection pool.
#[derive(Clone)]
pub struct HttpBatchTransport {
    client: reqwest::Client,
}

impl HttpBatchTransport {
    /// Returns a transport backed by the process-wide HTTP client, building it
    /// on first use.
    pub fn shared() -> Result<Self> {
        if let Some(client) = SHARED_CLIENT.get() {
            return Ok(Self {
                client: client.clone(),
            });
        }

        let client = reqwest::Client::builder()
            .user_agent(format!("{}/{}", SDK_NAME, env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RpcMuxError::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client: SHARED_CLIENT.get_or_init(|| client).clone(),
        })
    }

    /// Sends `batch` in one POST and returns the response envelopes in the
    /// order the server produced them.
    ///
    /// # Errors
    ///
    /// - `Timeout` when the deadline in `endpoint.timeout` elapses first
    /// - `Transport` for connection failures and non-success statuses
    /// - `InvalidOperation` when the body is not an envelope array
    pub async fn send_batch(
        &self,
        endpoint: &BatchEndpoint,
        batch: &[JsonRpcRequest],
    ) -> Result<Vec<JsonRpcResponse>> {
        let body = serde_json::to_vec(batch)?;

        let mut request = self
            .client
            .post(&endpoint.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body);
        for (name, value) in sdk_headers() {
            request = request.header(name, value);
        }
        for (name, value) in endpoint.credentials.header_pairs() {
            request = request.header(name, value);
        }

        tracing::debug!(url = %endpoint.url, batch_size = batch.len(), "Sending RPC batch");

        let timeout_ms = endpoint.timeout.as_millis() as u64;
        let round_trip = async {
            let response = request
                .send()
                .await
                .map_err(|e| classify_reqwest_error(e, timeout_ms))?;

            let status = response.status();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| classify_reqwest_error(e, timeout_ms))?;

            if !status.is_success() {
                return Err(RpcMuxError::http_status(
                    status.as_u16(),
                    &String::from_utf8_lossy(&bytes),
                ));
            }

            parse_batch_response(&bytes)
        };

        match tokio::time::timeout(endpoint.timeout, round_trip).await {
            Ok(result) => result,
            Err(_) => Err(RpcMuxError::Timeout(timeout_ms)),
        }
    }
}

/// Parses a batch response body into envelopes.
///
/// A body of `null` and a body that is not an envelope array are both
/// deserialization failures.
pub fn parse_batch_response(body: &[u8]) -> Result<Vec<JsonRpcResponse>> {
    match serde_json::from_slice::<Option<Vec<JsonRpcResponse>>>(body) {
        Ok(Some(envelopes)) => Ok(envelopes),
        Ok(None) => Err(RpcMuxError::InvalidOperation(
            "Failed to deserialize RPC response".into(),
        )),
        Err(e) => Err(RpcMuxError::InvalidOperation(format!(
            "Failed to deserialize RPC response: {}",
            e
        ))),
    }
}

fn classify_reqwest_error(err: reqwest::Error, timeout_ms: u64) -> RpcMuxError {
    if err.is_timeout() {
        RpcMuxError::Timeout(timeout_ms)
    } else if let Some(status) = err.status() {
        RpcMuxError::Transport {
            status: Some(status.as_u16()),
            message: err.to_string(),
        }
    } else {
        RpcMuxError::transport(err.to_string())
    }
}
