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

//! JSON-RPC 2.0 Batch Protocol Types
//!
//! A batch is a JSON array of request objects; the gateway answers with a JSON
//! array of response envelopes in any order. Envelopes are correlated back to
//! requests by their integer `id` only.
//!
//! - Request: `{"jsonrpc": "2.0", "method": "...", "params": [...], "id": 1}`
//! - Response: `{"jsonrpc": "2.0", "id": 1, "result": ...}`
//! - Error response: `{"jsonrpc": "2.0", "id": 1, "error": {"code": ..., "message": "...", "data": ...}}`
//!
//! # Example
//!
//! ```
//! use rpcmux_common::protocol::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
//! use serde_json::json;
//!
//! let request = JsonRpcRequest::new(1, "eth_blockNumber", vec![]);
//! let batch = serde_json::to_string(&vec![request]).unwrap();
//! assert!(batch.starts_with('['));
//!
//! let response = JsonRpcResponse::success(1, json!("0x10"));
//! assert_eq!(response.into_result().unwrap(), json!("0x10"));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{Result, RpcMuxError};

/// Protocol version string carried by every request
pub const JSONRPC_VERSION: &str = "2.0";

/// One call descriptor inside an outbound batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    /// Positional parameters; the gateway only accepts arrays
    pub params: Vec<Value>,
    pub id: u64,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// One element of a batch response.
///
/// `result` and `error` are both optional on the wire; an envelope carrying
/// neither is treated as a `null` result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

fn default_version() -> String {
    JSONRPC_VERSION.into()
}

/// Method-level error object returned by the remote endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Start of the implementation-defined server error range
pub const SERVER_ERROR: i64 = -32000;

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn server_error(msg: &str) -> Self {
        Self::new(SERVER_ERROR, msg)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl JsonRpcResponse {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: u64, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Converts the envelope into the outcome delivered to the waiting call.
    ///
    /// An error object wins over a result; a missing result becomes `null`.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(error) => Err(RpcMuxError::Rpc {
                id: self.id,
                code: error.code,
                message: error.message,
                data: error.data,
            }),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}
