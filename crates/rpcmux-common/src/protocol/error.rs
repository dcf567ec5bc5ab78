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

use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by the batching client.
///
/// The enum is `Clone` because a single transport failure is delivered to
/// every call it affects.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcMuxError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Transport error: {message}")]
    Transport {
        /// HTTP status code, when the failure came from a non-success response
        status: Option<u16>,
        message: String,
    },

    #[error("RPC request timed out after {0}ms")]
    Timeout(u64),

    #[error("RPC error for request {id}: {message}")]
    Rpc {
        id: u64,
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Dispatcher closed before the call was settled")]
    Closed,
}

impl RpcMuxError {
    /// Builds a transport error from a non-success HTTP status.
    pub fn http_status(status: u16, body: &str) -> Self {
        RpcMuxError::Transport {
            status: Some(status),
            message: format!("HTTP {}: {}", status, body),
        }
    }

    /// Builds a transport error that has no HTTP status attached.
    pub fn transport(message: impl Into<String>) -> Self {
        RpcMuxError::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcMuxError::Timeout(_))
    }
}

impl From<serde_json::Error> for RpcMuxError {
    fn from(err: serde_json::Error) -> Self {
        RpcMuxError::InvalidOperation(format!("JSON serialization error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, RpcMuxError>;
