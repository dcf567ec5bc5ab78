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

//! rpcmux Common Types and Transport
//!
//! Shared building blocks for the rpcmux batching client:
//!
//! - [`protocol`] - JSON-RPC 2.0 batch types and the [`RpcMuxError`] taxonomy
//! - [`auth`] - gateway credentials and the headers derived from them
//! - [`config`] - per-category timeouts and default endpoint URLs
//! - [`transport`] - the process-wide HTTP batch transport
//!
//! # Wire Format
//!
//! - **Transport**: HTTPS POST, one request per batch
//! - **Body**: JSON array of `{"jsonrpc":"2.0","method":..,"params":[..],"id":..}`
//! - **Response**: JSON array of envelopes, matched to requests by `id`
//!
//! # Example
//!
//! ```
//! use rpcmux_common::{JsonRpcRequest, JsonRpcResponse};
//! use serde_json::json;
//!
//! let request = JsonRpcRequest::new(1, "eth_chainId", vec![]);
//! let response = JsonRpcResponse::success(request.id, json!("0x1"));
//! assert_eq!(response.into_result().unwrap(), json!("0x1"));
//! ```

pub mod auth;
pub mod config;
pub mod protocol;
pub mod transport;

pub use protocol::*;
