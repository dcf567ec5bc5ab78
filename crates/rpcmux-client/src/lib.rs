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

//! rpcmux Client
//!
//! Batching JSON-RPC client: many concurrent callers, few round trips.
//!
//! # Architecture
//!
//! - **[`EndpointRegistry`]**: process-wide cache of one [`Dispatcher`] per
//!   endpoint (credentials + chain + timeout + URL)
//! - **[`Dispatcher`]**: queues calls, flushes them as one batch when the queue
//!   reaches 100 calls or every 100 ms, and routes envelopes back by id
//! - **[`FlushTimer`]**: the cancellable periodic trigger behind the 100 ms flush
//! - **[`DispatcherSnapshot`]**: per-dispatcher counters for observability
//!
//! # Example
//!
//! ```rust,no_run
//! use rpcmux_client::{rpc, ClientOptions, RpcClient};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RpcClient::new(ClientOptions::from_env())?;
//! let dispatcher = rpc(&client, 1)?;
//!
//! let block: String = dispatcher.call("eth_blockNumber", ()).await?;
//! let code = dispatcher.call_bytes("eth_getCode", ("0x0000000000000000000000000000000000000000", "latest")).await?;
//! println!("block {} code {} bytes", block, code.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod decode;
pub mod dispatcher;
pub mod metrics;
pub mod registry;
pub mod timer;

pub use client::{rpc, ClientOptions, RpcClient};
pub use dispatcher::{Dispatcher, DispatcherConfig, PendingResponse, FLUSH_INTERVAL, MAX_BATCH_SIZE};
pub use metrics::{DispatcherMetrics, DispatcherSnapshot};
pub use registry::{EndpointKey, EndpointRegistry};
pub use timer::FlushTimer;
