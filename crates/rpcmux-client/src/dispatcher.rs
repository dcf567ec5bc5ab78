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

//! Batch Dispatcher
//!
//! A dispatcher owns one endpoint (chain + credentials + timeout). Callers
//! enqueue calls with [`Dispatcher::send`]; queued calls leave as one batch
//! when the queue reaches `max_batch_size` or when the flush timer fires,
//! whichever comes first. Each response envelope is routed back to its
//! caller by id.
//!
//! # Failure scoping
//!
//! | Failure                       | Calls affected                           |
//! |-------------------------------|------------------------------------------|
//! | RPC error object              | the call with the matching id            |
//! | Timeout                       | every call of the timed-out batch        |
//! | Undecodable response body     | every call of that batch                 |
//! | Other transport failure       | every call still pending on the endpoint |
//!
//! Every call is settled exactly once: completions are removed from the
//! pending map before they are resolved.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use rpcmux_common::protocol::error::{Result, RpcMuxError};
use rpcmux_common::protocol::{JsonRpcRequest, JsonRpcResponse};
use rpcmux_common::transport::{BatchEndpoint, HttpBatchTransport};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::client::RpcClient;
use crate::decode::{decode_bytes, decode_string, decode_value, to_params};
use crate::metrics::{DispatcherMetrics, DispatcherSnapshot};
use crate::timer::FlushTimer;

/// Queue length that triggers an immediate flush
pub const MAX_BATCH_SIZE: usize = 100;

/// Cadence of the background flush
pub const FLUSH_INTERVAL: Duration = Duration::from_millis(100);

/// Batching policy for a dispatcher.
///
/// # Default Configuration
///
/// - `max_batch_size`: 100 calls
/// - `flush_interval`: 100 ms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub max_batch_size: usize,
    pub flush_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_BATCH_SIZE,
            flush_interval: FLUSH_INTERVAL,
        }
    }
}

type Completion = oneshot::Sender<Result<Value>>;

struct DispatcherState {
    next_id: u64,
    queue: Vec<JsonRpcRequest>,
    pending: HashMap<u64, Completion>,
}

struct Shared {
    chain_id: u64,
    endpoint: BatchEndpoint,
    transport: HttpBatchTransport,
    max_batch_size: usize,
    runtime: Handle,
    metrics: DispatcherMetrics,
    state: Mutex<DispatcherState>,
}

/// Coalesces concurrent calls for one endpoint into batched round trips.
///
/// # Example
///
/// ```rust,no_run
/// use rpcmux_client::{ClientOptions, Dispatcher, RpcClient};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RpcClient::new(ClientOptions {
///     client_id: Some("my-client-id".into()),
///     ..Default::default()
/// })?;
/// let dispatcher = Dispatcher::new(&client, 1)?;
///
/// // Both calls leave in the same batch
/// let (block, chain) = tokio::join!(
///     dispatcher.call_string("eth_blockNumber", ()),
///     dispatcher.call_string("eth_chainId", ()),
/// );
/// println!("block {} on chain {}", block?, chain?);
/// # Ok(())
/// # }
/// ```
pub struct Dispatcher {
    shared: Arc<Shared>,
    timer: FlushTimer,
}

impl Dispatcher {
    /// Creates a dispatcher with the default batching policy and starts its
    /// flush timer.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `chain_id` is zero
    /// - `InvalidOperation` if called outside a Tokio runtime
    pub fn new(client: &RpcClient, chain_id: u64) -> Result<Self> {
        Self::with_config(client, chain_id, DispatcherConfig::default())
    }

    pub fn with_config(client: &RpcClient, chain_id: u64, config: DispatcherConfig) -> Result<Self> {
        if chain_id == 0 {
            return Err(RpcMuxError::InvalidArgument("chain id must be non-zero".into()));
        }
        if config.max_batch_size == 0 {
            return Err(RpcMuxError::InvalidArgument(
                "max batch size must be greater than zero".into(),
            ));
        }
        let runtime = Handle::try_current().map_err(|_| {
            RpcMuxError::InvalidOperation("dispatcher requires a Tokio runtime".into())
        })?;

        let shared = Arc::new(Shared {
            chain_id,
            endpoint: BatchEndpoint {
                url: client.rpc_url(chain_id),
                credentials: client.credentials().clone(),
                timeout: client.rpc_timeout(),
            },
            transport: HttpBatchTransport::shared()?,
            max_batch_size: config.max_batch_size,
            runtime,
            metrics: DispatcherMetrics::new(),
            state: Mutex::new(DispatcherState {
                next_id: 1,
                queue: Vec::new(),
                pending: HashMap::new(),
            }),
        });

        let weak = Arc::downgrade(&shared);
        let timer = FlushTimer::new(config.flush_interval, move || {
            if let Some(shared) = weak.upgrade() {
                if let Some(batch) = shared.take_batch() {
                    shared.spawn_dispatch(batch, false);
                }
            }
        })?;
        timer.start();

        Ok(Self { shared, timer })
    }

    pub fn chain_id(&self) -> u64 {
        self.shared.chain_id
    }

    pub fn url(&self) -> &str {
        &self.shared.endpoint.url
    }

    pub fn rpc_timeout(&self) -> Duration {
        self.shared.endpoint.timeout
    }

    /// Whether this dispatcher can no longer flush.
    ///
    /// True once the runtime it was created on has shut down: its flush timer
    /// and batch tasks are gone, so new calls would never be sent.
    pub fn is_closed(&self) -> bool {
        !self.timer.is_alive()
    }

    /// Calls enqueued or in flight that have not been settled yet.
    pub fn pending_count(&self) -> usize {
        self.shared.state().pending.len()
    }

    pub fn metrics(&self) -> DispatcherSnapshot {
        let pending = self.pending_count() as u64;
        self.shared.metrics.snapshot(self.shared.chain_id, pending)
    }

    /// Enqueues a call and returns a future resolving to its raw result.
    ///
    /// Never blocks on I/O. When this call fills the queue to
    /// `max_batch_size`, the batch is dispatched right away on a background
    /// task; the returned future resolves independently of that task.
    ///
    /// On a closed dispatcher (see [`Dispatcher::is_closed`]) nothing is
    /// enqueued and the future resolves to [`RpcMuxError::Closed`].
    pub fn send(&self, method: impl Into<String>, params: Vec<Value>) -> PendingResponse {
        let (completion, receiver) = oneshot::channel();

        if self.is_closed() {
            tracing::debug!(chain_id = self.shared.chain_id, "Call sent to a closed dispatcher");
            let _ = completion.send(Err(RpcMuxError::Closed));
            return PendingResponse { id: 0, receiver };
        }

        let (id, full_batch) = {
            let mut state = self.shared.state();
            let id = state.next_id;
            state.next_id += 1;
            state.queue.push(JsonRpcRequest::new(id, method, params));
            state.pending.insert(id, completion);

            let full_batch = if state.queue.len() >= self.shared.max_batch_size {
                Some(std::mem::take(&mut state.queue))
            } else {
                None
            };
            (id, full_batch)
        };

        self.shared.metrics.record_enqueued();
        if let Some(batch) = full_batch {
            self.shared.spawn_dispatch(batch, true);
        }

        PendingResponse { id, receiver }
    }

    /// Sends a call with serializable params and decodes the result into `T`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` before anything is enqueued when `params`
    /// does not serialize to a JSON array. Decode failures surface as
    /// `InvalidOperation`.
    pub async fn call<T, P>(&self, method: &str, params: P) -> Result<T>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        let params = to_params(params)?;
        let value = self.send(method, params).await?;
        decode_value(value)
    }

    /// Sends a call whose result is a `0x` hex string and returns its bytes.
    pub async fn call_bytes<P: Serialize>(&self, method: &str, params: P) -> Result<Vec<u8>> {
        let params = to_params(params)?;
        let value = self.send(method, params).await?;
        decode_bytes(value)
    }

    /// Sends a call and returns its raw result as text.
    pub async fn call_string<P: Serialize>(&self, method: &str, params: P) -> Result<String> {
        let params = to_params(params)?;
        let value = self.send(method, params).await?;
        Ok(decode_string(value))
    }

    /// Sends whatever is queued right now as one batch and waits for it.
    ///
    /// An empty queue is a no-op. A timeout is returned to the caller as well
    /// as delivered to every call of the batch.
    pub async fn flush(&self) -> Result<()> {
        match self.shared.take_batch() {
            Some(batch) => self.shared.dispatch(batch, false).await,
            None => Ok(()),
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.timer.stop();
        tracing::debug!(chain_id = self.shared.chain_id, "Dispatcher dropped");
    }
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, DispatcherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes and returns everything queued, or `None` if nothing is.
    fn take_batch(&self) -> Option<Vec<JsonRpcRequest>> {
        let mut state = self.state();
        if state.queue.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut state.queue))
        }
    }

    fn spawn_dispatch(self: &Arc<Self>, batch: Vec<JsonRpcRequest>, size_triggered: bool) {
        let shared = Arc::clone(self);
        self.runtime.spawn(async move {
            // Outcomes were already delivered to the calls
            let _ = shared.dispatch(batch, size_triggered).await;
        });
    }

    async fn dispatch(&self, batch: Vec<JsonRpcRequest>, size_triggered: bool) -> Result<()> {
        self.metrics.record_batch(size_triggered);
        tracing::debug!(
            chain_id = self.chain_id,
            batch_size = batch.len(),
            size_triggered,
            "Flushing RPC batch"
        );

        match self.transport.send_batch(&self.endpoint, &batch).await {
            Ok(envelopes) => {
                self.settle(&batch, envelopes);
                Ok(())
            }
            Err(err @ RpcMuxError::Timeout(_)) => {
                let failed = self.fail_batch(&batch, &err);
                self.metrics.record_timeouts(failed);
                tracing::warn!(
                    chain_id = self.chain_id,
                    calls = failed,
                    "RPC batch timed out after {:?}",
                    self.endpoint.timeout
                );
                Err(err)
            }
            Err(err @ RpcMuxError::InvalidOperation(_)) => {
                let failed = self.fail_batch(&batch, &err);
                self.metrics.record_deserialization_failures(failed);
                tracing::warn!(chain_id = self.chain_id, calls = failed, error = %err, "RPC batch response unusable");
                Err(err)
            }
            Err(err) => {
                let failed = self.fail_all_pending(&err);
                self.metrics.record_transport_failures(failed);
                tracing::warn!(chain_id = self.chain_id, calls = failed, error = %err, "RPC transport failure");
                Err(err)
            }
        }
    }

    /// Routes envelopes to their calls by id.
    fn settle(&self, batch: &[JsonRpcRequest], envelopes: Vec<JsonRpcResponse>) {
        let mut settled = Vec::with_capacity(envelopes.len());
        let mut missing = Vec::new();
        {
            let mut state = self.state();
            for envelope in envelopes {
                match state.pending.remove(&envelope.id) {
                    Some(completion) => settled.push((completion, envelope.into_result())),
                    None => {
                        self.metrics.record_unmatched_envelope();
                        tracing::debug!(
                            chain_id = self.chain_id,
                            id = envelope.id,
                            "Ignoring envelope with no pending call"
                        );
                    }
                }
            }
            for request in batch {
                if let Some(completion) = state.pending.remove(&request.id) {
                    missing.push((request.id, completion));
                }
            }
        }

        for (completion, outcome) in settled {
            match &outcome {
                Ok(_) => self.metrics.record_success(),
                Err(_) => self.metrics.record_rpc_error(),
            }
            let _ = completion.send(outcome);
        }

        if !missing.is_empty() {
            self.metrics.record_missing_responses(missing.len() as u64);
            tracing::warn!(
                chain_id = self.chain_id,
                calls = missing.len(),
                "RPC batch response omitted some requests"
            );
        }
        for (id, completion) in missing {
            let _ = completion.send(Err(RpcMuxError::InvalidOperation(format!(
                "No response received for request {}",
                id
            ))));
        }
    }

    /// Fails every still-pending call of `batch`.
    fn fail_batch(&self, batch: &[JsonRpcRequest], err: &RpcMuxError) -> u64 {
        let completions: Vec<Completion> = {
            let mut state = self.state();
            batch
                .iter()
                .filter_map(|request| state.pending.remove(&request.id))
                .collect()
        };
        let failed = completions.len() as u64;
        for completion in completions {
            let _ = completion.send(Err(err.clone()));
        }
        failed
    }

    /// Fails every pending call on this endpoint, queued or in flight.
    ///
    /// Queued requests are dropped too: their callers have already been told
    /// the call failed, so they must not reach the wire afterwards.
    fn fail_all_pending(&self, err: &RpcMuxError) -> u64 {
        let completions: Vec<Completion> = {
            let mut state = self.state();
            state.queue.clear();
            state.pending.drain().map(|(_, completion)| completion).collect()
        };
        let failed = completions.len() as u64;
        for completion in completions {
            let _ = completion.send(Err(err.clone()));
        }
        failed
    }
}

/// Future returned by [`Dispatcher::send`].
///
/// Resolves to the raw result, or to the classified failure for this call.
/// If the dispatcher's state is dropped before the call is settled, resolves
/// to [`RpcMuxError::Closed`].
#[derive(Debug)]
pub struct PendingResponse {
    id: u64,
    receiver: oneshot::Receiver<Result<Value>>,
}

impl PendingResponse {
    /// Request id assigned to this call, or 0 if it was never enqueued.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Future for PendingResponse {
    type Output = Result<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or(Err(RpcMuxError::Closed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientOptions;

    fn test_client() -> RpcClient {
        let mut options = ClientOptions {
            client_id: Some("unit-test".into()),
            ..Default::default()
        };
        // Nothing listens here; unit tests never let a batch leave
        options.rpc_overrides.insert(1, "http://127.0.0.1:9/".into());
        RpcClient::new(options).unwrap()
    }

    fn slow_config() -> DispatcherConfig {
        DispatcherConfig {
            max_batch_size: MAX_BATCH_SIZE,
            flush_interval: Duration::from_secs(3600),
        }
    }

    #[test]
    fn test_config_default() {
        let config = DispatcherConfig::default();
        assert_eq!(config.max_batch_size, 100);
        assert_eq!(config.flush_interval, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_zero_chain_id_rejected() {
        let result = Dispatcher::new(&test_client(), 0);
        assert!(matches!(result, Err(RpcMuxError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected() {
        let config = DispatcherConfig {
            max_batch_size: 0,
            ..Default::default()
        };
        let result = Dispatcher::with_config(&test_client(), 1, config);
        assert!(matches!(result, Err(RpcMuxError::InvalidArgument(_))));
    }

    #[test]
    fn test_requires_runtime() {
        let result = Dispatcher::new(&test_client(), 1);
        assert!(matches!(result, Err(RpcMuxError::InvalidOperation(_))));
    }

    #[tokio::test]
    async fn test_ids_start_at_one_and_increase() {
        let dispatcher = Dispatcher::with_config(&test_client(), 1, slow_config()).unwrap();
        let ids: Vec<u64> = (0..5).map(|_| dispatcher.send("m", vec![]).id()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(dispatcher.pending_count(), 5);
        assert_eq!(dispatcher.metrics().calls_enqueued, 5);
    }

    #[tokio::test]
    async fn test_flush_empty_queue_is_noop() {
        let dispatcher = Dispatcher::with_config(&test_client(), 1, slow_config()).unwrap();
        dispatcher.flush().await.unwrap();
        assert_eq!(dispatcher.metrics().batches_sent, 0);
    }

    #[tokio::test]
    async fn test_object_params_rejected_before_enqueue() {
        let dispatcher = Dispatcher::with_config(&test_client(), 1, slow_config()).unwrap();
        let result: Result<Value> = dispatcher
            .call("eth_call", serde_json::json!({"to": "0x0"}))
            .await;
        assert!(matches!(result, Err(RpcMuxError::InvalidArgument(_))));
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_envelope_routing_by_id() {
        let dispatcher = Dispatcher::with_config(&test_client(), 1, slow_config()).unwrap();
        let first = dispatcher.send("a", vec![]);
        let second = dispatcher.send("b", vec![]);
        let batch = dispatcher.shared.take_batch().unwrap();

        dispatcher.shared.settle(
            &batch,
            vec![
                JsonRpcResponse::success(2, Value::from("second")),
                JsonRpcResponse::success(1, Value::from("first")),
                JsonRpcResponse::success(99, Value::from("stray")),
            ],
        );

        assert_eq!(first.await.unwrap(), Value::from("first"));
        assert_eq!(second.await.unwrap(), Value::from("second"));
        assert_eq!(dispatcher.metrics().unmatched_envelopes, 1);
    }

    #[tokio::test]
    async fn test_missing_envelope_fails_call() {
        let dispatcher = Dispatcher::with_config(&test_client(), 1, slow_config()).unwrap();
        let answered = dispatcher.send("a", vec![]);
        let unanswered = dispatcher.send("b", vec![]);
        let batch = dispatcher.shared.take_batch().unwrap();

        dispatcher
            .shared
            .settle(&batch, vec![JsonRpcResponse::success(1, Value::Null)]);

        assert_eq!(answered.await.unwrap(), Value::Null);
        assert!(matches!(unanswered.await, Err(RpcMuxError::InvalidOperation(_))));
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_fail_all_pending_clears_queue() {
        let dispatcher = Dispatcher::with_config(&test_client(), 1, slow_config()).unwrap();
        let queued = dispatcher.send("a", vec![]);
        let failed = dispatcher.shared.fail_all_pending(&RpcMuxError::transport("down"));

        assert_eq!(failed, 1);
        assert!(dispatcher.shared.take_batch().is_none());
        assert!(matches!(queued.await, Err(RpcMuxError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_settled_call_is_not_settled_twice() {
        let dispatcher = Dispatcher::with_config(&test_client(), 1, slow_config()).unwrap();
        let call = dispatcher.send("a", vec![]);
        let batch = dispatcher.shared.take_batch().unwrap();

        dispatcher
            .shared
            .settle(&batch, vec![JsonRpcResponse::success(1, Value::from(1))]);
        let failed = dispatcher.shared.fail_batch(&batch, &RpcMuxError::Timeout(10));

        assert_eq!(failed, 0);
        assert_eq!(call.await.unwrap(), Value::from(1));
    }

    #[test]
    fn test_send_after_runtime_shutdown_resolves_closed() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let dispatcher = runtime
            .block_on(async { Dispatcher::with_config(&test_client(), 1, slow_config()) })
            .unwrap();
        assert!(!dispatcher.is_closed());
        drop(runtime);

        assert!(dispatcher.is_closed());
        let next = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let outcome = next.block_on(dispatcher.send("m", vec![]));
        assert_eq!(outcome, Err(RpcMuxError::Closed));
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_resolves_queued_calls_as_closed() {
        let dispatcher = Dispatcher::with_config(&test_client(), 1, slow_config()).unwrap();
        let call = dispatcher.send("a", vec![]);
        drop(dispatcher);
        assert_eq!(call.await, Err(RpcMuxError::Closed));
    }
}
