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

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Lock-free counters kept by every dispatcher.
///
/// Counters only ever increase; take a [`DispatcherSnapshot`] to read them.
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    calls_enqueued: AtomicU64,
    batches_sent: AtomicU64,
    size_triggered_flushes: AtomicU64,
    calls_succeeded: AtomicU64,
    rpc_errors: AtomicU64,
    timeouts: AtomicU64,
    transport_failures: AtomicU64,
    deserialization_failures: AtomicU64,
    missing_responses: AtomicU64,
    unmatched_envelopes: AtomicU64,
}

/// Point-in-time copy of a dispatcher's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherSnapshot {
    pub chain_id: u64,
    pub pending_calls: u64,
    pub calls_enqueued: u64,
    pub batches_sent: u64,
    pub size_triggered_flushes: u64,
    pub calls_succeeded: u64,
    pub rpc_errors: u64,
    pub timeouts: u64,
    pub transport_failures: u64,
    pub deserialization_failures: u64,
    /// Calls of a sent batch that got no envelope back
    pub missing_responses: u64,
    /// Envelopes whose id matched no pending call
    pub unmatched_envelopes: u64,
}

impl DispatcherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueued(&self) {
        self.calls_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch(&self, size_triggered: bool) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        if size_triggered {
            self.size_triggered_flushes.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_success(&self) {
        self.calls_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rpc_error(&self) {
        self.rpc_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeouts(&self, calls: u64) {
        self.timeouts.fetch_add(calls, Ordering::Relaxed);
    }

    pub fn record_transport_failures(&self, calls: u64) {
        self.transport_failures.fetch_add(calls, Ordering::Relaxed);
    }

    pub fn record_deserialization_failures(&self, calls: u64) {
        self.deserialization_failures.fetch_add(calls, Ordering::Relaxed);
    }

    pub fn record_missing_responses(&self, calls: u64) {
        self.missing_responses.fetch_add(calls, Ordering::Relaxed);
    }

    pub fn record_unmatched_envelope(&self) {
        self.unmatched_envelopes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, chain_id: u64, pending_calls: u64) -> DispatcherSnapshot {
        DispatcherSnapshot {
            chain_id,
            pending_calls,
            calls_enqueued: self.calls_enqueued.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            size_triggered_flushes: self.size_triggered_flushes.load(Ordering::Relaxed),
            calls_succeeded: self.calls_succeeded.load(Ordering::Relaxed),
            rpc_errors: self.rpc_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            deserialization_failures: self.deserialization_failures.load(Ordering::Relaxed),
            missing_responses: self.missing_responses.load(Ordering::Relaxed),
            unmatched_envelopes: self.unmatched_envelopes.load(Ordering::Relaxed),
        }
    }
}
