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

use std::time::{Duration, Instant};

use futures::future::join_all;
use rpcmux_client::{Dispatcher, DispatcherSnapshot};
use serde::Serialize;
use serde_json::Value;

/// Outcome of a burst run.
#[derive(Debug, Serialize)]
pub struct BurstReport {
    pub calls: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
    pub metrics: DispatcherSnapshot,
}

/// Issues `count` calls to `method` at once and waits for all of them.
///
/// Every call is enqueued before any is awaited, so the dispatcher sees the
/// whole burst and batches it by its own policy.
pub async fn run_burst(
    dispatcher: &Dispatcher,
    method: &str,
    params: &[Value],
    count: usize,
) -> BurstReport {
    let started = Instant::now();
    let calls: Vec<_> = (0..count)
        .map(|_| dispatcher.send(method, params.to_vec()))
        .collect();
    let results = join_all(calls).await;
    let elapsed = started.elapsed();

    let failed = results.iter().filter(|r| r.is_err()).count();
    if let Some(Err(err)) = results.iter().find(|r| r.is_err()) {
        tracing::warn!(failed, error = %err, "Burst calls failed");
    }
    tracing::info!(calls = count, elapsed_ms = duration_ms(elapsed), "Burst finished");

    BurstReport {
        calls: count,
        succeeded: count - failed,
        failed,
        elapsed_ms: duration_ms(elapsed),
        metrics: dispatcher.metrics(),
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
