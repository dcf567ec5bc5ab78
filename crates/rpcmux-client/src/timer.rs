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

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rpcmux_common::protocol::error::{Result, RpcMuxError};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

type Callback = Arc<dyn Fn() + Send + Sync>;

enum TimerState {
    Stopped,
    Running {
        stop: oneshot::Sender<()>,
        task: JoinHandle<()>,
    },
}

/// Cancellable periodic trigger.
///
/// While running, the callback fires once per `interval` on a background
/// task. `stop` is observed immediately: a pending tick never fires after it.
/// Starting a running timer and stopping a stopped one are no-ops. Dropping
/// the timer stops it.
///
/// The callback runs on the timer task without any timer lock held, so it
/// should hand long work off (e.g. `tokio::spawn`) rather than block.
///
/// # Example
///
/// ```rust
/// use rpcmux_client::FlushTimer;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let timer = FlushTimer::new(Duration::from_millis(100), || println!("tick"))?;
/// timer.start();
/// assert!(timer.is_running());
/// timer.stop();
/// # Ok(())
/// # }
/// ```
pub struct FlushTimer {
    interval: Duration,
    callback: Callback,
    runtime: Handle,
    state: Mutex<TimerState>,
}

impl FlushTimer {
    /// Creates a stopped timer bound to the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `interval` is zero
    /// - `InvalidOperation` if called outside a Tokio runtime
    pub fn new<F>(interval: Duration, callback: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if interval.is_zero() {
            return Err(RpcMuxError::InvalidArgument(
                "flush interval must be greater than zero".into(),
            ));
        }
        let runtime = Handle::try_current().map_err(|_| {
            RpcMuxError::InvalidOperation("flush timer requires a Tokio runtime".into())
        })?;

        Ok(Self {
            interval,
            callback: Arc::new(callback),
            runtime,
            state: Mutex::new(TimerState::Stopped),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.state(), TimerState::Running { .. })
    }

    /// Whether the tick loop is still scheduled.
    ///
    /// A running timer whose runtime has shut down is no longer alive: its
    /// task was cancelled with the runtime and the callback will not fire
    /// again.
    pub fn is_alive(&self) -> bool {
        match &*self.state() {
            TimerState::Running { task, .. } => !task.is_finished(),
            TimerState::Stopped => false,
        }
    }

    /// Transitions Stopped → Running and spawns the tick loop.
    pub fn start(&self) {
        let mut state = self.state();
        if matches!(*state, TimerState::Running { .. }) {
            return;
        }

        let (stop, stop_rx) = oneshot::channel();
        let task = self
            .runtime
            .spawn(tick_loop(self.interval, Arc::clone(&self.callback), stop_rx));
        *state = TimerState::Running { stop, task };
    }

    /// Transitions Running → Stopped; the loop exits without firing again.
    pub fn stop(&self) {
        let previous = std::mem::replace(&mut *self.state(), TimerState::Stopped);
        if let TimerState::Running { stop, task } = previous {
            let _ = stop.send(());
            drop(task);
        }
    }

    fn state(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for FlushTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn tick_loop(interval: Duration, callback: Callback, mut stop_rx: oneshot::Receiver<()>) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            // Also resolves when the sender is dropped
            _ = &mut stop_rx => break,
            _ = ticker.tick() => callback(),
        }
    }
}
