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

use std::time::Duration;

/// Timeout applied to any request category that has not been configured.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Category of outbound request a timeout applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutType {
    Storage,
    Rpc,
    Other,
}

/// Per-category request timeouts.
///
/// Unset categories fall back to [`DEFAULT_FETCH_TIMEOUT`].
///
/// # Example
///
/// ```
/// use rpcmux_common::config::{TimeoutOptions, TimeoutType, DEFAULT_FETCH_TIMEOUT};
/// use std::time::Duration;
///
/// let timeouts = TimeoutOptions {
///     rpc: Some(Duration::from_secs(10)),
///     ..Default::default()
/// };
/// assert_eq!(timeouts.get_timeout(TimeoutType::Rpc), Duration::from_secs(10));
/// assert_eq!(timeouts.get_timeout(TimeoutType::Storage), DEFAULT_FETCH_TIMEOUT);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TimeoutOptions {
    pub storage: Option<Duration>,
    pub rpc: Option<Duration>,
    pub other: Option<Duration>,
}

impl TimeoutOptions {
    pub fn get_timeout(&self, kind: TimeoutType) -> Duration {
        let configured = match kind {
            TimeoutType::Storage => self.storage,
            TimeoutType::Rpc => self.rpc,
            TimeoutType::Other => self.other,
        };
        configured.unwrap_or(DEFAULT_FETCH_TIMEOUT)
    }
}

/// Default gateway URL for a chain.
pub fn default_rpc_url(chain_id: u64) -> String {
    format!("https://{}.rpc.thirdweb.com/", chain_id)
}
