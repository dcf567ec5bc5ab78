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

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rpcmux_common::auth::Credentials;
use rpcmux_common::config::{default_rpc_url, TimeoutOptions, TimeoutType};
use rpcmux_common::protocol::error::Result;

use crate::dispatcher::Dispatcher;
use crate::registry::EndpointRegistry;

pub const CLIENT_ID_ENV: &str = "RPCMUX_CLIENT_ID";
pub const SECRET_KEY_ENV: &str = "RPCMUX_SECRET_KEY";
pub const BUNDLE_ID_ENV: &str = "RPCMUX_BUNDLE_ID";

/// Options used to build an [`RpcClient`].
///
/// # Example
///
/// ```rust
/// use rpcmux_client::ClientOptions;
/// use std::time::Duration;
///
/// let mut options = ClientOptions {
///     client_id: Some("my-client-id".into()),
///     ..Default::default()
/// };
/// options.timeouts.rpc = Some(Duration::from_secs(15));
/// options.rpc_overrides.insert(31337, "http://127.0.0.1:8545".into());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub client_id: Option<String>,
    pub secret_key: Option<String>,
    pub bundle_id: Option<String>,
    pub timeouts: TimeoutOptions,
    /// Per-chain RPC URLs that replace the default gateway URL
    pub rpc_overrides: HashMap<u64, String>,
}

impl ClientOptions {
    /// Reads credentials from `RPCMUX_CLIENT_ID`, `RPCMUX_SECRET_KEY` and
    /// `RPCMUX_BUNDLE_ID`.
    pub fn from_env() -> Self {
        Self {
            client_id: std::env::var(CLIENT_ID_ENV).ok(),
            secret_key: std::env::var(SECRET_KEY_ENV).ok(),
            bundle_id: std::env::var(BUNDLE_ID_ENV).ok(),
            ..Default::default()
        }
    }
}

/// Handle carrying the caller's identity and endpoint configuration.
///
/// Dispatchers are created from a client and a chain id; the client itself
/// performs no I/O.
#[derive(Debug, Clone)]
pub struct RpcClient {
    credentials: Credentials,
    timeouts: TimeoutOptions,
    rpc_overrides: HashMap<u64, String>,
}

impl RpcClient {
    /// Creates a client, validating that a client id or secret key is set.
    pub fn new(options: ClientOptions) -> Result<Self> {
        let credentials = Credentials::new(options.client_id, options.secret_key, options.bundle_id)?;
        Ok(Self {
            credentials,
            timeouts: options.timeouts,
            rpc_overrides: options.rpc_overrides,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn client_id(&self) -> &str {
        self.credentials.client_id()
    }

    pub fn timeouts(&self) -> &TimeoutOptions {
        &self.timeouts
    }

    /// Deadline applied to each batch round trip.
    pub fn rpc_timeout(&self) -> Duration {
        self.timeouts.get_timeout(TimeoutType::Rpc)
    }

    /// URL batches for `chain_id` are posted to.
    pub fn rpc_url(&self, chain_id: u64) -> String {
        self.rpc_overrides
            .get(&chain_id)
            .cloned()
            .unwrap_or_else(|| default_rpc_url(chain_id))
    }
}

/// Returns the process-wide dispatcher for `client` on `chain_id`.
///
/// Shorthand for [`EndpointRegistry::global`] followed by
/// [`EndpointRegistry::get_or_create`].
pub fn rpc(client: &RpcClient, chain_id: u64) -> Result<Arc<Dispatcher>> {
    EndpointRegistry::global().get_or_create(client, chain_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpcmux_common::config::DEFAULT_FETCH_TIMEOUT;
    use rpcmux_common::protocol::RpcMuxError;

    #[test]
    fn test_client_requires_identity() {
        let err = RpcClient::new(ClientOptions::default()).unwrap_err();
        assert!(matches!(err, RpcMuxError::InvalidArgument(_)));
    }

    #[test]
    fn test_default_rpc_url_and_timeout() {
        let client = RpcClient::new(ClientOptions {
            client_id: Some("abc".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.rpc_url(137), "https://137.rpc.thirdweb.com/");
        assert_eq!(client.rpc_timeout(), DEFAULT_FETCH_TIMEOUT);
        assert_eq!(client.client_id(), "abc");
    }

    #[test]
    fn test_rpc_override() {
        let mut options = ClientOptions {
            client_id: Some("abc".into()),
            ..Default::default()
        };
        options.rpc_overrides.insert(31337, "http://127.0.0.1:8545/".into());
        options.timeouts.rpc = Some(Duration::from_secs(3));

        let client = RpcClient::new(options).unwrap();
        assert_eq!(client.rpc_url(31337), "http://127.0.0.1:8545/");
        assert_eq!(client.rpc_url(1), "https://1.rpc.thirdweb.com/");
        assert_eq!(client.rpc_timeout(), Duration::from_secs(3));
    }
}
