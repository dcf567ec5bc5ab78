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
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Duration;

use rpcmux_common::auth::Credentials;
use rpcmux_common::protocol::error::{Result, RpcMuxError};
use tracing::info;

use crate::client::RpcClient;
use crate::dispatcher::{Dispatcher, DispatcherConfig};

static GLOBAL_REGISTRY: OnceLock<EndpointRegistry> = OnceLock::new();

/// Identity of one logical endpoint.
///
/// Two clients with the same credentials, chain, timeout and RPC URL share a
/// dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointKey {
    pub credentials: Credentials,
    pub chain_id: u64,
    pub rpc_timeout: Duration,
    pub rpc_url: String,
}

impl EndpointKey {
    pub fn new(client: &RpcClient, chain_id: u64) -> Self {
        Self {
            credentials: client.credentials().clone(),
            chain_id,
            rpc_timeout: client.rpc_timeout(),
            rpc_url: client.rpc_url(chain_id),
        }
    }
}

/// Cache of dispatchers keyed by [`EndpointKey`].
///
/// Entries are created on first use and live as long as the registry; the
/// process-wide registry behind [`EndpointRegistry::global`] lives until exit.
/// A dispatcher is bound to the Tokio runtime that created it. When that
/// runtime shuts down, the next lookup for its key replaces it with one bound
/// to the caller's runtime.
///
/// # Example
///
/// ```rust,no_run
/// use rpcmux_client::{ClientOptions, EndpointRegistry, RpcClient};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RpcClient::new(ClientOptions {
///     client_id: Some("my-client-id".into()),
///     ..Default::default()
/// })?;
/// let a = EndpointRegistry::global().get_or_create(&client, 1)?;
/// let b = EndpointRegistry::global().get_or_create(&client, 1)?;
/// assert!(Arc::ptr_eq(&a, &b));
/// # Ok(())
/// # }
/// ```
pub struct EndpointRegistry {
    config: DispatcherConfig,
    dispatchers: RwLock<HashMap<EndpointKey, Arc<Dispatcher>>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Creates a registry whose dispatchers use `config`.
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            config,
            dispatchers: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static EndpointRegistry {
        GLOBAL_REGISTRY.get_or_init(EndpointRegistry::new)
    }

    /// Returns the dispatcher for `client` on `chain_id`, creating it on
    /// first use.
    ///
    /// Concurrent first callers for the same key all receive the one
    /// instance that was inserted. A closed entry (see
    /// [`Dispatcher::is_closed`]) is rebuilt on the current runtime.
    ///
    /// # Errors
    ///
    /// Propagates dispatcher construction errors (`InvalidArgument` for a
    /// zero chain id); existing entries are unaffected.
    pub fn get_or_create(&self, client: &RpcClient, chain_id: u64) -> Result<Arc<Dispatcher>> {
        if chain_id == 0 {
            return Err(RpcMuxError::InvalidArgument("chain id must be non-zero".into()));
        }
        let key = EndpointKey::new(client, chain_id);

        {
            let dispatchers = self.dispatchers.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(dispatcher) = dispatchers.get(&key) {
                if !dispatcher.is_closed() {
                    return Ok(Arc::clone(dispatcher));
                }
            }
        }

        let mut dispatchers = self.dispatchers.write().unwrap_or_else(PoisonError::into_inner);
        let replacing = match dispatchers.get(&key) {
            Some(dispatcher) if !dispatcher.is_closed() => return Ok(Arc::clone(dispatcher)),
            Some(_) => true,
            None => false,
        };

        let dispatcher = Arc::new(Dispatcher::with_config(client, chain_id, self.config.clone())?);
        if replacing {
            info!(
                chain_id,
                url = %dispatcher.url(),
                client = %key.credentials,
                "Replaced RPC dispatcher whose runtime shut down"
            );
        } else {
            info!(
                chain_id,
                url = %dispatcher.url(),
                client = %key.credentials,
                "Created RPC dispatcher"
            );
        }
        dispatchers.insert(key, Arc::clone(&dispatcher));
        Ok(dispatcher)
    }

    pub fn len(&self) -> usize {
        self.dispatchers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}
