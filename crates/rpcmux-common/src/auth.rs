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

//! Gateway Credentials
//!
//! The gateway identifies callers through request headers:
//! - `x-client-id`: public client identifier (always sent)
//! - `x-secret-key`: server-side secret, only for trusted backends
//! - `x-bundle-id`: application bundle identifier for mobile/desktop apps
//!
//! A secret key alone is enough to build credentials; the client id is then
//! derived from it the same way the gateway does.
//!
//! # Example
//!
//! ```
//! use rpcmux_common::auth::Credentials;
//!
//! let creds = Credentials::new(Some("my-client-id".into()), None, None).unwrap();
//! assert_eq!(creds.client_id(), "my-client-id");
//!
//! let missing = Credentials::new(None, None, None);
//! assert!(missing.is_err());
//! ```

use std::fmt;

use sha2::{Digest, Sha256};

use crate::protocol::error::{Result, RpcMuxError};

pub const CLIENT_ID_HEADER: &str = "x-client-id";
pub const SECRET_KEY_HEADER: &str = "x-secret-key";
pub const BUNDLE_ID_HEADER: &str = "x-bundle-id";

/// Caller identity sent with every batch.
///
/// Equality and hashing are structural so credentials can take part in the
/// endpoint cache key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credentials {
    client_id: String,
    secret_key: Option<String>,
    bundle_id: Option<String>,
}

impl Credentials {
    /// Builds credentials, deriving the client id from the secret key when
    /// only the latter is given.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when neither a client id nor a secret key is
    /// provided. Blank values count as absent.
    pub fn new(
        client_id: Option<String>,
        secret_key: Option<String>,
        bundle_id: Option<String>,
    ) -> Result<Self> {
        let client_id = non_blank(client_id);
        let secret_key = non_blank(secret_key);
        let bundle_id = non_blank(bundle_id);

        let client_id = match (client_id, &secret_key) {
            (Some(id), _) => id,
            (None, Some(secret)) => client_id_from_secret_key(secret),
            (None, None) => {
                return Err(RpcMuxError::InvalidArgument(
                    "a client id or a secret key must be provided".into(),
                ))
            }
        };

        Ok(Self {
            client_id,
            secret_key,
            bundle_id,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn secret_key(&self) -> Option<&str> {
        self.secret_key.as_deref()
    }

    pub fn bundle_id(&self) -> Option<&str> {
        self.bundle_id.as_deref()
    }

    /// Header name/value pairs identifying this caller.
    pub fn header_pairs(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![(CLIENT_ID_HEADER, self.client_id.clone())];
        if let Some(secret) = &self.secret_key {
            headers.push((SECRET_KEY_HEADER, secret.clone()));
        }
        if let Some(bundle) = &self.bundle_id {
            headers.push((BUNDLE_ID_HEADER, bundle.clone()));
        }
        headers
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "*****"))
            .field("bundle_id", &self.bundle_id)
            .finish()
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.secret_key {
            Some(_) => write!(f, "ClientId({}, secret=*****)", self.client_id),
            None => write!(f, "ClientId({})", self.client_id),
        }
    }
}

/// Derives the public client id for a secret key: the first 32 hex digits of
/// its SHA-256 digest.
pub fn client_id_from_secret_key(secret_key: &str) -> String {
    let digest = Sha256::digest(secret_key.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(32);
    id
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
