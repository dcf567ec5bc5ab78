//! rpcmux Transport Layer
//!
//! One HTTP client is shared by the whole process; every dispatcher sends its
//! batches through it.
//!
//! # Components
//!
//! - **[`HttpBatchTransport`]**: POSTs a JSON-RPC batch and parses the envelopes
//! - **[`BatchEndpoint`]**: URL, credentials and deadline for one endpoint
//! - **[`parse_batch_response`]**: body → envelope array, with deserialization
//!   failures reported as `InvalidOperation`

pub mod http;

pub use http::{parse_batch_response, sdk_headers, BatchEndpoint, HttpBatchTransport};
