pub mod error;
pub mod jsonrpc;

#[cfg(test)]
mod tests;

pub use error::{Result, RpcMuxError};
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
