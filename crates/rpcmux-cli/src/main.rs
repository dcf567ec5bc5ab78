//! # rpcmux CLI Entry Point
//!
//! Main binary for the rpcmux batching JSON-RPC client.
//!
//! ## Usage
//!
//! ```bash
//! # Raw JSON result of one call
//! rpcmux --client-id my-id call 1 eth_getBalance -p '["0xabc...", "latest"]'
//!
//! # Latest block number against a local node
//! rpcmux --client-id my-id block-number 31337 --rpc-url http://127.0.0.1:8545
//!
//! # 500 concurrent calls, then the dispatcher counters
//! rpcmux --client-id my-id burst 1 -n 500
//! ```
//!
//! Credentials not given as flags are read from `RPCMUX_CLIENT_ID`,
//! `RPCMUX_SECRET_KEY` and `RPCMUX_BUNDLE_ID`.
//!
//! ## URL Format
//!
//! `--rpc-url` must include the `http://` or `https://` prefix.

use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;
use rpcmux_client::{rpc, ClientOptions, RpcClient};
use serde_json::Value;

/// Validates that a URL string starts with http:// or https://
fn validate_http_url(url: &str, description: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Invalid {}: '{}' must start with http:// or https://",
            description,
            url
        ))
    }
}

/// Parses a JSON params string, which must be an array.
fn parse_params(raw: &str) -> Result<Vec<Value>> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("Invalid JSON in params: {}", e))?;
    match value {
        Value::Array(params) => Ok(params),
        Value::Null => Ok(Vec::new()),
        other => Err(anyhow::anyhow!("params must be a JSON array, got {}", other)),
    }
}

#[derive(FromArgs)]
/// rpcmux - batching JSON-RPC client
struct Cli {
    /// client id sent as x-client-id (defaults to RPCMUX_CLIENT_ID)
    #[argh(option, long = "client-id")]
    client_id: Option<String>,

    /// secret key sent as x-secret-key (defaults to RPCMUX_SECRET_KEY)
    ///
    /// When no client id is given, it is derived from the secret key.
    #[argh(option, long = "secret-key")]
    secret_key: Option<String>,

    /// bundle id sent as x-bundle-id (defaults to RPCMUX_BUNDLE_ID)
    #[argh(option, long = "bundle-id")]
    bundle_id: Option<String>,

    /// deadline for each batch round trip in milliseconds
    ///
    /// Defaults to 120000 (two minutes).
    #[argh(option, long = "timeout-ms")]
    timeout_ms: Option<u64>,

    #[argh(subcommand)]
    command: Commands,
}

/// Available CLI subcommands.
#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Call(CallArgs),
    BlockNumber(BlockNumberArgs),
    Burst(BurstArgs),
}

/// Arguments for making a single RPC call.
///
/// Outputs raw JSON (no pretty-printing) to stdout so the result can be
/// piped to `jq`. Errors are reported on stderr with a non-zero exit code.
#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// call a JSON-RPC method
struct CallArgs {
    /// chain id to call
    #[argh(positional)]
    chain_id: u64,

    /// name of the JSON-RPC method
    #[argh(positional)]
    method: String,

    /// positional params as a JSON array, defaults to `[]`
    #[argh(option, short = 'p', long = "params", default = "\"[]\".into()")]
    params: String,

    /// replacement for the default gateway URL of this chain
    #[argh(option, long = "rpc-url")]
    rpc_url: Option<String>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "block-number")]
/// print the latest block number
struct BlockNumberArgs {
    /// chain id to query
    #[argh(positional)]
    chain_id: u64,

    /// replacement for the default gateway URL of this chain
    #[argh(option, long = "rpc-url")]
    rpc_url: Option<String>,
}

/// Arguments for a burst run.
///
/// All calls are issued at once through a single dispatcher; the report
/// shows how many batches they were coalesced into.
#[derive(FromArgs)]
#[argh(subcommand, name = "burst")]
/// issue many concurrent calls and print dispatcher metrics
struct BurstArgs {
    /// chain id to call
    #[argh(positional)]
    chain_id: u64,

    /// number of concurrent calls, defaults to 250
    #[argh(option, short = 'n', long = "count", default = "250")]
    count: usize,

    /// method to call, defaults to eth_blockNumber
    #[argh(option, short = 'm', long = "method", default = "\"eth_blockNumber\".into()")]
    method: String,

    /// positional params as a JSON array, defaults to `[]`
    #[argh(option, short = 'p', long = "params", default = "\"[]\".into()")]
    params: String,

    /// replacement for the default gateway URL of this chain
    #[argh(option, long = "rpc-url")]
    rpc_url: Option<String>,
}

/// Identity and timeout flags shared by every subcommand.
struct ClientFlags {
    client_id: Option<String>,
    secret_key: Option<String>,
    bundle_id: Option<String>,
    timeout_ms: Option<u64>,
}

impl ClientFlags {
    /// Builds a client, falling back to the environment for unset credentials.
    fn build(self, chain_id: u64, rpc_url: Option<String>) -> Result<RpcClient> {
        let env = ClientOptions::from_env();
        let mut options = ClientOptions {
            client_id: self.client_id.or(env.client_id),
            secret_key: self.secret_key.or(env.secret_key),
            bundle_id: self.bundle_id.or(env.bundle_id),
            ..Default::default()
        };
        options.timeouts.rpc = self.timeout_ms.map(Duration::from_millis);

        if let Some(url) = rpc_url {
            validate_http_url(&url, "RPC URL")?;
            options.rpc_overrides.insert(chain_id, url);
        }

        Ok(RpcClient::new(options)?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        client_id,
        secret_key,
        bundle_id,
        timeout_ms,
        command,
    } = argh::from_env();
    let flags = ClientFlags {
        client_id,
        secret_key,
        bundle_id,
        timeout_ms,
    };

    // call keeps stdout clean for piping
    if !matches!(command, Commands::Call(_)) {
        // Set default log level to INFO, but allow RUST_LOG env var to override
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    match command {
        Commands::Call(args) => run_call(flags, args).await,
        Commands::BlockNumber(args) => run_block_number(flags, args).await,
        Commands::Burst(args) => run_burst(flags, args).await,
    }
}

/// Executes the `call` subcommand and prints the raw JSON result.
async fn run_call(flags: ClientFlags, args: CallArgs) -> Result<()> {
    let params = parse_params(&args.params)?;
    let client = flags.build(args.chain_id, args.rpc_url)?;
    let dispatcher = rpc(&client, args.chain_id)?;

    let result = dispatcher.send(args.method, params).await?;
    println!("{}", serde_json::to_string(&result)?);

    Ok(())
}

async fn run_block_number(flags: ClientFlags, args: BlockNumberArgs) -> Result<()> {
    let client = flags.build(args.chain_id, args.rpc_url)?;
    let dispatcher = rpc(&client, args.chain_id)?;
    tracing::info!(chain_id = args.chain_id, url = %dispatcher.url(), "Querying block number");

    let raw = dispatcher.call_string("eth_blockNumber", ()).await?;
    let block = u64::from_str_radix(raw.trim_start_matches("0x"), 16)
        .map_err(|e| anyhow::anyhow!("Invalid block number {:?}: {}", raw, e))?;
    println!("{}", block);

    Ok(())
}

async fn run_burst(flags: ClientFlags, args: BurstArgs) -> Result<()> {
    let params = parse_params(&args.params)?;
    let client = flags.build(args.chain_id, args.rpc_url)?;
    let dispatcher = rpc(&client, args.chain_id)?;
    tracing::info!(
        chain_id = args.chain_id,
        count = args.count,
        method = %args.method,
        "Starting burst"
    );

    let report = rpcmux_cli::burst::run_burst(&dispatcher, &args.method, &params, args.count).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
