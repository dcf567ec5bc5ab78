//! Shared test helpers: an in-process JSON-RPC batch server.
//!
//! The server records every batch and the headers it arrived with, and
//! answers through a per-test handler that sees the batch and its index.

#![allow(dead_code)]

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{HeaderMap, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use rpcmux_client::{ClientOptions, RpcClient};
use rpcmux_common::protocol::{JsonRpcRequest, JsonRpcResponse};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// Chain id that test clients route to the mock server
pub const TEST_CHAIN_ID: u64 = 31337;

/// What the mock server sends back for one batch.
pub enum Reply {
    Envelopes(Vec<JsonRpcResponse>),
    Raw(StatusCode, String),
    Delayed(Duration, Box<Reply>),
}

type Handler = Arc<dyn Fn(&[JsonRpcRequest], usize) -> Reply + Send + Sync>;

pub struct MockRpcServer {
    addr: String,
    batches: Arc<Mutex<Vec<Vec<JsonRpcRequest>>>>,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockRpcServer {
    /// Starts a server on a random port with the given handler.
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&[JsonRpcRequest], usize) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handler: Handler = Arc::new(handler);
        let batches = Arc::new(Mutex::new(Vec::new()));
        let headers = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();

        let batches_clone = batches.clone();
        let headers_clone = headers.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { continue };
                        let io = TokioIo::new(stream);
                        let handler = handler.clone();
                        let batches = batches_clone.clone();
                        let headers = headers_clone.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                serve(req, handler.clone(), batches.clone(), headers.clone())
                            });
                            let _ = http1::Builder::new().serve_connection(io, service).await;
                        });
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        Self {
            addr,
            batches,
            headers,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Server answering every call with its params as the result.
    pub async fn echo() -> Self {
        Self::start(|batch, _| Reply::Envelopes(echo_params(batch))).await
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Client whose `TEST_CHAIN_ID` endpoint is this server.
    pub fn client(&self, rpc_timeout: Option<Duration>) -> RpcClient {
        self.client_with(ClientOptions {
            client_id: Some("test-client-id".into()),
            ..Default::default()
        }, rpc_timeout)
    }

    pub fn client_with(&self, mut options: ClientOptions, rpc_timeout: Option<Duration>) -> RpcClient {
        options.rpc_overrides.insert(TEST_CHAIN_ID, self.url());
        options.timeouts.rpc = rpc_timeout;
        RpcClient::new(options).unwrap()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(|b| b.len()).collect()
    }

    pub fn batches(&self) -> Vec<Vec<JsonRpcRequest>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn headers(&self) -> Vec<HeaderMap> {
        self.headers.lock().unwrap().clone()
    }
}

impl Drop for MockRpcServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Answers every request with its params array.
pub fn echo_params(batch: &[JsonRpcRequest]) -> Vec<JsonRpcResponse> {
    batch
        .iter()
        .map(|r| JsonRpcResponse::success(r.id, Value::Array(r.params.clone())))
        .collect()
}

async fn serve(
    req: Request<Incoming>,
    handler: Handler,
    batches: Arc<Mutex<Vec<Vec<JsonRpcRequest>>>>,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let request_headers = req.headers().clone();
    let body = req.into_body().collect().await?.to_bytes();
    let batch: Vec<JsonRpcRequest> = serde_json::from_slice(&body).unwrap();

    let index = {
        let mut batches = batches.lock().unwrap();
        batches.push(batch.clone());
        batches.len() - 1
    };
    headers.lock().unwrap().push(request_headers);

    let mut reply = handler(&batch, index);
    loop {
        match reply {
            Reply::Delayed(delay, inner) => {
                tokio::time::sleep(delay).await;
                reply = *inner;
            }
            Reply::Envelopes(envelopes) => {
                return Ok(response(StatusCode::OK, serde_json::to_vec(&envelopes).unwrap()));
            }
            Reply::Raw(status, body) => {
                return Ok(response(status, body.into_bytes()));
            }
        }
    }
}

fn response(status: StatusCode, body: Vec<u8>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        // No pooled connections outlive the runtime of the client that made them
        .header("Connection", "close")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
