use super::*;
use serde_json::{json, Value};

#[test]
fn test_batch_serializes_as_array_in_order() {
    let batch = vec![
        JsonRpcRequest::new(1, "eth_chainId", vec![]),
        JsonRpcRequest::new(2, "eth_blockNumber", vec![]),
    ];
    let value = serde_json::to_value(&batch).unwrap();
    let items = value.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], json!(1));
    assert_eq!(items[1]["method"], json!("eth_blockNumber"));
}

#[test]
fn test_batch_response_in_any_order() {
    let body = r#"[
        {"jsonrpc":"2.0","id":2,"result":"0x2"},
        {"jsonrpc":"2.0","id":1,"result":"0x1"}
    ]"#;
    let envelopes: Vec<JsonRpcResponse> = serde_json::from_str(body).unwrap();
    let ids: Vec<u64> = envelopes.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![2, 1]);
}

#[test]
fn test_null_body_parses_to_none() {
    let parsed: Option<Vec<JsonRpcResponse>> = serde_json::from_str("null").unwrap();
    assert!(parsed.is_none());
}

#[test]
fn test_mixed_batch_outcomes() {
    let body = r#"[
        {"jsonrpc":"2.0","id":1,"result":{"number":"0x10"}},
        {"jsonrpc":"2.0","id":2,"error":{"code":-32602,"message":"invalid params","data":null}}
    ]"#;
    let envelopes: Vec<JsonRpcResponse> = serde_json::from_str(body).unwrap();
    let outcomes: Vec<Result<Value>> = envelopes.into_iter().map(|e| e.into_result()).collect();
    assert_eq!(outcomes[0].as_ref().unwrap(), &json!({"number": "0x10"}));
    assert!(matches!(outcomes[1], Err(RpcMuxError::Rpc { id: 2, .. })));
}
