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

//! Conversions between caller types and raw JSON-RPC payloads.

use rpcmux_common::protocol::error::{Result, RpcMuxError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Serializes call parameters into the positional array sent on the wire.
///
/// Anything serializing to a JSON array is accepted (`Vec`, slices, tuples);
/// `()` and `None` mean no parameters.
pub fn to_params<P: Serialize>(params: P) -> Result<Vec<Value>> {
    match serde_json::to_value(params) {
        Ok(Value::Array(values)) => Ok(values),
        Ok(Value::Null) => Ok(Vec::new()),
        Ok(other) => Err(RpcMuxError::InvalidArgument(format!(
            "params must serialize to a JSON array, got {}",
            type_name(&other)
        ))),
        Err(e) => Err(RpcMuxError::InvalidArgument(format!(
            "params could not be serialized: {}",
            e
        ))),
    }
}

/// Decodes a raw result into `T`.
pub fn decode_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| RpcMuxError::InvalidOperation(format!("Failed to decode RPC result: {}", e)))
}

/// Takes a raw result as text without JSON decoding.
///
/// String payloads are returned as-is, `null` as an empty string, anything
/// else as its JSON text.
pub fn decode_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Takes a raw `0x`-prefixed hex string result as bytes.
///
/// Quantities such as `0x1a3` have an odd digit count; they are read as if
/// left-padded with a `0`.
pub fn decode_bytes(value: Value) -> Result<Vec<u8>> {
    let text = match value {
        Value::String(s) => s,
        other => {
            return Err(RpcMuxError::InvalidOperation(format!(
                "expected a hex string result, got {}",
                type_name(&other)
            )))
        }
    };
    let digits = text.strip_prefix("0x").unwrap_or(&text);
    let decoded = if digits.len() % 2 == 1 {
        hex::decode(format!("0{}", digits))
    } else {
        hex::decode(digits)
    };
    decoded
        .map_err(|e| RpcMuxError::InvalidOperation(format!("Failed to decode hex result: {}", e)))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_params_from_tuple_and_vec() {
        assert_eq!(to_params(("0xabc", "latest")).unwrap(), vec![json!("0xabc"), json!("latest")]);
        assert_eq!(to_params(vec![1, 2]).unwrap(), vec![json!(1), json!(2)]);
        assert!(to_params(()).unwrap().is_empty());
    }

    #[test]
    fn test_object_params_rejected() {
        let err = to_params(json!({"to": "0xabc"})).unwrap_err();
        match err {
            RpcMuxError::InvalidArgument(msg) => assert!(msg.contains("an object")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_decode_struct() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Block {
            number: String,
        }
        let block: Block = decode_value(json!({"number": "0x10"})).unwrap();
        assert_eq!(block.number, "0x10");
    }

    #[test]
    fn test_decode_failure_is_invalid_operation() {
        let err = decode_value::<u64>(json!("not a number")).unwrap_err();
        assert!(matches!(err, RpcMuxError::InvalidOperation(_)));
    }

    #[test]
    fn test_decode_string_takes_raw_payload() {
        assert_eq!(decode_string(json!("0x1a")), "0x1a");
        assert_eq!(decode_string(Value::Null), "");
        assert_eq!(decode_string(json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_decode_bytes() {
        assert_eq!(decode_bytes(json!("0x0102ff")).unwrap(), vec![0x01, 0x02, 0xff]);
        assert_eq!(decode_bytes(json!("0x")).unwrap(), Vec::<u8>::new());
        assert_eq!(decode_bytes(json!("abcd")).unwrap(), vec![0xab, 0xcd]);
        assert_eq!(decode_bytes(json!("0x0")).unwrap(), vec![0x00]);
        assert_eq!(decode_bytes(json!("0x1a3")).unwrap(), vec![0x01, 0xa3]);
    }

    #[test]
    fn test_decode_bytes_rejects_bad_input() {
        assert!(matches!(decode_bytes(json!("0xzz")), Err(RpcMuxError::InvalidOperation(_))));
        assert!(matches!(decode_bytes(json!(12)), Err(RpcMuxError::InvalidOperation(_))));
    }
}
