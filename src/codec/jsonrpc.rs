//! JSON-RPC 2.0 codec for A2A protocol
//!
//! Requests arrive as JSON-RPC 2.0 envelopes. The `id` is carried as an opaque
//! JSON value so it is echoed back exactly as the client sent it.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    codec::Codec,
    protocol::error::{A2AError, RpcError},
};

/// JSON-RPC protocol version emitted and assumed when absent
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    /// Build a request envelope with a fresh id
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Value::String(Uuid::new_v4().to_string()),
            method: method.into(),
            params,
        }
    }

    /// Build an envelope from an already-parsed JSON object
    ///
    /// Missing `jsonrpc` defaults to `"2.0"`, a missing `id` is synthesized, a
    /// missing `method` is left empty (and rejected later by routing) and missing
    /// `params` become an empty object.
    fn from_object(mut object: Map<String, Value>) -> Self {
        let jsonrpc = object
            .remove("jsonrpc")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| JSONRPC_VERSION.to_string());
        let id = object
            .remove("id")
            .unwrap_or_else(|| Value::String(Uuid::new_v4().to_string()));
        let method = object
            .remove("method")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let params = object
            .remove("params")
            .unwrap_or_else(|| Value::Object(Map::new()));

        Self {
            jsonrpc,
            id,
            method,
            params,
        }
    }
}

/// JSON-RPC 2.0 response envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    /// A success envelope carrying `result`
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// An error envelope for `error`
    pub fn error(id: Value, error: &A2AError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error.to_rpc_error()),
        }
    }

    /// Check if this envelope carries an error
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// JSON-RPC 2.0 codec
#[derive(Debug, Clone, Default)]
pub struct JsonRpcCodec;

impl JsonRpcCodec {
    /// Create a new JSON-RPC codec
    pub fn new() -> Self {
        Self
    }

    /// Encode a success response
    pub fn encode_success(&self, id: Value, result: Value) -> Result<Bytes, A2AError> {
        self.encode_response(&JsonRpcResponse::success(id, result))
    }

    /// Encode an error response
    pub fn encode_error(&self, id: Value, error: &A2AError) -> Result<Bytes, A2AError> {
        self.encode_response(&JsonRpcResponse::error(id, error))
    }
}

impl Codec for JsonRpcCodec {
    fn decode_request(&self, body: &[u8]) -> Result<JsonRpcRequest, A2AError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| A2AError::Parse(e.to_string()))?;

        match value {
            Value::Object(object) => Ok(JsonRpcRequest::from_object(object)),
            _ => Err(A2AError::Parse("envelope must be a JSON object".into())),
        }
    }

    fn encode_request(&self, request: &JsonRpcRequest) -> Result<Bytes, A2AError> {
        Ok(Bytes::from(serde_json::to_vec(request)?))
    }

    fn encode_response(&self, response: &JsonRpcResponse) -> Result<Bytes, A2AError> {
        Ok(Bytes::from(serde_json::to_vec(response)?))
    }

    fn content_type(&self) -> &str {
        "application/json"
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_request() {
        let codec = JsonRpcCodec::new();
        let body = br#"{"jsonrpc":"2.0","id":7,"method":"message/send","params":{"message":{}}}"#;

        let request = codec.decode_request(body).unwrap();
        assert_eq!(request.jsonrpc, "2.0");
        assert_eq!(request.id, json!(7));
        assert_eq!(request.method, "message/send");
        assert!(request.params["message"].is_object());
    }

    #[test]
    fn test_decode_invalid_json() {
        let codec = JsonRpcCodec::new();
        let err = codec.decode_request(br#"{"invalid": json}"#).unwrap_err();
        assert_eq!(err.code(), -32700);
        assert_eq!(err.to_string(), "parse error");
    }

    #[test]
    fn test_decode_non_object() {
        let codec = JsonRpcCodec::new();
        let err = codec.decode_request(b"[1,2,3]").unwrap_err();
        assert_eq!(err.code(), -32700);
    }

    #[test]
    fn test_defaults_when_absent() {
        let codec = JsonRpcCodec::new();
        let request = codec.decode_request(br#"{"method":"task/get"}"#).unwrap();

        assert_eq!(request.jsonrpc, "2.0");
        assert!(request.id.is_string());
        assert!(Uuid::parse_str(request.id.as_str().unwrap()).is_ok());
        assert_eq!(request.params, json!({}));
    }

    #[test]
    fn test_null_id_is_kept() {
        let codec = JsonRpcCodec::new();
        let request = codec
            .decode_request(br#"{"jsonrpc":"2.0","id":null,"method":"x"}"#)
            .unwrap();
        assert_eq!(request.id, Value::Null);
    }

    #[test]
    fn test_id_round_trips() {
        let codec = JsonRpcCodec::new();
        for id in [json!("req-abc"), json!(42), json!(-3), json!(1.5), Value::Null] {
            let body = serde_json::to_vec(&json!({"jsonrpc": "2.0", "id": id, "method": "m"}))
                .unwrap();
            let request = codec.decode_request(&body).unwrap();
            let encoded = codec
                .encode_error(
                    request.id.clone(),
                    &A2AError::MethodNotFound { method: "m".into() },
                )
                .unwrap();
            let response: Value = serde_json::from_slice(&encoded).unwrap();
            assert_eq!(response["id"], id);
        }
    }

    #[test]
    fn test_request_re_encoding_preserves_shape() {
        let codec = JsonRpcCodec::new();
        let original = json!({
            "jsonrpc": "2.0",
            "id": "abc",
            "method": "message/send",
            "params": {"message": {"role": "user", "parts": [{"text": "hi"}]}, "configuration": {"blocking": true}}
        });
        let request = codec
            .decode_request(&serde_json::to_vec(&original).unwrap())
            .unwrap();
        let encoded = codec.encode_request(&request).unwrap();
        let round_tripped: Value = serde_json::from_slice(&encoded).unwrap();

        assert_eq!(round_tripped, original);
    }

    #[test]
    fn test_encode_success_response() {
        let codec = JsonRpcCodec::new();
        let bytes = codec
            .encode_success(json!("a"), json!({"kind": "task"}))
            .unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], "a");
        assert_eq!(json["result"]["kind"], "task");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_encode_error_response() {
        let codec = JsonRpcCodec::new();
        let err = A2AError::calendar_service("list_events", "primary", "upstream 500");
        let bytes = codec.encode_error(json!(1), &err).unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["error"]["code"], -32004);
        assert_eq!(json["error"]["data"]["operation"], "list_events");
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_content_type() {
        let codec = JsonRpcCodec::new();
        assert_eq!(codec.content_type(), "application/json");
    }
}
