//! JSON-RPC 2.0 envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use migration_verifier_types::RpcError;

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Vec<Value>,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Split a response body into its result or its error payload.
///
/// `{"result": null}` is a legitimate null result and is returned as
/// `Value::Null`; a body carrying neither member is a transport-level failure.
pub fn parse_response(method: &str, body: Value) -> Result<Value, RpcError> {
    let Value::Object(mut map) = body else {
        return Err(RpcError::transport(
            method,
            format!("response is not a JSON object: {}", body),
        ));
    };

    if let Some(err) = map.remove("error").filter(|e| !e.is_null()) {
        return match serde_json::from_value::<ErrorObject>(err.clone()) {
            Ok(e) => Err(RpcError::remote(method, e.code, e.message, e.data)),
            Err(_) => Err(RpcError::transport(
                method,
                format!("unrecognized error payload: {}", err),
            )),
        };
    }

    map.remove("result").ok_or_else(|| {
        RpcError::transport(method, "response carries neither result nor error")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_envelope() {
        let req = JsonRpcRequest::new(7, "eth_blockNumber", vec![]);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"jsonrpc": "2.0", "id": 7, "method": "eth_blockNumber", "params": []})
        );
    }

    #[test]
    fn test_null_result_is_not_an_error() {
        let v = parse_response("gw_state_changes_by_block", json!({"jsonrpc": "2.0", "id": 1, "result": null}))
            .unwrap();
        assert!(v.is_null());
    }

    #[test]
    fn test_error_payload_is_verbatim() {
        let err = parse_response(
            "debug_call",
            json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32601, "message": "Method not found", "data": "debug_call"}}),
        )
        .unwrap_err();
        assert_eq!(err.code, Some(-32601));
        assert_eq!(err.message, "Method not found");
        assert_eq!(err.data, Some(json!("debug_call")));
        assert!(err.is_method_not_found());
    }

    #[test]
    fn test_missing_result_is_transport_error() {
        let err = parse_response("eth_call", json!({"jsonrpc": "2.0", "id": 1})).unwrap_err();
        assert_eq!(err.code, None);
        let err = parse_response("eth_call", json!([1, 2])).unwrap_err();
        assert!(err.message.contains("not a JSON object"));
    }
}
