//! JSON-RPC 2.0 message model and classification
//!
//! Turns decoded JSON documents into [`Request`], [`Response`] or
//! [`Notification`] values. All three serialize to their JSON-RPC 2.0 wire
//! form with the `jsonrpc` member added.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::lsp::error::ProtocolError;
use crate::lsp::jsonrpc_utils::JSONRPC_VERSION;

// ============================================================================
// JSON-RPC Types
// ============================================================================

/// Request identifier: integer for requests this client issues, integer or
/// string for requests the server issues
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Integer(i64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Integer(id) => write!(f, "{id}"),
            RequestId::String(id) => write!(f, "{id:?}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Integer(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::String(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        RequestId::String(id)
    }
}

/// JSON-RPC 2.0 request message
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: RequestId,
    pub method: String,
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 notification message (no response expected)
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub method: String,
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response message
///
/// Exactly one of result or error is present on the wire, so the payload is a
/// `Result`. A `null` result (as `shutdown` returns) is `Ok(Value::Null)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: RequestId,
    pub payload: Result<Value, ResponseError>,
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    /// Error code
    pub code: i32,

    /// Error message
    pub message: String,

    /// Optional additional data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Any JSON-RPC message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Response(Response),
    Notification(Notification),
}

// ============================================================================
// Wire Format
// ============================================================================

#[derive(Serialize)]
struct WireRequest<'a> {
    jsonrpc: &'static str,
    id: &'a RequestId,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a Value>,
}

#[derive(Serialize)]
struct WireNotification<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a Value>,
}

/// Exactly one of `result` and `error` is set; a `null` result stays on the wire
#[derive(Serialize)]
struct WireResponse<'a> {
    jsonrpc: &'static str,
    id: &'a RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ResponseError>,
}

impl Request {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

impl Serialize for Request {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireRequest {
            jsonrpc: JSONRPC_VERSION,
            id: &self.id,
            method: &self.method,
            params: self.params.as_ref(),
        }
        .serialize(serializer)
    }
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

impl Serialize for Notification {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireNotification {
            jsonrpc: JSONRPC_VERSION,
            method: &self.method,
            params: self.params.as_ref(),
        }
        .serialize(serializer)
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireResponse {
            jsonrpc: JSONRPC_VERSION,
            id: &self.id,
            result: self.payload.as_ref().ok(),
            error: self.payload.as_ref().err(),
        }
        .serialize(serializer)
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Classify a decoded JSON document.
///
/// A `method` member makes it a call: a [`Request`] with an `id`, a
/// [`Notification`] without. An `id` with no `method` makes it a
/// [`Response`], which must carry exactly one of `result` and `error`.
/// A `null` `params` or `error` member is treated as absent.
pub fn classify(value: Value) -> Result<Message, ProtocolError> {
    let mut object = match value {
        Value::Object(object) => object,
        other => {
            return Err(ProtocolError::malformed(format!(
                "message is not a JSON object: {other}"
            )));
        }
    };

    let id = object.remove("id").map(parse_id).transpose()?;

    match (object.remove("method"), id) {
        (Some(method), id) => {
            let method = match method {
                Value::String(method) => method,
                other => {
                    return Err(ProtocolError::malformed(format!(
                        "method must be a string, got {other}"
                    )));
                }
            };
            let params = object.remove("params").filter(|params| !params.is_null());

            Ok(match id {
                Some(id) => Message::Request(Request { id, method, params }),
                None => Message::Notification(Notification { method, params }),
            })
        }
        (None, Some(id)) => {
            let result = object.remove("result");
            let error = object.remove("error").filter(|error| !error.is_null());

            let payload = match (result, error) {
                (Some(result), None) => Ok(result),
                (None, Some(error)) => Err(serde_json::from_value::<ResponseError>(error)
                    .map_err(|e| {
                        ProtocolError::malformed(format!("response {id} has invalid error: {e}"))
                    })?),
                (Some(_), Some(_)) => {
                    return Err(ProtocolError::malformed(format!(
                        "response {id} has both result and error"
                    )));
                }
                (None, None) => {
                    return Err(ProtocolError::malformed(format!(
                        "response {id} has neither result nor error"
                    )));
                }
            };

            Ok(Message::Response(Response { id, payload }))
        }
        (None, None) => Err(ProtocolError::malformed(
            "message has neither id nor method",
        )),
    }
}

fn parse_id(id: Value) -> Result<RequestId, ProtocolError> {
    match id {
        Value::Number(number) => number.as_i64().map(RequestId::Integer).ok_or_else(|| {
            ProtocolError::malformed(format!("request id must be an integer, got {number}"))
        }),
        Value::String(id) => Ok(RequestId::String(id)),
        other => Err(ProtocolError::malformed(format!(
            "request id must be an integer or string, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn malformed(value: Value) -> String {
        match classify(value) {
            Err(ProtocolError::Malformed(reason)) => reason,
            other => panic!("Expected Malformed error, got: {other:?}"),
        }
    }

    #[test]
    fn test_classify_request() {
        let message = classify(json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "window/showMessageRequest",
            "params": {"type": 1, "message": "pick"}
        }))
        .unwrap();

        assert_eq!(
            message,
            Message::Request(Request::new(
                7i64,
                "window/showMessageRequest",
                Some(json!({"type": 1, "message": "pick"}))
            ))
        );
    }

    #[test]
    fn test_classify_notification_with_string_method_and_no_params() {
        let message = classify(json!({"jsonrpc": "2.0", "method": "exit"})).unwrap();
        assert_eq!(message, Message::Notification(Notification::new("exit", None)));
    }

    #[test]
    fn test_classify_null_params_is_absent() {
        let message = classify(json!({"method": "exit", "params": null})).unwrap();
        assert_eq!(message, Message::Notification(Notification::new("exit", None)));
    }

    #[test]
    fn test_classify_response_with_result() {
        let message = classify(json!({"jsonrpc": "2.0", "id": 0, "result": {"capabilities": {}}})).unwrap();
        assert_eq!(
            message,
            Message::Response(Response {
                id: RequestId::Integer(0),
                payload: Ok(json!({"capabilities": {}})),
            })
        );
    }

    #[test]
    fn test_classify_response_with_null_result() {
        let message = classify(json!({"jsonrpc": "2.0", "id": "abc", "result": null})).unwrap();
        assert_eq!(
            message,
            Message::Response(Response {
                id: RequestId::from("abc"),
                payload: Ok(Value::Null),
            })
        );
    }

    #[test]
    fn test_classify_response_with_error() {
        let message = classify(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "error": {"code": -32603, "message": "boom", "data": [1]}
        }))
        .unwrap();

        let Message::Response(response) = message else {
            panic!("Expected response");
        };
        assert!(response.payload.is_err());
        assert_eq!(
            response.payload,
            Err(ResponseError {
                code: -32603,
                message: "boom".to_string(),
                data: Some(json!([1])),
            })
        );
    }

    #[test]
    fn test_classify_rejects_non_object() {
        assert!(malformed(json!([1, 2])).contains("not a JSON object"));
    }

    #[test]
    fn test_classify_rejects_missing_id_and_method() {
        assert!(malformed(json!({"jsonrpc": "2.0", "result": 1})).contains("neither id nor method"));
    }

    #[test]
    fn test_classify_rejects_result_and_error() {
        let reason = malformed(json!({
            "id": 1,
            "result": {},
            "error": {"code": 1, "message": "x"}
        }));
        assert!(reason.contains("both result and error"));
    }

    #[test]
    fn test_classify_rejects_response_without_payload() {
        assert!(malformed(json!({"id": 1})).contains("neither result nor error"));
    }

    #[test]
    fn test_classify_rejects_bad_ids_and_methods() {
        malformed(json!({"id": null, "result": 1}));
        malformed(json!({"id": 1.5, "result": 1}));
        malformed(json!({"id": true, "method": "x"}));
        malformed(json!({"method": 42}));
        malformed(json!({"id": 1, "error": {"message": "no code"}}));
    }

    #[test]
    fn test_request_id_kinds_are_distinct() {
        assert_ne!(RequestId::Integer(0), RequestId::from("0"));
        assert_eq!(RequestId::Integer(0).to_string(), "0");
        assert_eq!(RequestId::from("0").to_string(), "\"0\"");
    }

    #[test]
    fn test_wire_shapes() {
        assert_eq!(
            serde_json::to_value(Request::new(0i64, "shutdown", None)).unwrap(),
            json!({"jsonrpc": "2.0", "id": 0, "method": "shutdown"})
        );
        assert_eq!(
            serde_json::to_value(Notification::new("initialized", Some(json!({})))).unwrap(),
            json!({"jsonrpc": "2.0", "method": "initialized", "params": {}})
        );
        assert_eq!(
            serde_json::to_value(Response {
                id: RequestId::from("s1"),
                payload: Ok(Value::Null),
            })
            .unwrap(),
            json!({"jsonrpc": "2.0", "id": "s1", "result": null})
        );
        assert_eq!(
            serde_json::to_value(Response {
                id: RequestId::Integer(4),
                payload: Err(ResponseError {
                    code: -32601,
                    message: "nope".to_string(),
                    data: None,
                }),
            })
            .unwrap(),
            json!({"jsonrpc": "2.0", "id": 4, "error": {"code": -32601, "message": "nope"}})
        );
    }
}
