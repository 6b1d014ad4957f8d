//! # JSON-RPC Messages
//!
//! The three message shapes that travel over the channel:
//!
//! - Request `{jsonrpc, id, method, params}`
//! - Response `{jsonrpc, id, result}` or `{jsonrpc, id, error:{code, message, data?}}`
//! - Notification `{jsonrpc, method, params}` (no id, never answered)

use crate::errors::ProtocolError;
use crate::JSONRPC_VERSION;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Standard JSON-RPC 2.0 error codes plus the server-range codes we use.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Capability call received before the `initialize` handshake.
    pub const SERVER_NOT_INITIALIZED: i64 = -32002;
}

/// Request identifier.
///
/// The client only ever allocates numeric ids; string ids are accepted so the
/// server can echo whatever a foreign client sends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(u64),
    String(String),
}

impl RequestId {
    /// Numeric value, if this is a numeric id.
    #[must_use]
    pub fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(_) => None,
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self::Number(id)
    }
}

/// A call that expects exactly one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl Request {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

/// A one-way message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// Error object carried by a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured data to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(details: impl fmt::Display) -> Self {
        Self::new(codes::PARSE_ERROR, format!("Parse error: {}", details))
    }

    pub fn invalid_request(details: impl fmt::Display) -> Self {
        Self::new(codes::INVALID_REQUEST, format!("Invalid request: {}", details))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(codes::METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    pub fn invalid_params(details: impl fmt::Display) -> Self {
        Self::new(codes::INVALID_PARAMS, details.to_string())
    }

    pub fn internal(details: impl fmt::Display) -> Self {
        Self::new(codes::INTERNAL_ERROR, format!("Internal error: {}", details))
    }

    pub fn not_initialized() -> Self {
        Self::new(
            codes::SERVER_NOT_INITIALIZED,
            "Server not initialized: send initialize first",
        )
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: RequestId, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Split into the payload or the error. A missing (or `null`) result on a
    /// response without an error is a successful `null`.
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Any message that can appear on the channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Message {
    Request(Request),
    Response(Response),
    Notification(Notification),
}

impl Message {
    /// Classify a parsed JSON document.
    ///
    /// `method` + `id` is a request, `method` alone a notification, and `id`
    /// with `result` or `error` a response. Anything else is malformed.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let Some(object) = value.as_object() else {
            return Err(ProtocolError::MalformedEnvelope(
                "message is not a JSON object".to_string(),
            ));
        };

        let has_method = object.get("method").is_some_and(Value::is_string);
        let has_id = object.get("id").is_some_and(|id| !id.is_null());
        let has_outcome = object.contains_key("result") || object.contains_key("error");

        let parsed = if has_method && has_id {
            serde_json::from_value(value).map(Message::Request)
        } else if has_method {
            serde_json::from_value(value).map(Message::Notification)
        } else if has_id && has_outcome {
            serde_json::from_value(value).map(Message::Response)
        } else {
            return Err(ProtocolError::MalformedEnvelope(
                "expected a request, response or notification".to_string(),
            ));
        };

        parsed.map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))
    }

    /// Method name for requests and notifications.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) => Some(&r.method),
            Self::Notification(n) => Some(&n.method),
            Self::Response(_) => None,
        }
    }
}

impl From<Request> for Message {
    fn from(request: Request) -> Self {
        Self::Request(request)
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<Notification> for Message {
    fn from(notification: Notification) -> Self {
        Self::Notification(notification)
    }
}
