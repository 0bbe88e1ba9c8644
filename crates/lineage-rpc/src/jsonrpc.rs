//! JSON-RPC 2.0 message model.
//!
//! Outbound messages are plain serializable structs. Inbound payloads are
//! validated once, at the transport boundary, into the closed [`Message`] sum
//! type so nothing past the reader thread handles untyped JSON shapes.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcError;

/// Protocol version carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// Error code returned for server-initiated requests we do not handle.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Identifier correlating a request with its response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric identifier; every request this crate sends uses one.
    Number(i64),
    /// String identifier, used by some servers for their own requests.
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::String(id) => f.write_str(id),
        }
    }
}

/// A JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Protocol version, always "2.0".
    pub jsonrpc: &'static str,
    /// Request identifier.
    pub id: i64,
    /// The method to invoke.
    pub method: String,
    /// Optional parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    /// Creates a request with the given identifier.
    #[must_use]
    pub fn new(id: i64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 notification (no response expected).
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    /// Protocol version, always "2.0".
    pub jsonrpc: &'static str,
    /// The method to invoke.
    pub method: String,
    /// Optional parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Notification {
    /// Creates a new notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Reply sent for server-initiated requests.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ErrorReply {
    pub(crate) jsonrpc: &'static str,
    pub(crate) id: RequestId,
    pub(crate) error: ResponseError,
}

impl ErrorReply {
    pub(crate) fn method_not_found(id: RequestId, method: &str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            error: ResponseError {
                code: METHOD_NOT_FOUND,
                message: format!("method '{method}' is not supported by this client"),
                data: None,
            },
        }
    }
}

/// A response to one of our requests.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Identifier of the request being answered.
    pub id: RequestId,
    /// The result, or the error object returned by the peer.
    pub outcome: Result<Value, ResponseError>,
}

/// A request initiated by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerRequest {
    /// Identifier chosen by the server.
    pub id: RequestId,
    /// Requested method.
    pub method: String,
    /// Optional parameters.
    pub params: Option<Value>,
}

/// Inbound message classified by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Carries an id and a result or error.
    Response(Response),
    /// Carries a method but no id.
    Notification {
        /// Notification method.
        method: String,
        /// Optional parameters.
        params: Option<Value>,
    },
    /// Carries both a method and an id.
    Request(ServerRequest),
}

#[derive(Deserialize)]
struct RawMessage {
    jsonrpc: Option<String>,
    #[serde(default)]
    id: Option<RequestId>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ResponseError>,
}

impl Message {
    /// Parses and validates a frame payload.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Codec`] when the payload is not JSON of the expected
    /// shape and [`RpcError::InvalidMessage`] when it is JSON but not a
    /// JSON-RPC 2.0 message.
    pub fn from_slice(payload: &[u8]) -> Result<Self, RpcError> {
        let raw: RawMessage = serde_json::from_slice(payload)?;
        if raw.jsonrpc.as_deref() != Some(JSONRPC_VERSION) {
            return Err(RpcError::InvalidMessage(format!(
                "unsupported jsonrpc version {:?}",
                raw.jsonrpc
            )));
        }

        match (raw.id, raw.method) {
            (Some(id), Some(method)) => Ok(Self::Request(ServerRequest {
                id,
                method,
                params: raw.params,
            })),
            (None, Some(method)) => Ok(Self::Notification {
                method,
                params: raw.params,
            }),
            (Some(id), None) => {
                let outcome = match raw.error {
                    Some(error) => Err(error),
                    // A `null` result deserializes to `None`; both mean null.
                    None => Ok(raw.result.unwrap_or(Value::Null)),
                };
                Ok(Self::Response(Response { id, outcome }))
            }
            (None, None) => Err(RpcError::InvalidMessage(
                "message has neither an id nor a method".to_owned(),
            )),
        }
    }
}
