//! Error types for the transport and the LSP client.

use std::io;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::jsonrpc::ResponseError;

/// Errors raised while splitting the inbound byte stream into frames.
///
/// A framing error only affects the offending header block; the decoder
/// resynchronises on the bytes that follow it.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The header block carried no `Content-Length` header.
    #[error("missing Content-Length header")]
    MissingContentLength,

    /// The `Content-Length` value was not a byte count.
    #[error("invalid Content-Length value '{0}'")]
    InvalidContentLength(String),

    /// The header block is not valid UTF-8.
    #[error("header block is not valid UTF-8")]
    NonUtf8Header,

    /// The declared body is larger than the decoder accepts.
    #[error("Content-Length {length} exceeds the {limit} byte limit")]
    BodyTooLarge {
        /// Declared body length.
        length: usize,
        /// Maximum accepted body length.
        limit: usize,
    },

    /// No header terminator was found within the allowed size.
    #[error("header block exceeds {limit} bytes without a terminator")]
    HeaderTooLarge {
        /// Maximum accepted header block size.
        limit: usize,
    },
}

/// Errors surfaced to callers of the endpoint and the LSP client.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Reading from or writing to the stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization or deserialization failed.
    #[error("JSON codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The inbound stream could not be split into frames.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// A frame decoded to JSON that is not a JSON-RPC 2.0 message.
    #[error("invalid JSON-RPC message: {0}")]
    InvalidMessage(String),

    /// The peer answered the request with an error object.
    #[error("server returned error: {message} (code: {code})")]
    Server {
        /// The JSON-RPC error code.
        code: i64,
        /// The error message from the server.
        message: String,
        /// Optional structured details.
        data: Option<Value>,
    },

    /// The stream closed; the peer is unreachable.
    #[error("connection to the language server is closed")]
    Closed,

    /// No response arrived within the allotted time.
    #[error("request '{method}' timed out after {timeout:?}")]
    Timeout {
        /// Method of the request that timed out.
        method: String,
        /// How long the caller waited.
        timeout: Duration,
    },

    /// The language server process could not be started.
    #[error("failed to spawn language server '{command}': {source}")]
    Spawn {
        /// The command that failed to start.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl RpcError {
    /// Creates a server error from a JSON-RPC error object.
    #[must_use]
    pub fn from_response_error(error: ResponseError) -> Self {
        Self::Server {
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }

    /// Whether the error means the peer can no longer be reached.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
