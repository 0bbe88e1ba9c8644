//! JSON-RPC transport and LSP client for code lineage.
//!
//! The crate talks to a language server over a single duplex byte stream:
//!
//! - [`FrameDecoder`] and [`encode_frame`] implement `Content-Length` framing.
//! - [`Message`] is the validated inbound message model.
//! - [`Endpoint`] multiplexes concurrent requests over one stream; each
//!   request yields a [`PendingRequest`] that completes independently of the
//!   order responses arrive in.
//! - [`LspClient`] wraps an endpoint with typed LSP requests.
//! - [`ServerProcess`] starts a language server and connects an endpoint to
//!   its stdio.

mod client;
mod endpoint;
mod error;
mod framing;
mod jsonrpc;
mod process;

pub use client::LspClient;
pub use endpoint::{Endpoint, PendingRequest};
pub use error::{FramingError, RpcError};
pub use framing::{FrameDecoder, MAX_BODY_BYTES, MAX_HEADER_BYTES, encode_frame};
pub use jsonrpc::{
    JSONRPC_VERSION, METHOD_NOT_FOUND, Message, Notification, Request, RequestId, Response,
    ResponseError, ServerRequest,
};
pub use process::{ServerCommand, ServerProcess};

#[cfg(test)]
mod tests;
