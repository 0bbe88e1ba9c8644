//! Typed LSP client for the handful of requests lineage needs.

use std::time::Duration;

use lsp_types::notification::{Exit, Initialized, Notification};
use lsp_types::request::{
    CallHierarchyIncomingCalls, CallHierarchyPrepare, DocumentSymbolRequest, Initialize, Request,
    Shutdown,
};
use lsp_types::{
    CallHierarchyClientCapabilities, CallHierarchyIncomingCall, CallHierarchyIncomingCallsParams,
    CallHierarchyItem, CallHierarchyPrepareParams, ClientCapabilities, ClientInfo,
    DocumentSymbolClientCapabilities, DocumentSymbolParams, DocumentSymbolResponse,
    InitializeParams, InitializeResult, InitializedParams, PartialResultParams, Position,
    TextDocumentClientCapabilities, TextDocumentIdentifier, TextDocumentPositionParams, Uri,
    WorkDoneProgressParams, WorkspaceFolder,
};
use serde_json::Value;
use tracing::debug;

use crate::endpoint::{Endpoint, PendingRequest};
use crate::error::RpcError;

/// Log target for client operations.
const CLIENT_TARGET: &str = "lineage_rpc::client";

/// Name reported to the server during initialisation.
const CLIENT_NAME: &str = "code-lineage";

/// LSP client over a multiplexing [`Endpoint`].
///
/// All methods take `&self`; the client can be shared between threads and
/// every thread's requests are in flight concurrently.
#[derive(Debug)]
pub struct LspClient {
    endpoint: Endpoint,
    timeout: Option<Duration>,
}

impl LspClient {
    /// Wraps an endpoint; requests wait indefinitely.
    #[must_use]
    pub const fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            timeout: None,
        }
    }

    /// Sets a per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The underlying endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Sends a typed request and waits for its result.
    ///
    /// # Errors
    ///
    /// Propagates transport, protocol, and decoding errors.
    pub fn request<R>(&self, params: R::Params) -> Result<R::Result, RpcError>
    where
        R: Request,
    {
        let pending = self.endpoint.request(R::METHOD, params)?;
        let value = self.wait(pending)?;
        serde_json::from_value(value).map_err(RpcError::from)
    }

    /// Sends a typed notification.
    ///
    /// # Errors
    ///
    /// Propagates transport and encoding errors.
    pub fn notify<N>(&self, params: N::Params) -> Result<(), RpcError>
    where
        N: Notification,
    {
        self.endpoint.notify(N::METHOD, params)
    }

    fn wait(&self, pending: PendingRequest) -> Result<Value, RpcError> {
        match self.timeout {
            Some(timeout) => pending.wait_timeout(timeout),
            None => pending.wait(),
        }
    }

    /// Runs the `initialize` handshake for the given workspace root.
    ///
    /// # Errors
    ///
    /// Propagates transport and protocol errors.
    pub fn initialize(&self, root: Option<Uri>) -> Result<InitializeResult, RpcError> {
        let workspace_folders = root.map(|uri| {
            vec![WorkspaceFolder {
                name: workspace_name(&uri),
                uri,
            }]
        });
        let params = InitializeParams {
            process_id: Some(std::process::id()),
            capabilities: client_capabilities(),
            client_info: Some(ClientInfo {
                name: CLIENT_NAME.to_owned(),
                version: Some(env!("CARGO_PKG_VERSION").to_owned()),
            }),
            workspace_folders,
            ..InitializeParams::default()
        };

        let result = self.request::<Initialize>(params)?;
        debug!(
            target: CLIENT_TARGET,
            server = ?result.server_info.as_ref().map(|info| info.name.as_str()),
            "language server initialised"
        );
        Ok(result)
    }

    /// Sends the `initialized` notification.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub fn initialized(&self) -> Result<(), RpcError> {
        self.notify::<Initialized>(InitializedParams {})
    }

    /// Lists the symbols declared in a document.
    ///
    /// # Errors
    ///
    /// Propagates transport, protocol, and decoding errors.
    pub fn document_symbols(&self, uri: Uri) -> Result<Option<DocumentSymbolResponse>, RpcError> {
        self.request::<DocumentSymbolRequest>(DocumentSymbolParams {
            text_document: TextDocumentIdentifier { uri },
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        })
    }

    /// Resolves the call-hierarchy item at a position.
    ///
    /// # Errors
    ///
    /// Propagates transport, protocol, and decoding errors.
    pub fn prepare_call_hierarchy(
        &self,
        uri: Uri,
        position: Position,
    ) -> Result<Option<Vec<CallHierarchyItem>>, RpcError> {
        self.request::<CallHierarchyPrepare>(CallHierarchyPrepareParams {
            text_document_position_params: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri },
                position,
            },
            work_done_progress_params: WorkDoneProgressParams::default(),
        })
    }

    /// Lists the callers of a call-hierarchy item.
    ///
    /// # Errors
    ///
    /// Propagates transport, protocol, and decoding errors.
    pub fn incoming_calls(
        &self,
        item: CallHierarchyItem,
    ) -> Result<Option<Vec<CallHierarchyIncomingCall>>, RpcError> {
        self.request::<CallHierarchyIncomingCalls>(CallHierarchyIncomingCallsParams {
            item,
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        })
    }

    /// Sends `shutdown` followed by `exit`.
    ///
    /// # Errors
    ///
    /// Returns the error of the `shutdown` request; a failed `exit` is only
    /// logged since the server may already be gone.
    pub fn shutdown(&self) -> Result<(), RpcError> {
        self.request::<Shutdown>(())?;
        if let Err(error) = self.notify::<Exit>(()) {
            debug!(target: CLIENT_TARGET, %error, "exit notification failed");
        }
        Ok(())
    }
}

fn client_capabilities() -> ClientCapabilities {
    ClientCapabilities {
        text_document: Some(TextDocumentClientCapabilities {
            document_symbol: Some(DocumentSymbolClientCapabilities {
                hierarchical_document_symbol_support: Some(true),
                ..DocumentSymbolClientCapabilities::default()
            }),
            call_hierarchy: Some(CallHierarchyClientCapabilities {
                dynamic_registration: Some(false),
            }),
            ..TextDocumentClientCapabilities::default()
        }),
        ..ClientCapabilities::default()
    }
}

fn workspace_name(uri: &Uri) -> String {
    uri.as_str()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_owned()
}
