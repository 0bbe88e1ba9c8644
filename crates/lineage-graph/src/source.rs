//! Collaborator abstraction over the language server.

use lineage_rpc::LspClient;
use lsp_types::{
    CallHierarchyIncomingCall, CallHierarchyItem, DocumentSymbolResponse, Position, Uri,
};

use crate::error::GraphError;

/// The three language server operations a lineage needs.
///
/// Methods take `&self` so one source can serve traversals running on
/// several threads. `Ok(None)` means the server had nothing to report.
pub trait CallHierarchySource {
    /// Lists the symbols declared in a document.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    fn document_symbols(&self, uri: &Uri) -> Result<Option<DocumentSymbolResponse>, GraphError>;

    /// Resolves the call-hierarchy items at a position.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    fn prepare_call_hierarchy(
        &self,
        uri: &Uri,
        position: Position,
    ) -> Result<Option<Vec<CallHierarchyItem>>, GraphError>;

    /// Lists the callers of an item.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    fn incoming_calls(
        &self,
        item: &CallHierarchyItem,
    ) -> Result<Option<Vec<CallHierarchyIncomingCall>>, GraphError>;
}

impl CallHierarchySource for LspClient {
    fn document_symbols(&self, uri: &Uri) -> Result<Option<DocumentSymbolResponse>, GraphError> {
        Ok(Self::document_symbols(self, uri.clone())?)
    }

    fn prepare_call_hierarchy(
        &self,
        uri: &Uri,
        position: Position,
    ) -> Result<Option<Vec<CallHierarchyItem>>, GraphError> {
        Ok(Self::prepare_call_hierarchy(self, uri.clone(), position)?)
    }

    fn incoming_calls(
        &self,
        item: &CallHierarchyItem,
    ) -> Result<Option<Vec<CallHierarchyIncomingCall>>, GraphError> {
        Ok(Self::incoming_calls(self, item.clone())?)
    }
}

impl<S: CallHierarchySource + ?Sized> CallHierarchySource for &S {
    fn document_symbols(&self, uri: &Uri) -> Result<Option<DocumentSymbolResponse>, GraphError> {
        (**self).document_symbols(uri)
    }

    fn prepare_call_hierarchy(
        &self,
        uri: &Uri,
        position: Position,
    ) -> Result<Option<Vec<CallHierarchyItem>>, GraphError> {
        (**self).prepare_call_hierarchy(uri, position)
    }

    fn incoming_calls(
        &self,
        item: &CallHierarchyItem,
    ) -> Result<Option<Vec<CallHierarchyIncomingCall>>, GraphError> {
        (**self).incoming_calls(item)
    }
}
