//! Symbol identity: the cache and deduplication key.

use std::fmt;

use lsp_types::CallHierarchyItem;

/// A callable symbol, identified by the URI of its document and its name.
///
/// Two identities are equal only when both fields match exactly; overloads
/// and signatures are not distinguished.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolIdentity {
    uri: String,
    name: String,
}

impl SymbolIdentity {
    /// Creates an identity from its parts.
    #[must_use]
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
        }
    }

    /// Identity of a call-hierarchy item.
    #[must_use]
    pub fn of(item: &CallHierarchyItem) -> Self {
        Self::new(item.uri.as_str(), item.name.as_str())
    }

    /// Document URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable key for the symbol's rendered graph: `uri::name`.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SymbolIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.uri, self.name)
    }
}
