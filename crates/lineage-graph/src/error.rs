//! Error types for lineage operations.

use thiserror::Error;

use lineage_rpc::RpcError;

/// Errors returned while building or rendering a lineage.
///
/// Empty results and cancellation are not errors; they are reported through
/// [`crate::Expansion`] and [`crate::LineageOutcome`].
#[derive(Debug, Error)]
pub enum GraphError {
    /// The language server request failed.
    #[error("language server request failed: {0}")]
    Rpc(#[from] RpcError),

    /// A call-hierarchy source other than the language server failed.
    #[error("call hierarchy source failed: {message}")]
    Source {
        /// Description of the failure.
        message: String,
    },

    /// A path could not be expressed as a URI.
    #[error("cannot convert '{path}' to a URI")]
    Uri {
        /// The offending path.
        path: String,
    },
}

impl GraphError {
    /// Creates a new `Source` error.
    #[must_use]
    pub fn source(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
        }
    }

    /// Creates a new `Uri` error.
    #[must_use]
    pub fn uri(path: impl Into<String>) -> Self {
        Self::Uri { path: path.into() }
    }
}
