//! Call lineage construction for code lineage.
//!
//! Given a function, the crate finds every chain of calls that reaches it
//! from a root (a function nothing calls) by asking a language server for
//! incoming calls, one level at a time.
//!
//! # Core Types
//!
//! - [`LineageBuilder`] expands a start symbol into a tree of
//!   [`CallHierarchyNode`]s, memoizing finished symbols in a shared
//!   [`VisitedCache`] and honouring a [`CancellationToken`].
//! - [`enumerate_paths`], [`dedup_paths`], [`compress`] and [`summarize`]
//!   turn a tree into a one-line summary such as `main.4.[2..7]`.
//! - [`LineageGraph`] is the deduplicated node and edge view of a tree with
//!   a deterministic Graphviz rendering.
//! - [`LineageEngine`] discovers start symbols in a document and resolves
//!   each into a [`LineageOutcome`].
//!
//! The language server is reached through the [`CallHierarchySource`] trait,
//! implemented for [`lineage_rpc::LspClient`].

mod builder;
mod cache;
mod cancel;
mod engine;
mod error;
mod filter;
mod graph;
mod identity;
mod node;
mod paths;
mod source;
mod uri;

pub use builder::{Expansion, LineageBuilder};
pub use cache::{CacheStats, VisitedCache};
pub use cancel::CancellationToken;
pub use engine::{GraphStore, LineageEngine, LineageOutcome, NOT_CALLED, ONLY_RECURSIVE};
pub use error::GraphError;
pub use filter::CallerFilter;
pub use graph::{GraphNode, LineageGraph};
pub use identity::SymbolIdentity;
pub use node::{CallHierarchyNode, IncomingEdge};
pub use paths::{
    Path, PathSegment, SummaryOptions, compress, dedup_paths, enumerate_paths, summarize,
};
pub use source::CallHierarchySource;
pub use uri::{path_to_uri, relative_path, uri_to_path};

#[cfg(test)]
mod tests;
