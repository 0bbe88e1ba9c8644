//! Call-hierarchy tree nodes.

use std::collections::HashSet;
use std::sync::Arc;

use lsp_types::{CallHierarchyItem, Range};

use crate::identity::SymbolIdentity;

/// A symbol in a lineage tree together with the calls that reach it.
///
/// Nodes are immutable once built. Fully expanded edge lists are shared with
/// the [`crate::VisitedCache`], so the same slice may appear under several
/// parents.
#[derive(Debug, Clone)]
pub struct CallHierarchyNode {
    identity: SymbolIdentity,
    item: CallHierarchyItem,
    incoming: Arc<[IncomingEdge]>,
    back_reference: bool,
}

impl CallHierarchyNode {
    /// Creates a node with the given incoming edges.
    #[must_use]
    pub fn new(item: CallHierarchyItem, incoming: Arc<[IncomingEdge]>) -> Self {
        Self {
            identity: SymbolIdentity::of(&item),
            item,
            incoming,
            back_reference: false,
        }
    }

    /// Creates a node with no incoming edges.
    #[must_use]
    pub fn leaf(item: CallHierarchyItem) -> Self {
        Self::new(item, Arc::from(Vec::new()))
    }

    /// Creates a node that re-enters a symbol still being expanded higher on
    /// the same traversal. `incoming` holds the edges known at that moment.
    #[must_use]
    pub fn back_reference(item: CallHierarchyItem, incoming: Arc<[IncomingEdge]>) -> Self {
        Self {
            back_reference: true,
            ..Self::new(item, incoming)
        }
    }

    /// Identity of the symbol.
    #[must_use]
    pub const fn identity(&self) -> &SymbolIdentity {
        &self.identity
    }

    /// Underlying call-hierarchy item.
    #[must_use]
    pub const fn item(&self) -> &CallHierarchyItem {
        &self.item
    }

    /// Declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.item.name
    }

    /// Zero-based line on which the declaration starts.
    #[must_use]
    pub const fn declaration_line(&self) -> u32 {
        self.item.range.start.line
    }

    /// Incoming edges in the order the language server reported them.
    #[must_use]
    pub fn incoming(&self) -> &[IncomingEdge] {
        &self.incoming
    }

    /// Whether this node closes a cycle.
    #[must_use]
    pub const fn is_back_reference(&self) -> bool {
        self.back_reference
    }

    /// Whether nothing calls this symbol.
    ///
    /// Back-references are never roots, whatever their edge snapshot holds.
    #[must_use]
    pub fn is_root(&self) -> bool {
        !self.back_reference && self.incoming.is_empty()
    }
}

/// A caller and the lines in it that call the callee.
#[derive(Debug, Clone)]
pub struct IncomingEdge {
    caller: Arc<CallHierarchyNode>,
    call_sites: Vec<Range>,
}

impl IncomingEdge {
    /// Creates an edge; `call_sites` should already be deduplicated by line.
    #[must_use]
    pub const fn new(caller: Arc<CallHierarchyNode>, call_sites: Vec<Range>) -> Self {
        Self { caller, call_sites }
    }

    /// The calling symbol.
    #[must_use]
    pub fn caller(&self) -> &CallHierarchyNode {
        &self.caller
    }

    /// Call-site ranges inside the caller, one per source line.
    #[must_use]
    pub fn call_sites(&self) -> &[Range] {
        &self.call_sites
    }

    /// Line offsets of the call sites from the caller's declaration.
    pub fn offsets(&self) -> impl Iterator<Item = i64> + '_ {
        let declaration = i64::from(self.caller.declaration_line());
        self.call_sites
            .iter()
            .map(move |site| i64::from(site.start.line) - declaration)
    }
}

/// Keeps the first range reported for each start line.
///
/// An empty list falls back to `fallback`, so every edge keeps at least one
/// call site.
pub(crate) fn dedup_call_sites(ranges: Vec<Range>, fallback: Range) -> Vec<Range> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Range> = ranges
        .into_iter()
        .filter(|range| seen.insert(range.start.line))
        .collect();
    if unique.is_empty() {
        unique.push(fallback);
    }
    unique
}
