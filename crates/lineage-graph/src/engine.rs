//! Per-symbol lineage resolution.
//!
//! The engine ties the pieces together the way an editor integration uses
//! them: discover the functions of a document, then resolve each one into a
//! summary line and a stored graph.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use camino::{Utf8Path, Utf8PathBuf};
use lineage_config::Config;
use lsp_types::{CallHierarchyItem, DocumentSymbolResponse, Position, SymbolKind, Uri};
use tracing::{debug, info};

use crate::builder::{Expansion, LineageBuilder};
use crate::cache::VisitedCache;
use crate::cancel::CancellationToken;
use crate::error::GraphError;
use crate::filter::CallerFilter;
use crate::graph::LineageGraph;
use crate::identity::SymbolIdentity;
use crate::paths::{SummaryOptions, dedup_paths, enumerate_paths, summarize};
use crate::source::CallHierarchySource;

const ENGINE_TARGET: &str = "lineage_graph::engine";

/// Title shown for a symbol nothing calls.
pub const NOT_CALLED: &str = "Not called anywhere";

/// Title shown when every caller chain ends in a cycle.
pub const ONLY_RECURSIVE: &str = "Only reached through recursion";

/// Rendered graphs keyed by `uri::name`.
#[derive(Debug, Default)]
pub struct GraphStore {
    graphs: RwLock<HashMap<String, String>>,
}

impl GraphStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// DOT text stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.graphs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Stores (or replaces) the DOT text for `key`.
    pub fn insert(&self, key: impl Into<String>, dot: impl Into<String>) {
        self.graphs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), dot.into());
    }

    /// Stored keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .graphs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Number of stored graphs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graphs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What resolving one start symbol produced.
#[derive(Debug, Clone)]
pub enum LineageOutcome {
    /// The symbol has no callers; no graph was rendered.
    NotCalled {
        /// Graph key of the symbol.
        key: String,
    },
    /// Resolution was cancelled before the tree was complete.
    Cancelled,
    /// The symbol's lineage.
    Lineage {
        /// Graph key under which the DOT text was stored.
        key: String,
        /// One-line path summary.
        summary: String,
        /// The rendered graph.
        graph: LineageGraph,
    },
}

impl LineageOutcome {
    /// Text to show for the symbol, if any.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::NotCalled { .. } => Some(NOT_CALLED),
            Self::Cancelled => None,
            Self::Lineage { summary, .. } => Some(summary.as_str()),
        }
    }
}

/// Resolves lineages for start symbols and keeps their graphs.
#[derive(Debug)]
pub struct LineageEngine<S> {
    builder: LineageBuilder<S>,
    options: SummaryOptions,
    project_root: Option<Utf8PathBuf>,
    graphs: GraphStore,
}

impl<S> LineageEngine<S> {
    /// Creates an engine around an existing builder.
    #[must_use]
    pub fn new(builder: LineageBuilder<S>, options: SummaryOptions) -> Self {
        Self {
            builder,
            options,
            project_root: None,
            graphs: GraphStore::new(),
        }
    }

    /// Creates an engine configured from `config`, sharing `cache`.
    #[must_use]
    pub fn from_config(source: S, cache: Arc<VisitedCache>, config: &Config) -> Self {
        let builder =
            LineageBuilder::new(source, cache).with_filter(CallerFilter::from_config(config));
        let mut engine = Self::new(builder, SummaryOptions::from_config(config));
        engine.project_root.clone_from(&config.project_root);
        engine
    }

    /// Makes graph labels relative to `root`.
    #[must_use]
    pub fn with_project_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    /// The underlying builder.
    #[must_use]
    pub const fn builder(&self) -> &LineageBuilder<S> {
        &self.builder
    }

    /// Graphs rendered so far.
    #[must_use]
    pub const fn graphs(&self) -> &GraphStore {
        &self.graphs
    }

    /// Directory graph labels are relative to.
    #[must_use]
    pub fn project_root(&self) -> Option<&Utf8Path> {
        self.project_root.as_deref()
    }
}

impl<S: CallHierarchySource> LineageEngine<S> {
    /// Lists the call-hierarchy items of the functions and methods declared
    /// in a document.
    ///
    /// Symbols the server cannot prepare are skipped; a document with no
    /// symbols yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error.
    pub fn start_nodes(&self, uri: &Uri) -> Result<Vec<CallHierarchyItem>, GraphError> {
        let source = self.builder.source();
        let Some(symbols) = source.document_symbols(uri)? else {
            return Ok(Vec::new());
        };

        let mut items = Vec::new();
        for position in callable_positions(symbols) {
            let prepared = source.prepare_call_hierarchy(uri, position)?;
            if let Some(item) = prepared.and_then(|found| found.into_iter().next()) {
                items.push(item);
            }
        }
        debug!(
            target: ENGINE_TARGET,
            uri = uri.as_str(),
            start_nodes = items.len(),
            "discovered start nodes"
        );
        Ok(items)
    }

    /// Builds the lineage of `item`, stores its graph and renders its
    /// summary.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error.
    pub fn resolve(
        &self,
        item: CallHierarchyItem,
        cancel: &CancellationToken,
    ) -> Result<LineageOutcome, GraphError> {
        let key = SymbolIdentity::of(&item).key();
        let start = match self.builder.expand(item, cancel)? {
            Expansion::Complete(node) => node,
            Expansion::Cancelled(_) => return Ok(LineageOutcome::Cancelled),
        };

        if start.incoming().is_empty() {
            debug!(target: ENGINE_TARGET, %key, "symbol is not called");
            return Ok(LineageOutcome::NotCalled { key });
        }

        let paths = dedup_paths(enumerate_paths(&start));
        let summary = if paths.is_empty() {
            ONLY_RECURSIVE.to_owned()
        } else {
            summarize(&paths, &self.options)
        };
        let graph = LineageGraph::from_tree(&start, self.project_root.as_deref());
        self.graphs.insert(key.clone(), graph.to_dot());
        info!(
            target: ENGINE_TARGET,
            %key,
            paths = paths.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "lineage resolved"
        );
        Ok(LineageOutcome::Lineage {
            key,
            summary,
            graph,
        })
    }
}

fn is_callable(kind: SymbolKind) -> bool {
    kind == SymbolKind::FUNCTION || kind == SymbolKind::METHOD
}

/// Name positions of the callable symbols, in document order.
fn callable_positions(symbols: DocumentSymbolResponse) -> Vec<Position> {
    match symbols {
        DocumentSymbolResponse::Flat(flat) => flat
            .into_iter()
            .filter(|symbol| is_callable(symbol.kind))
            .map(|symbol| symbol.location.range.start)
            .collect(),
        DocumentSymbolResponse::Nested(nested) => {
            let mut positions = Vec::new();
            let mut stack: Vec<_> = nested.into_iter().rev().collect();
            while let Some(symbol) = stack.pop() {
                if is_callable(symbol.kind) {
                    positions.push(symbol.selection_range.start);
                }
                if let Some(children) = symbol.children {
                    stack.extend(children.into_iter().rev());
                }
            }
            positions
        }
    }
}
