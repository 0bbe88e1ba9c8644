//! Memoized construction of incoming-call trees.
//!
//! Expansion walks "caller of caller of ..." edges with an explicit work
//! stack, so call depth is limited only by memory. Symbols currently on the
//! stack are tracked by identity; meeting one again yields a back-reference
//! node instead of re-entering it, which guarantees termination on recursive
//! code.
//!
//! A finished frame is published to the [`VisitedCache`] only when nothing in
//! its subtree refers to an ancestor that is still open. Such a frame's edge
//! list is final; the others are completed when the ancestor closing the
//! cycle finishes, and that ancestor is cached instead. Every finished frame
//! is also remembered for the rest of its traversal, so a strongly connected
//! group of callers is queried once per symbol however many routes lead into
//! it.

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use lsp_types::{CallHierarchyIncomingCall, CallHierarchyItem, Range};
use tracing::{debug, trace};

use crate::cache::VisitedCache;
use crate::cancel::CancellationToken;
use crate::error::GraphError;
use crate::filter::CallerFilter;
use crate::identity::SymbolIdentity;
use crate::node::{CallHierarchyNode, IncomingEdge, dedup_call_sites};
use crate::source::CallHierarchySource;

const BUILDER_TARGET: &str = "lineage_graph::builder";

/// Result of [`LineageBuilder::expand`].
#[derive(Debug, Clone)]
pub enum Expansion {
    /// The whole tree was built.
    Complete(Arc<CallHierarchyNode>),
    /// Cancellation was observed; the tree holds whatever was found so far
    /// and none of its unfinished nodes were cached.
    Cancelled(Arc<CallHierarchyNode>),
}

impl Expansion {
    /// The start node, complete or partial.
    #[must_use]
    pub const fn node(&self) -> &Arc<CallHierarchyNode> {
        match self {
            Self::Complete(node) | Self::Cancelled(node) => node,
        }
    }

    /// Whether the traversal ran to completion.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

/// Builds incoming-call trees, sharing finished work through a cache.
#[derive(Debug)]
pub struct LineageBuilder<S> {
    source: S,
    cache: Arc<VisitedCache>,
    filter: CallerFilter,
}

impl<S> LineageBuilder<S> {
    /// Creates a builder that keeps every caller.
    #[must_use]
    pub fn new(source: S, cache: Arc<VisitedCache>) -> Self {
        Self {
            source,
            cache,
            filter: CallerFilter::allow_all(),
        }
    }

    /// Replaces the caller filter.
    #[must_use]
    pub fn with_filter(mut self, filter: CallerFilter) -> Self {
        self.filter = filter;
        self
    }

    /// The shared cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<VisitedCache> {
        &self.cache
    }

    /// The language server collaborator.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }
}

struct Caller {
    item: CallHierarchyItem,
    call_sites: Vec<Range>,
}

/// Edges of a symbol finished earlier in the same traversal, with the
/// shallowest ancestor its subtree referred to.
struct Finished {
    edges: Arc<[IncomingEdge]>,
    low: usize,
}

/// State of one call to [`LineageBuilder::expand`].
struct Traversal {
    /// Open symbols and the depth of their frame.
    in_progress: HashMap<SymbolIdentity, usize>,
    finished: HashMap<SymbolIdentity, Finished>,
    stack: Vec<Frame>,
}

/// A symbol whose callers are being expanded.
struct Frame {
    item: CallHierarchyItem,
    identity: SymbolIdentity,
    depth: usize,
    /// Shallowest open ancestor referenced from this subtree.
    low: usize,
    callers: std::vec::IntoIter<Caller>,
    /// Call sites of the caller currently expanded above this frame.
    child_sites: Vec<Range>,
    edges: Vec<IncomingEdge>,
}

impl Frame {
    fn adopt(&mut self, caller: Arc<CallHierarchyNode>) {
        let call_sites = mem::take(&mut self.child_sites);
        self.edges.push(IncomingEdge::new(caller, call_sites));
    }

    fn into_partial(self) -> Arc<CallHierarchyNode> {
        Arc::new(CallHierarchyNode::new(self.item, Arc::from(self.edges)))
    }
}

impl<S: CallHierarchySource> LineageBuilder<S> {
    /// Builds the incoming-call tree of `item`.
    ///
    /// A cached start node is answered without contacting the server. The
    /// token is polled before every step; on cancellation the partial tree is
    /// returned as [`Expansion::Cancelled`].
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error; nothing still being expanded is
    /// cached in that case.
    pub fn expand(
        &self,
        item: CallHierarchyItem,
        cancel: &CancellationToken,
    ) -> Result<Expansion, GraphError> {
        if cancel.is_cancelled() {
            return Ok(Expansion::Cancelled(Arc::new(CallHierarchyNode::leaf(item))));
        }

        let identity = SymbolIdentity::of(&item);
        if let Some(edges) = self.cache.get(&identity) {
            trace!(target: BUILDER_TARGET, symbol = %identity, "start node cached");
            return Ok(Expansion::Complete(Arc::new(CallHierarchyNode::new(
                item, edges,
            ))));
        }

        debug!(target: BUILDER_TARGET, symbol = %identity, "expanding lineage");
        let mut walk = Traversal {
            in_progress: HashMap::from([(identity.clone(), 0)]),
            finished: HashMap::new(),
            stack: vec![self.open(item, identity, 0)?],
        };

        loop {
            let Some(mut frame) = walk.stack.pop() else {
                return Err(GraphError::source(
                    "traversal stack emptied before the start node completed",
                ));
            };

            if cancel.is_cancelled() {
                debug!(
                    target: BUILDER_TARGET,
                    open = walk.stack.len() + 1,
                    "expansion cancelled"
                );
                return Ok(Expansion::Cancelled(unwind(walk.stack, frame)));
            }

            match frame.callers.next() {
                Some(caller) => self.visit(&mut walk, frame, caller)?,
                None => {
                    if let Some(node) = self.finish(&mut walk, frame) {
                        return Ok(Expansion::Complete(node));
                    }
                }
            }
        }
    }

    /// Attaches `caller` to `frame`, opening a new frame when it needs the
    /// server.
    fn visit(
        &self,
        walk: &mut Traversal,
        mut frame: Frame,
        caller: Caller,
    ) -> Result<(), GraphError> {
        let caller_identity = SymbolIdentity::of(&caller.item);
        if let Some(&depth) = walk.in_progress.get(&caller_identity) {
            let known = if depth == frame.depth {
                frame.edges.clone()
            } else {
                walk.stack
                    .get(depth)
                    .map(|open| open.edges.clone())
                    .unwrap_or_default()
            };
            trace!(
                target: BUILDER_TARGET,
                symbol = %caller_identity,
                depth,
                "caller is already being expanded"
            );
            frame.low = frame.low.min(depth);
            let node = CallHierarchyNode::back_reference(caller.item, Arc::from(known));
            frame
                .edges
                .push(IncomingEdge::new(Arc::new(node), caller.call_sites));
        } else if let Some(done) = walk.finished.get(&caller_identity) {
            trace!(
                target: BUILDER_TARGET,
                symbol = %caller_identity,
                "caller finished earlier in this traversal"
            );
            frame.low = frame.low.min(done.low);
            let node = CallHierarchyNode::new(caller.item, Arc::clone(&done.edges));
            frame
                .edges
                .push(IncomingEdge::new(Arc::new(node), caller.call_sites));
        } else if let Some(edges) = self.cache.get(&caller_identity) {
            let node = CallHierarchyNode::new(caller.item, edges);
            frame
                .edges
                .push(IncomingEdge::new(Arc::new(node), caller.call_sites));
        } else {
            let depth = frame.depth + 1;
            frame.child_sites = caller.call_sites;
            walk.stack.push(frame);
            let child = self.open(caller.item, caller_identity.clone(), depth)?;
            walk.in_progress.insert(caller_identity, depth);
            walk.stack.push(child);
            return Ok(());
        }
        walk.stack.push(frame);
        Ok(())
    }

    /// Seals a frame whose callers are exhausted and hands it to its parent.
    /// Returns the node once the start frame itself is sealed.
    fn finish(&self, walk: &mut Traversal, frame: Frame) -> Option<Arc<CallHierarchyNode>> {
        walk.in_progress.remove(&frame.identity);
        let low = frame.low;
        let identity = frame.identity.clone();
        let (node, edges) = self.seal(frame);
        walk.finished.insert(identity, Finished { edges, low });

        let Some(parent) = walk.stack.last_mut() else {
            let stats = self.cache.stats();
            debug!(
                target: BUILDER_TARGET,
                hits = stats.hits,
                misses = stats.misses,
                "lineage expanded"
            );
            return Some(node);
        };
        parent.low = parent.low.min(low);
        parent.adopt(node);
        None
    }

    fn open(
        &self,
        item: CallHierarchyItem,
        identity: SymbolIdentity,
        depth: usize,
    ) -> Result<Frame, GraphError> {
        let calls = self.source.incoming_calls(&item)?.unwrap_or_default();
        let callers = self.collect_callers(calls);
        trace!(
            target: BUILDER_TARGET,
            symbol = %identity,
            depth,
            callers = callers.len(),
            "fetched incoming calls"
        );
        Ok(Frame {
            item,
            identity,
            depth,
            low: depth,
            callers: callers.into_iter(),
            child_sites: Vec::new(),
            edges: Vec::new(),
        })
    }

    /// Drops excluded callers and merges repeated callers by identity.
    fn collect_callers(&self, calls: Vec<CallHierarchyIncomingCall>) -> Vec<Caller> {
        let mut callers: Vec<Caller> = Vec::with_capacity(calls.len());
        let mut positions: HashMap<SymbolIdentity, usize> = HashMap::new();

        for call in calls {
            if self.filter.excludes(&call.from) {
                trace!(
                    target: BUILDER_TARGET,
                    caller = %call.from.name,
                    uri = call.from.uri.as_str(),
                    "skipping excluded caller"
                );
                continue;
            }
            let identity = SymbolIdentity::of(&call.from);
            if let Some(existing) = positions
                .get(&identity)
                .copied()
                .and_then(|index| callers.get_mut(index))
            {
                existing.call_sites.extend(call.from_ranges);
                continue;
            }
            positions.insert(identity, callers.len());
            callers.push(Caller {
                item: call.from,
                call_sites: call.from_ranges,
            });
        }

        callers
            .into_iter()
            .map(|caller| {
                let fallback = caller.item.selection_range;
                Caller {
                    call_sites: dedup_call_sites(caller.call_sites, fallback),
                    item: caller.item,
                }
            })
            .collect()
    }

    fn seal(&self, frame: Frame) -> (Arc<CallHierarchyNode>, Arc<[IncomingEdge]>) {
        let edges: Arc<[IncomingEdge]> = Arc::from(frame.edges);
        if frame.low >= frame.depth {
            self.cache.insert(frame.identity, Arc::clone(&edges));
        } else {
            trace!(
                target: BUILDER_TARGET,
                symbol = %frame.identity,
                "not caching: depends on an unfinished ancestor"
            );
        }
        let node = Arc::new(CallHierarchyNode::new(frame.item, Arc::clone(&edges)));
        (node, edges)
    }
}

/// Folds the open frames into a partial tree without caching any of them.
fn unwind(mut stack: Vec<Frame>, top: Frame) -> Arc<CallHierarchyNode> {
    let mut node = top.into_partial();
    while let Some(mut parent) = stack.pop() {
        parent.adopt(node);
        node = parent.into_partial();
    }
    node
}
