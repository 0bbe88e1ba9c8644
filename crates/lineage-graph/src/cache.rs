//! Session-scoped cache of fully expanded edge lists.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::identity::SymbolIdentity;
use crate::node::IncomingEdge;

const CACHE_TARGET: &str = "lineage_graph::cache";

/// Hit and miss counters of a [`VisitedCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to ask the language server.
    pub misses: u64,
}

/// Maps each fully expanded symbol to its incoming edges.
///
/// One cache serves a whole session and may be shared by builders running
/// on different threads. Only complete edge lists are ever inserted. Nothing
/// expires on its own: call [`VisitedCache::clear`] when the workspace changes
/// (the CLI runs one session per invocation; editor hosts clear on save).
#[derive(Debug, Default)]
pub struct VisitedCache {
    entries: RwLock<HashMap<SymbolIdentity, Arc<[IncomingEdge]>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl VisitedCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an identity, counting the hit or miss.
    #[must_use]
    pub fn get(&self, identity: &SymbolIdentity) -> Option<Arc<[IncomingEdge]>> {
        let found = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity)
            .cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Whether an identity is cached, without touching the counters.
    #[must_use]
    pub fn contains(&self, identity: &SymbolIdentity) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(identity)
    }

    /// Publishes a complete edge list.
    pub fn insert(&self, identity: SymbolIdentity, edges: Arc<[IncomingEdge]>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity, edges);
    }

    /// Drops one entry; returns whether it was present.
    pub fn invalidate(&self, identity: &SymbolIdentity) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identity)
            .is_some()
    }

    /// Drops every entry and resets the counters.
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        debug!(target: CACHE_TARGET, entries = entries.len(), "clearing visited cache");
        entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Number of cached symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current hit and miss counts.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
