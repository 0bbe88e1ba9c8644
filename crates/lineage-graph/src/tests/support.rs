//! Scripted call hierarchies for lineage tests.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use lsp_types::{
    CallHierarchyIncomingCall, CallHierarchyItem, DocumentSymbolResponse, Position, Range,
    SymbolKind, Uri,
};

use crate::{CallHierarchySource, CancellationToken, GraphError};

pub(super) const MAIN_URI: &str = "file:///ws/main.go";

pub(super) fn uri(text: &str) -> Uri {
    Uri::from_str(text).expect("valid URI")
}

/// A function declared at `line` of `uri_text`.
pub(super) fn item_in(uri_text: &str, name: &str, line: u32) -> CallHierarchyItem {
    CallHierarchyItem {
        name: name.to_owned(),
        kind: SymbolKind::FUNCTION,
        tags: None,
        detail: None,
        uri: uri(uri_text),
        range: Range {
            start: Position::new(line, 0),
            end: Position::new(line + 5, 1),
        },
        selection_range: Range {
            start: Position::new(line, 5),
            end: Position::new(line, 9),
        },
        data: None,
    }
}

/// A function declared at `line` of [`MAIN_URI`].
pub(super) fn item(name: &str, line: u32) -> CallHierarchyItem {
    item_in(MAIN_URI, name, line)
}

/// `from` calls the callee once on each of `lines`.
pub(super) fn call(from: &CallHierarchyItem, lines: &[u32]) -> CallHierarchyIncomingCall {
    CallHierarchyIncomingCall {
        from: from.clone(),
        from_ranges: lines
            .iter()
            .map(|&line| Range {
                start: Position::new(line, 4),
                end: Position::new(line, 12),
            })
            .collect(),
    }
}

/// Answers incoming-call queries from a fixed table keyed by callee name and
/// counts every query.
#[derive(Debug, Default)]
pub(super) struct ScriptedSource {
    callers: HashMap<String, Vec<CallHierarchyIncomingCall>>,
    failing: HashSet<String>,
    symbols: Option<DocumentSymbolResponse>,
    prepared: HashMap<u32, CallHierarchyItem>,
    cancel_on: Option<(String, CancellationToken)>,
    queries: Mutex<HashMap<String, usize>>,
}

impl ScriptedSource {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn with_callers(
        mut self,
        callee: &str,
        calls: Vec<CallHierarchyIncomingCall>,
    ) -> Self {
        self.callers.entry(callee.to_owned()).or_default().extend(calls);
        self
    }

    pub(super) fn failing_for(mut self, callee: &str) -> Self {
        self.failing.insert(callee.to_owned());
        self
    }

    pub(super) fn with_symbols(mut self, symbols: DocumentSymbolResponse) -> Self {
        self.symbols = Some(symbols);
        self
    }

    pub(super) fn with_prepared(mut self, line: u32, prepared: CallHierarchyItem) -> Self {
        self.prepared.insert(line, prepared);
        self
    }

    /// Cancels `token` while answering the query for `callee`.
    pub(super) fn cancelling_at(mut self, callee: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((callee.to_owned(), token));
        self
    }

    pub(super) fn queries_for(&self, callee: &str) -> usize {
        self.counts().get(callee).copied().unwrap_or_default()
    }

    pub(super) fn total_queries(&self) -> usize {
        self.counts().values().sum()
    }

    pub(super) fn reset_queries(&self) {
        self.counts().clear();
    }

    fn counts(&self) -> std::sync::MutexGuard<'_, HashMap<String, usize>> {
        self.queries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CallHierarchySource for ScriptedSource {
    fn document_symbols(&self, _uri: &Uri) -> Result<Option<DocumentSymbolResponse>, GraphError> {
        Ok(self.symbols.clone())
    }

    fn prepare_call_hierarchy(
        &self,
        _uri: &Uri,
        position: Position,
    ) -> Result<Option<Vec<CallHierarchyItem>>, GraphError> {
        Ok(self
            .prepared
            .get(&position.line)
            .map(|prepared| vec![prepared.clone()]))
    }

    fn incoming_calls(
        &self,
        item: &CallHierarchyItem,
    ) -> Result<Option<Vec<CallHierarchyIncomingCall>>, GraphError> {
        *self.counts().entry(item.name.clone()).or_default() += 1;
        if let Some((name, token)) = &self.cancel_on {
            if *name == item.name {
                token.cancel();
            }
        }
        if self.failing.contains(&item.name) {
            return Err(GraphError::source(format!("no answer for {}", item.name)));
        }
        Ok(self.callers.get(&item.name).cloned())
    }
}
