//! Lineage lines and graph files against a scripted language server.

use std::collections::HashMap;
use std::fs;
use std::str::FromStr;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use lineage_graph::{
    CallHierarchySource, CancellationToken, GraphError, GraphStore, LineageBuilder,
    LineageEngine, SummaryOptions, VisitedCache,
};
use lsp_types::{
    CallHierarchyIncomingCall, CallHierarchyItem, DocumentSymbolResponse, Position, Range,
    SymbolKind, Uri,
};
use rstest::{fixture, rstest};
use serde_json::json;

use crate::report::{ReportTotals, graph_file_name, report_documents, write_graphs};

const DOCUMENT_URI: &str = "file:///ws/main.go";

fn item(name: &str, line: u32) -> CallHierarchyItem {
    let range = Range {
        start: Position::new(line, 0),
        end: Position::new(line + 4, 1),
    };
    CallHierarchyItem {
        name: name.to_owned(),
        kind: SymbolKind::FUNCTION,
        tags: None,
        detail: None,
        uri: Uri::from_str(DOCUMENT_URI).expect("valid URI"),
        range,
        selection_range: range,
        data: None,
    }
}

/// `main` (line 2) calls `handle` (line 10) on line 5.
struct Workspace {
    functions: HashMap<u32, CallHierarchyItem>,
    callers: HashMap<String, Vec<CallHierarchyIncomingCall>>,
}

impl CallHierarchySource for Workspace {
    fn document_symbols(&self, _uri: &Uri) -> Result<Option<DocumentSymbolResponse>, GraphError> {
        let symbol = |name: &str, line: u32| {
            let range = json!({"start": {"line": line, "character": 0}, "end": {"line": line + 4, "character": 1}});
            json!({"name": name, "kind": 12, "range": range, "selectionRange": range})
        };
        let symbols = json!([symbol("main", 2), symbol("handle", 10)]);
        serde_json::from_value(symbols)
            .map(Some)
            .map_err(|error| GraphError::source(error.to_string()))
    }

    fn prepare_call_hierarchy(
        &self,
        _uri: &Uri,
        position: Position,
    ) -> Result<Option<Vec<CallHierarchyItem>>, GraphError> {
        Ok(self
            .functions
            .get(&position.line)
            .map(|found| vec![found.clone()]))
    }

    fn incoming_calls(
        &self,
        item: &CallHierarchyItem,
    ) -> Result<Option<Vec<CallHierarchyIncomingCall>>, GraphError> {
        Ok(self.callers.get(&item.name).cloned())
    }
}

#[fixture]
fn engine() -> LineageEngine<Workspace> {
    let call = CallHierarchyIncomingCall {
        from: item("main", 2),
        from_ranges: vec![Range {
            start: Position::new(5, 4),
            end: Position::new(5, 10),
        }],
    };
    let workspace = Workspace {
        functions: HashMap::from([(2, item("main", 2)), (10, item("handle", 10))]),
        callers: HashMap::from([("handle".to_owned(), vec![call])]),
    };
    let builder = LineageBuilder::new(workspace, Arc::new(VisitedCache::new()));
    LineageEngine::new(builder, SummaryOptions::default()).with_project_root("/ws")
}

fn documents() -> Vec<Utf8PathBuf> {
    vec![Utf8PathBuf::from("/ws/main.go")]
}

#[rstest]
fn prints_one_line_per_function(engine: LineageEngine<Workspace>) {
    let mut out = Vec::new();

    let totals = report_documents(&engine, &documents(), &CancellationToken::new(), &mut out)
        .expect("report written");

    assert_eq!(
        String::from_utf8(out).expect("utf-8 output"),
        "main.go:3 main: Not called anywhere\nmain.go:11 handle: main.3\n"
    );
    assert_eq!(
        totals,
        ReportTotals {
            symbols: 2,
            uncalled: 1,
            cancelled: false,
        }
    );
}

#[rstest]
fn cancellation_stops_the_report(engine: LineageEngine<Workspace>) {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut out = Vec::new();

    let totals = report_documents(&engine, &documents(), &cancel, &mut out).expect("report");

    assert_eq!(
        String::from_utf8(out).expect("utf-8 output"),
        "main.go:3 main: cancelled\n"
    );
    assert!(totals.cancelled);
    assert_eq!(totals.symbols, 0);
}

#[rstest]
fn graphs_are_written_per_called_function(engine: LineageEngine<Workspace>) {
    let mut out = Vec::new();
    report_documents(&engine, &documents(), &CancellationToken::new(), &mut out)
        .expect("report written");
    let dir = tempfile::tempdir().expect("tempdir");
    let target = Utf8Path::from_path(dir.path())
        .expect("utf-8 temp dir")
        .join("graphs");

    let written = write_graphs(engine.graphs(), engine.project_root(), &target)
        .expect("graphs written");

    assert_eq!(written, 1);
    let dot = fs::read_to_string(target.join("handle_main.go.dot")).expect("graph file");
    assert!(dot.starts_with("digraph \"handleCallHierarchy\" {"));
    assert!(dot.contains("\"main_main.go\" -> \"handle_main.go\";"));
}

#[rstest]
#[case("file:///ws/pkg/a.go::Run", Some("/ws"), "Run_pkg_a.go.dot")]
#[case("file:///ws/pkg/a.go::Run", None, "Run__ws_pkg_a.go.dot")]
#[case("file:///ws/a/b_c.go::Run", Some("/ws"), "Run_a_b%5Fc.go.dot")]
#[case("file:///ws/a_b/c.go::Run", Some("/ws"), "Run_a%5Fb_c.go.dot")]
#[case("file:///ws/b.go::run_a", Some("/ws"), "run%5Fa_b.go.dot")]
#[case("file:///ws/a_b.go::run", Some("/ws"), "run_a%5Fb.go.dot")]
fn graph_file_names_flatten_the_path(
    #[case] key: &str,
    #[case] root: Option<&str>,
    #[case] expected: &str,
) {
    assert_eq!(graph_file_name(key, root.map(Utf8Path::new)), expected);
}

#[rstest]
fn graphs_from_similar_paths_get_separate_files() {
    let store = GraphStore::new();
    store.insert("file:///ws/a/b_c.go::Run", "digraph \"one\" {}\n");
    store.insert("file:///ws/a_b/c.go::Run", "digraph \"two\" {}\n");
    let target = tempfile::tempdir().expect("temp dir");
    let dir = Utf8Path::from_path(target.path()).expect("UTF-8 temp dir");

    let written = write_graphs(&store, Some(Utf8Path::new("/ws")), dir).expect("graphs written");

    assert_eq!(written, 2);
    assert_eq!(fs::read_dir(dir).expect("list graphs").count(), 2);
}
