//! Lineage lines and graph files.

use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use lineage_graph::{
    CallHierarchySource, CancellationToken, GraphStore, LineageEngine, LineageOutcome,
    path_to_uri, relative_path,
};
use tracing::{debug, warn};

use crate::errors::AppError;

const REPORT_TARGET: &str = "lineage_cli::report";

/// What a run produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ReportTotals {
    /// Functions reported.
    pub(crate) symbols: usize,
    /// Functions nothing calls.
    pub(crate) uncalled: usize,
    /// Whether the run stopped early.
    pub(crate) cancelled: bool,
}

/// Resolves every function of every document, writing one line per function:
///
/// ```text
/// pkg/server.go:42 Serve: main.7.[3..12]
/// ```
///
/// Stops at the first cancelled resolution.
pub(crate) fn report_documents<S, W>(
    engine: &LineageEngine<S>,
    documents: &[Utf8PathBuf],
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<ReportTotals, AppError>
where
    S: CallHierarchySource,
    W: Write,
{
    let mut totals = ReportTotals::default();
    for document in documents {
        let uri = path_to_uri(document).map_err(|source| AppError::document(document, source))?;
        let starts = engine
            .start_nodes(&uri)
            .map_err(|source| AppError::document(document, source))?;
        debug!(
            target: REPORT_TARGET,
            document = %document,
            functions = starts.len(),
            "resolving document"
        );

        for start in starts {
            let label = format!(
                "{}:{} {}",
                relative_path(start.uri.as_str(), engine.project_root()),
                start.selection_range.start.line.saturating_add(1),
                start.name
            );
            let outcome = engine
                .resolve(start, cancel)
                .map_err(|source| AppError::document(document, source))?;
            let Some(title) = outcome.title() else {
                writeln!(out, "{label}: cancelled").map_err(AppError::Output)?;
                warn!(target: REPORT_TARGET, "resolution cancelled");
                totals.cancelled = true;
                return Ok(totals);
            };
            writeln!(out, "{label}: {title}").map_err(AppError::Output)?;
            totals.symbols += 1;
            if matches!(outcome, LineageOutcome::NotCalled { .. }) {
                totals.uncalled += 1;
            }
        }
    }
    Ok(totals)
}

/// Writes every stored graph to `dir` as `<name>_<path>.dot`.
///
/// Returns the number of files written.
pub(crate) fn write_graphs(
    store: &GraphStore,
    project_root: Option<&Utf8Path>,
    dir: &Utf8Path,
) -> Result<usize, AppError> {
    fs::create_dir_all(dir).map_err(|source| AppError::WriteGraph {
        path: dir.to_owned(),
        source,
    })?;

    let mut written = 0;
    for key in store.keys() {
        let Some(dot) = store.get(&key) else {
            continue;
        };
        let path = dir.join(graph_file_name(&key, project_root));
        fs::write(&path, dot).map_err(|source| AppError::WriteGraph {
            path: path.clone(),
            source,
        })?;
        debug!(target: REPORT_TARGET, path = %path, "graph written");
        written += 1;
    }
    Ok(written)
}

/// File name for a graph stored under `uri::name`.
///
/// Path separators become `_`; a literal `_`, `%` or `\\` is percent-escaped
/// so distinct keys never share a file.
pub(crate) fn graph_file_name(key: &str, project_root: Option<&Utf8Path>) -> String {
    let (uri, name) = key.split_once("::").unwrap_or(("", key));
    let path = relative_path(uri, project_root);
    format!("{}_{}.dot", escape(name, "%2F"), escape(&path, "_"))
}

fn escape(text: &str, slash: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '%' => escaped.push_str("%25"),
            '_' => escaped.push_str("%5F"),
            '\\' => escaped.push_str("%5C"),
            '/' => escaped.push_str(slash),
            other => escaped.push(other),
        }
    }
    escaped
}
