//! Lineage graph and its Graphviz rendering.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use camino::Utf8Path;

use crate::node::{CallHierarchyNode, IncomingEdge};
use crate::uri::relative_path;

const GRAPH_ATTRIBUTES: &str = r#"graph [rankdir=TB, fontname="Courier", fontsize=12];"#;
const NODE_ATTRIBUTES: &str =
    r#"node [shape=box, style="rounded,filled", fontname="Courier", fontsize=10];"#;
const EDGE_ATTRIBUTES: &str = "edge [arrowhead=vee, arrowsize=0.8, penwidth=1.5];";

/// A symbol in the rendered graph.
///
/// Every occurrence of the same name in the same file maps to one node; the
/// call-site lines of all occurrences are merged into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    name: String,
    path: String,
    lines: BTreeSet<u32>,
    root: bool,
}

impl GraphNode {
    /// Symbol name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Document path relative to the project root.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// One-based call-site lines, ascending.
    pub fn lines(&self) -> impl Iterator<Item = u32> + '_ {
        self.lines.iter().copied()
    }

    /// Whether nothing calls this symbol.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.root
    }

    fn label(&self) -> String {
        let mut label = format!("{}\\n{}", escape(&self.name), escape(&self.path));
        if !self.lines.is_empty() {
            let lines: Vec<String> = self.lines.iter().map(u32::to_string).collect();
            label.push(':');
            label.push_str(&lines.join(","));
        }
        label
    }
}

/// Nodes and caller-to-callee edges of a lineage, in a fixed order.
///
/// Rendering the same tree twice gives byte-identical text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageGraph {
    title: String,
    nodes: BTreeMap<String, GraphNode>,
    edges: BTreeSet<(String, String)>,
}

impl LineageGraph {
    /// Collects the graph of the tree rooted at `start`.
    ///
    /// The start node's own declaration line is recorded in its label;
    /// callers record the lines they call from. Paths in labels are relative
    /// to `project_root` when given.
    #[must_use]
    pub fn from_tree(start: &CallHierarchyNode, project_root: Option<&Utf8Path>) -> Self {
        let mut graph = Self {
            title: start.name().to_owned(),
            nodes: BTreeMap::new(),
            edges: BTreeSet::new(),
        };

        let start_id = graph.add_node(start, project_root);
        graph.add_line(&start_id, start.declaration_line());

        // Cached edge lists are shared between nodes; walk each one once.
        let mut walked: HashSet<*const IncomingEdge> = HashSet::new();
        let mut stack = vec![(start, start_id)];
        while let Some((node, id)) = stack.pop() {
            if node.is_back_reference() {
                continue;
            }
            let incoming = node.incoming();
            if !incoming.is_empty() && !walked.insert(incoming.as_ptr()) {
                continue;
            }
            for edge in incoming {
                let caller = edge.caller();
                let caller_id = graph.add_node(caller, project_root);
                for site in edge.call_sites() {
                    graph.add_line(&caller_id, site.start.line);
                }
                graph.edges.insert((caller_id.clone(), id.clone()));
                stack.push((caller, caller_id));
            }
        }

        graph
    }

    fn add_node(&mut self, node: &CallHierarchyNode, project_root: Option<&Utf8Path>) -> String {
        let path = relative_path(node.identity().uri(), project_root);
        let id = format!("{}_{path}", node.name());
        let entry = self.nodes.entry(id.clone()).or_insert_with(|| GraphNode {
            name: node.name().to_owned(),
            path,
            lines: BTreeSet::new(),
            root: false,
        });
        entry.root |= node.is_root();
        id
    }

    fn add_line(&mut self, id: &str, zero_based: u32) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.lines.insert(zero_based.saturating_add(1));
        }
    }

    /// Name of the start symbol.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Number of distinct nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Looks a node up by its id (`name_path`).
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// First node with the given symbol name, in id order.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&GraphNode> {
        self.nodes.values().find(|node| node.name == name)
    }

    /// Nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Edges as `(caller_id, callee_id)`, sorted.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges
            .iter()
            .map(|(caller, callee)| (caller.as_str(), callee.as_str()))
    }

    /// Whether some node named `caller` has an edge to some node named
    /// `callee`.
    #[must_use]
    pub fn has_edge_between(&self, caller: &str, callee: &str) -> bool {
        self.edges.iter().any(|(from, to)| {
            self.nodes.get(from).is_some_and(|node| node.name == caller)
                && self.nodes.get(to).is_some_and(|node| node.name == callee)
        })
    }

    /// Renders the graph in Graphviz DOT syntax.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut lines = vec![
            format!("digraph \"{}CallHierarchy\" {{", escape(&self.title)),
            format!("  {GRAPH_ATTRIBUTES}"),
            format!("  {NODE_ATTRIBUTES}"),
            format!("  {EDGE_ATTRIBUTES}"),
        ];
        for (id, node) in &self.nodes {
            let class = if node.root { ", class=\"root\"" } else { "" };
            lines.push(format!(
                "  \"{}\" [label=\"{}\"{class}];",
                escape(id),
                node.label()
            ));
        }
        for (caller, callee) in &self.edges {
            lines.push(format!("  \"{}\" -> \"{}\";", escape(caller), escape(callee)));
        }
        lines.push("}".to_owned());
        let mut dot = lines.join("\n");
        dot.push('\n');
        dot
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
