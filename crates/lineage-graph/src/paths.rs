//! Root-to-target paths and their compact rendering.
//!
//! A path is written as the root's name followed by one line offset per
//! call, root first: `main.4.12` reads "line 4 of `main` calls something
//! whose line 12 calls the target".

use std::collections::{BTreeMap, HashSet};

use lineage_config::{Config, DEFAULT_BARE_ROOTS, DEFAULT_MAX_DISPLAY_WIDTH};
use unicode_width::UnicodeWidthStr;

use crate::node::CallHierarchyNode;

/// Separator between rendered root summaries.
const SUMMARY_SEPARATOR: &str = ", ";

/// One call on a path: the calling symbol and the call's line offset from
/// that symbol's declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    /// Name of the calling symbol.
    pub name: String,
    /// Call-site line minus the caller's declaration line.
    pub offset: i64,
}

impl PathSegment {
    /// Creates a segment.
    #[must_use]
    pub fn new(name: impl Into<String>, offset: i64) -> Self {
        Self {
            name: name.into(),
            offset,
        }
    }
}

/// A chain of calls from a root to the start node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    root: String,
    segments: Vec<PathSegment>,
}

impl Path {
    /// Creates a path; `segments` run from the root toward the start node.
    #[must_use]
    pub fn new(root: impl Into<String>, segments: Vec<PathSegment>) -> Self {
        Self {
            root: root.into(),
            segments,
        }
    }

    /// Name of the root symbol.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Calls from the root toward the start node.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Line offsets in root-first order.
    #[must_use]
    pub fn offsets(&self) -> Vec<i64> {
        self.segments.iter().map(|segment| segment.offset).collect()
    }

    /// Keeps at most `max` segments, dropping those nearest the start node.
    ///
    /// `0` keeps everything. Truncating twice to the same limit changes
    /// nothing the second time.
    #[must_use]
    pub fn truncate(mut self, max: usize) -> Self {
        if max > 0 {
            self.segments.truncate(max);
        }
        self
    }

    /// Renders `root.o1.o2...`.
    #[must_use]
    pub fn render(&self) -> String {
        let offsets = join_offsets(&self.offsets());
        if offsets.is_empty() {
            self.root.clone()
        } else {
            format!("{}.{offsets}", self.root)
        }
    }
}

/// Settings for [`summarize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOptions {
    /// Segment limit per path; `0` is unlimited.
    pub max_segments: usize,
    /// Width the joined summary should fit in.
    pub max_width: usize,
    /// Roots rendered as their bare name.
    pub bare_roots: Vec<String>,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            max_segments: 0,
            max_width: DEFAULT_MAX_DISPLAY_WIDTH,
            bare_roots: DEFAULT_BARE_ROOTS.iter().map(|&root| root.to_owned()).collect(),
        }
    }
}

impl SummaryOptions {
    /// Takes the summary settings from the configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_segments: config.max_path_segments,
            max_width: config.display_width(),
            bare_roots: config.bare_roots.clone(),
        }
    }
}

/// Lists one path per root reachable from `start`, one per call site.
///
/// Back-reference nodes end a branch without producing a path: they close a
/// cycle and are not roots.
#[must_use]
pub fn enumerate_paths(start: &CallHierarchyNode) -> Vec<Path> {
    let mut paths = Vec::new();
    // Segments are collected target-first and reversed when a root is hit.
    let mut stack: Vec<(&CallHierarchyNode, Vec<PathSegment>)> = vec![(start, Vec::new())];

    while let Some((node, reversed)) = stack.pop() {
        if node.is_back_reference() {
            continue;
        }
        if node.incoming().is_empty() {
            let segments = reversed.iter().rev().cloned().collect();
            paths.push(Path::new(node.name(), segments));
            continue;
        }
        for edge in node.incoming() {
            let caller = edge.caller();
            for offset in edge.offsets() {
                let mut extended = reversed.clone();
                extended.push(PathSegment::new(caller.name(), offset));
                stack.push((caller, extended));
            }
        }
    }

    paths
}

/// Removes repeated paths, keeping the first occurrence of each.
#[must_use]
pub fn dedup_paths(paths: Vec<Path>) -> Vec<Path> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// Renders the span between two paths of the same root.
///
/// Identical offset sequences render as the plain path; otherwise the shared
/// leading offsets are followed by `[rest_of_a..rest_of_b]`.
#[must_use]
pub fn compress(smallest: &Path, largest: &Path) -> String {
    let low = smallest.offsets();
    let high = largest.offsets();
    if low == high {
        return smallest.render();
    }

    let shared = low
        .iter()
        .zip(&high)
        .take_while(|(left, right)| left == right)
        .count();
    let (prefix, low_rest) = low.split_at(shared);
    let high_rest = high.get(shared..).unwrap_or_default();

    let mut rendered = smallest.root().to_owned();
    rendered.push('.');
    if !prefix.is_empty() {
        rendered.push_str(&join_offsets(prefix));
        rendered.push('.');
    }
    rendered.push('[');
    rendered.push_str(&join_offsets(low_rest));
    rendered.push_str("..");
    rendered.push_str(&join_offsets(high_rest));
    rendered.push(']');
    rendered
}

/// Produces the one-line summary of where the start node is reached from.
///
/// Paths are truncated, grouped by root (in name order) and each group is
/// compressed between its smallest and largest offset sequence. Whole
/// summaries are dropped from the end until the line fits the configured
/// width, and the number dropped is appended.
#[must_use]
pub fn summarize(paths: &[Path], options: &SummaryOptions) -> String {
    let mut groups: BTreeMap<&str, Vec<Path>> = BTreeMap::new();
    for path in paths {
        groups
            .entry(path.root())
            .or_default()
            .push(path.clone().truncate(options.max_segments));
    }

    let mut summaries: Vec<String> = groups
        .into_iter()
        .filter_map(|(root, group)| {
            if options.bare_roots.iter().any(|bare| bare == root) {
                return Some(root.to_owned());
            }
            let smallest = group.iter().min_by_key(|path| path.offsets())?;
            let largest = group.iter().max_by_key(|path| path.offsets())?;
            Some(compress(smallest, largest))
        })
        .collect();

    let mut dropped = 0_usize;
    let mut line = summaries.join(SUMMARY_SEPARATOR);
    while line.width() > options.max_width && summaries.len() > 1 {
        summaries.pop();
        dropped += 1;
        line = summaries.join(SUMMARY_SEPARATOR);
    }
    if dropped > 0 {
        line.push_str(&format!(", and {dropped} more"));
    }
    line
}

fn join_offsets(offsets: &[i64]) -> String {
    offsets
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(".")
}
