//! Lineage builder traversal, caching and cancellation.

use std::sync::Arc;
use std::thread;

use rstest::{fixture, rstest};

use super::support::{MAIN_URI, ScriptedSource, call, item, item_in};
use crate::{
    CallHierarchyNode, CallHierarchySource, CallerFilter, CancellationToken, Expansion,
    GraphError, LineageBuilder, Path, SymbolIdentity, VisitedCache, enumerate_paths,
};

/// `h` calls `g` on line 3, `g` calls `f` on line 10; nothing calls `h`.
#[fixture]
fn chain() -> ScriptedSource {
    ScriptedSource::new()
        .with_callers("f", vec![call(&item("g", 8), &[10])])
        .with_callers("g", vec![call(&item("h", 1), &[3])])
}

/// `f` is called by `a` and `b`, both of which are called by `c`.
#[fixture]
fn diamond() -> ScriptedSource {
    ScriptedSource::new()
        .with_callers("f", vec![call(&item("a", 10), &[12]), call(&item("b", 20), &[21])])
        .with_callers("a", vec![call(&item("c", 30), &[31])])
        .with_callers("b", vec![call(&item("c", 30), &[33])])
}

fn identity(name: &str) -> SymbolIdentity {
    SymbolIdentity::new(MAIN_URI, name)
}

fn expand_complete<S: CallHierarchySource>(
    builder: &LineageBuilder<S>,
    name: &str,
    line: u32,
) -> Arc<CallHierarchyNode> {
    match builder
        .expand(item(name, line), &CancellationToken::new())
        .expect("expansion succeeds")
    {
        Expansion::Complete(node) => node,
        Expansion::Cancelled(_) => panic!("expansion of {name} was cancelled"),
    }
}

#[rstest]
fn builds_the_chain_up_to_the_root(chain: ScriptedSource) {
    let builder = LineageBuilder::new(&chain, Arc::new(VisitedCache::new()));

    let start = expand_complete(&builder, "f", 20);

    let edge = start.incoming().first().expect("f has a caller");
    assert_eq!(start.incoming().len(), 1);
    assert_eq!(edge.caller().name(), "g");
    assert_eq!(edge.offsets().collect::<Vec<_>>(), vec![2]);
    let outer = edge.caller().incoming().first().expect("g has a caller");
    assert_eq!(outer.caller().name(), "h");
    assert!(outer.caller().is_root());
    assert!(!start.is_root());
}

#[rstest]
fn start_without_callers_is_a_root(chain: ScriptedSource) {
    let builder = LineageBuilder::new(&chain, Arc::new(VisitedCache::new()));

    let start = expand_complete(&builder, "h", 1);

    assert!(start.incoming().is_empty());
    assert!(start.is_root());
    assert!(builder.cache().contains(&identity("h")));
}

#[rstest]
fn cached_start_needs_no_round_trips(chain: ScriptedSource) {
    let builder = LineageBuilder::new(&chain, Arc::new(VisitedCache::new()));
    expand_complete(&builder, "f", 20);
    chain.reset_queries();

    let again = expand_complete(&builder, "f", 20);
    let inner = expand_complete(&builder, "g", 8);

    assert_eq!(chain.total_queries(), 0);
    assert_eq!(again.incoming().len(), 1);
    assert_eq!(inner.incoming().len(), 1);
    assert_eq!(builder.cache().stats().hits, 2);
}

#[rstest]
fn shared_callers_are_expanded_once(diamond: ScriptedSource) {
    let builder = LineageBuilder::new(&diamond, Arc::new(VisitedCache::new()));

    let start = expand_complete(&builder, "f", 0);

    assert_eq!(diamond.queries_for("c"), 1);
    assert_eq!(diamond.total_queries(), 4);
    let roots: Vec<_> = enumerate_paths(&start)
        .iter()
        .map(|path| path.root().to_owned())
        .collect();
    assert_eq!(roots, vec!["c".to_owned(), "c".to_owned()]);
}

#[rstest]
fn self_recursion_terminates_with_a_back_reference() {
    let source = ScriptedSource::new()
        .with_callers("f", vec![call(&item("f", 5), &[7]), call(&item("main", 0), &[2])]);
    let builder = LineageBuilder::new(&source, Arc::new(VisitedCache::new()));

    let start = expand_complete(&builder, "f", 5);

    let back = start
        .incoming()
        .iter()
        .find(|edge| edge.caller().is_back_reference())
        .expect("recursive call is kept as a back-reference");
    assert_eq!(back.caller().name(), "f");
    assert!(!back.caller().is_root());
    assert_eq!(source.queries_for("f"), 1);
    assert!(builder.cache().contains(&identity("f")));
}

#[rstest]
fn mutual_recursion_caches_only_closed_subtrees() {
    let source = ScriptedSource::new()
        .with_callers("f", vec![call(&item("g", 10), &[12])])
        .with_callers("g", vec![call(&item("f", 0), &[3]), call(&item("main", 40), &[44])]);
    let builder = LineageBuilder::new(&source, Arc::new(VisitedCache::new()));

    let start = expand_complete(&builder, "f", 0);

    let cache = builder.cache();
    assert!(cache.contains(&identity("f")));
    assert!(cache.contains(&identity("main")));
    assert!(!cache.contains(&identity("g")));
    let rendered: Vec<_> = enumerate_paths(&start).iter().map(Path::render).collect();
    assert_eq!(rendered, vec!["main.4.2".to_owned()]);
}

#[rstest]
#[case(2)]
#[case(4)]
#[case(7)]
fn strongly_connected_callers_are_queried_once_each(#[case] size: u32) {
    let members: Vec<_> = (0..size)
        .map(|index| item(&format!("n{index}"), 100 * (index + 1)))
        .collect();
    let mut source = ScriptedSource::new().with_callers(
        "f",
        members.iter().map(|member| call(member, &[member.range.start.line + 2])).collect(),
    );
    for callee in &members {
        let others = members
            .iter()
            .filter(|other| other.name != callee.name)
            .map(|other| call(other, &[other.range.start.line + 3]))
            .collect();
        source = source.with_callers(&callee.name, others);
    }
    let builder = LineageBuilder::new(&source, Arc::new(VisitedCache::new()));

    let start = expand_complete(&builder, "f", 0);

    assert_eq!(source.total_queries(), usize::try_from(size).expect("small") + 1);
    assert_eq!(start.incoming().len(), members.len());
    assert!(builder.cache().contains(&identity("f")));
    assert!(enumerate_paths(&start).is_empty());
}

#[rstest]
fn invalidated_entries_are_fetched_again(chain: ScriptedSource) {
    let builder = LineageBuilder::new(&chain, Arc::new(VisitedCache::new()));
    expand_complete(&builder, "f", 20);
    chain.reset_queries();

    assert!(builder.cache().invalidate(&identity("g")));
    assert!(!builder.cache().invalidate(&identity("g")));
    let inner = expand_complete(&builder, "g", 8);

    assert_eq!(chain.queries_for("g"), 1);
    assert_eq!(chain.total_queries(), 1);
    assert_eq!(inner.incoming().len(), 1);
    assert!(builder.cache().contains(&identity("g")));
}

#[rstest]
fn cancelled_token_stops_before_any_query(chain: ScriptedSource) {
    let builder = LineageBuilder::new(&chain, Arc::new(VisitedCache::new()));
    let token = CancellationToken::new();
    token.cancel();

    let expansion = builder.expand(item("f", 20), &token).expect("no error");

    assert!(!expansion.is_complete());
    assert_eq!(expansion.node().name(), "f");
    assert_eq!(chain.total_queries(), 0);
}

#[rstest]
fn cancellation_mid_traversal_returns_a_partial_tree() {
    let token = CancellationToken::new();
    let source = ScriptedSource::new()
        .with_callers("f", vec![call(&item("g", 8), &[10])])
        .with_callers("g", vec![call(&item("h", 1), &[3])])
        .cancelling_at("g", token.clone());
    let builder = LineageBuilder::new(&source, Arc::new(VisitedCache::new()));

    let expansion = builder.expand(item("f", 20), &token).expect("no error");

    let Expansion::Cancelled(partial) = expansion else {
        panic!("expected a cancelled expansion");
    };
    assert_eq!(partial.name(), "f");
    let edge = partial.incoming().first().expect("g was reached");
    assert_eq!(edge.caller().name(), "g");
    assert!(edge.caller().incoming().is_empty());
    assert!(builder.cache().is_empty());
    assert_eq!(source.queries_for("h"), 0);
}

#[rstest]
fn collaborator_errors_abort_without_caching() {
    let source = ScriptedSource::new()
        .with_callers("f", vec![call(&item("g", 8), &[10])])
        .with_callers("g", vec![call(&item("h", 1), &[3])])
        .failing_for("h");
    let builder = LineageBuilder::new(&source, Arc::new(VisitedCache::new()));

    let outcome = builder.expand(item("f", 20), &CancellationToken::new());

    assert!(matches!(outcome, Err(GraphError::Source { .. })));
    assert!(builder.cache().is_empty());
}

#[rstest]
fn excluded_callers_are_skipped() {
    let source = ScriptedSource::new().with_callers(
        "f",
        vec![
            call(&item_in("file:///ws/main_test.go", "TestF", 3), &[5]),
            call(&item_in("file:///ws/component_test/run.go", "run", 1), &[2]),
            call(&item("g", 8), &[10]),
        ],
    );
    let filter = CallerFilter::allow_all()
        .exclude_suffix("_test.go")
        .exclude_fragment("component_test");
    let builder =
        LineageBuilder::new(&source, Arc::new(VisitedCache::new())).with_filter(filter);

    let start = expand_complete(&builder, "f", 20);

    let callers: Vec<_> = start
        .incoming()
        .iter()
        .map(|edge| edge.caller().name().to_owned())
        .collect();
    assert_eq!(callers, vec!["g".to_owned()]);
    assert_eq!(source.queries_for("TestF"), 0);
}

#[rstest]
fn repeated_callers_merge_into_one_edge() {
    let caller = item("g", 8);
    let source = ScriptedSource::new()
        .with_callers("f", vec![call(&caller, &[10, 10]), call(&caller, &[14, 10])]);
    let builder = LineageBuilder::new(&source, Arc::new(VisitedCache::new()));

    let start = expand_complete(&builder, "f", 20);

    assert_eq!(start.incoming().len(), 1);
    let edge = start.incoming().first().expect("one edge");
    let lines: Vec<_> = edge.call_sites().iter().map(|site| site.start.line).collect();
    assert_eq!(lines, vec![10, 14]);
}

#[rstest]
fn calls_without_ranges_fall_back_to_the_selection_range() {
    let source = ScriptedSource::new().with_callers("f", vec![call(&item("g", 8), &[])]);
    let builder = LineageBuilder::new(&source, Arc::new(VisitedCache::new()));

    let start = expand_complete(&builder, "f", 20);

    let edge = start.incoming().first().expect("one edge");
    assert_eq!(edge.call_sites().len(), 1);
    assert_eq!(edge.offsets().collect::<Vec<_>>(), vec![0]);
}

#[rstest]
fn concurrent_traversals_share_one_cache(diamond: ScriptedSource) {
    let cache = Arc::new(VisitedCache::new());
    let starts = [("f", 0), ("a", 10), ("b", 20), ("f", 0)];

    let roots: Vec<Vec<String>> = thread::scope(|scope| {
        let handles: Vec<_> = starts
            .iter()
            .map(|&(name, line)| {
                let builder = LineageBuilder::new(&diamond, Arc::clone(&cache));
                scope.spawn(move || {
                    let start = expand_complete(&builder, name, line);
                    enumerate_paths(&start)
                        .iter()
                        .map(Path::render)
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("traversal thread"))
            .collect()
    });

    assert_eq!(
        roots,
        vec![
            vec!["c.3.1".to_owned(), "c.1.2".to_owned()],
            vec!["c.1".to_owned()],
            vec!["c.3".to_owned()],
            vec!["c.3.1".to_owned(), "c.1.2".to_owned()],
        ]
    );
    for name in ["f", "a", "b", "c"] {
        assert!(cache.contains(&identity(name)), "{name} is cached");
    }
}
