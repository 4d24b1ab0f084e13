//! End-to-end update and invalidation scenarios.

use hashbrown::HashSet;
use std::panic::{self, AssertUnwindSafe};
use sylva_core::{Error, MemoryTree, NodeId};
use sylva_query::{Filter, ModelQuery, RootQuery, StringOp, Subquery};
use sylva_reactive::QueryExecutor;

struct Fixture {
    executor: QueryExecutor<MemoryTree>,
    r: NodeId,
    a: NodeId,
    b: NodeId,
}

/// R with children A (name = "A") and B (name = "B").
fn fixture() -> Fixture {
    let mut tree = MemoryTree::new();
    let r = tree.root();
    let a = tree.add_child(r, "members", None).unwrap();
    tree.set_property(a, "name", Some("A")).unwrap();
    let b = tree.add_child(r, "members", None).unwrap();
    tree.set_property(b, "name", Some("B")).unwrap();
    tree.take_changes();
    Fixture {
        executor: QueryExecutor::new(tree, r),
        r,
        a,
        b,
    }
}

fn all_children(filter: Filter) -> ModelQuery {
    ModelQuery::new().root(RootQuery::root_node().query(Subquery::all_children().filter(filter)))
}

fn children_named_a() -> ModelQuery {
    all_children(Filter::property("name", StringOp::equals("A")))
}

fn set(nodes: &[NodeId]) -> HashSet<NodeId> {
    nodes.iter().copied().collect()
}

fn update(
    executor: &mut QueryExecutor<MemoryTree>,
    query: &ModelQuery,
) -> (Vec<NodeId>, HashSet<NodeId>) {
    let mut calls = Vec::new();
    let changed = executor.update(query, |node| calls.push(node)).unwrap();
    (calls, changed)
}

fn apply_changes(executor: &mut QueryExecutor<MemoryTree>) -> usize {
    let changed = executor.tree_mut().take_changes();
    executor.invalidate(changed).unwrap()
}

#[test]
fn test_first_update_reports_new_matches() {
    let Fixture { mut executor, a, .. } = fixture();

    let (calls, changed) = update(&mut executor, &children_named_a());

    assert_eq!(calls, vec![a]);
    assert_eq!(changed, set(&[a]));
}

#[test]
fn test_second_update_is_idempotent() {
    let Fixture { mut executor, .. } = fixture();
    let query = children_named_a();
    update(&mut executor, &query);

    let report = executor.update_report(&query, |_| panic!("nothing to confirm")).unwrap();

    assert!(report.confirmed.is_empty());
    assert!(report.is_unchanged());
    assert_eq!(report.rederived, 0);
    assert_eq!(report.resolved, 0);
}

#[test]
fn test_rename_to_match() {
    let Fixture { mut executor, b, .. } = fixture();
    let query = children_named_a();
    update(&mut executor, &query);

    executor.tree_mut().set_property(b, "name", Some("A")).unwrap();
    executor.tree_mut().take_changes();
    executor.invalidate([b]).unwrap();
    let (calls, changed) = update(&mut executor, &query);

    assert_eq!(calls, vec![b]);
    assert_eq!(changed, set(&[b]));
}

#[test]
fn test_removed_node_is_reported_without_callback() {
    let Fixture { mut executor, r, a, b } = fixture();
    let query = children_named_a();
    update(&mut executor, &query);

    executor.tree_mut().remove_node(a).unwrap();
    executor.tree_mut().take_changes();
    executor.invalidate([r]).unwrap();
    let (calls, changed) = update(&mut executor, &query);

    assert!(calls.is_empty());
    assert_eq!(changed, set(&[a]));
    assert_eq!(executor.matched_nodes(), Vec::<NodeId>::new());

    // B is still tracked and can start matching later.
    executor.tree_mut().set_property(b, "name", Some("A")).unwrap();
    apply_changes(&mut executor);
    let (calls, _) = update(&mut executor, &query);
    assert_eq!(calls, vec![b]);
}

#[test]
fn test_invalid_pattern_fails_first_update() {
    let Fixture { mut executor, .. } = fixture();
    let query = all_children(Filter::property("name", StringOp::matches_regex("[")));

    let err = executor.update(&query, |_| {}).unwrap_err();

    assert!(matches!(err, Error::PatternCompile { ref pattern, .. } if pattern == "["));
    assert!(executor.query().is_none());
    assert_eq!(executor.cached_entries(), 0);
    assert!(!executor.is_in_flight());
}

#[test]
fn test_failed_update_rolls_back_and_can_be_retried() {
    let Fixture { mut executor, a, .. } = fixture();
    let query = ModelQuery::new().root(RootQuery::root_node().query(
        Subquery::all_children().filter(Filter::and(vec![
            Filter::property("kind", StringOp::equals("x")),
            Filter::property("name", StringOp::matches_regex("[")),
        ])),
    ));

    // `kind` is unset everywhere, so the pattern is never compiled.
    let (calls, changed) = update(&mut executor, &query);
    assert!(calls.is_empty());
    assert!(changed.is_empty());
    let entries = executor.cached_entries();

    executor.tree_mut().set_property(a, "kind", Some("x")).unwrap();
    assert_eq!(apply_changes(&mut executor), 1);

    let err = executor.update(&query, |_| {}).unwrap_err();
    assert!(err.is_pattern_compile());
    assert_eq!(executor.cached_entries(), entries);

    // The entry is still invalid, so the retry evaluates it again.
    assert!(executor.update(&query, |_| {}).unwrap_err().is_pattern_compile());

    executor.tree_mut().set_property(a, "kind", None).unwrap();
    // Already invalid after the rollback.
    assert_eq!(apply_changes(&mut executor), 0);
    let report = executor.update_report(&query, |_| {}).unwrap();
    assert!(report.is_unchanged());
    assert_eq!(report.rederived, 1);
}

#[test]
fn test_rollback_frees_entries_allocated_by_failed_pass() {
    let mut tree = MemoryTree::new();
    let r = tree.root();
    let a = tree.add_child(r, "members", None).unwrap();
    tree.set_property(a, "name", Some("A")).unwrap();
    let a1 = tree.add_child(a, "members", None).unwrap();
    let b = tree.add_child(r, "members", None).unwrap();
    tree.take_changes();

    let query = ModelQuery::new().root(
        RootQuery::root_node().query(
            Subquery::all_children()
                .filter(Filter::or(vec![
                    Filter::property("name", StringOp::equals("A")),
                    Filter::and(vec![
                        Filter::property("kind", StringOp::equals("x")),
                        Filter::property("name", StringOp::matches_regex("(")),
                    ]),
                ]))
                .query(Subquery::all_children()),
        ),
    );

    let mut executor = QueryExecutor::new(tree, r);
    update(&mut executor, &query);
    assert_eq!(executor.matched_nodes(), vec![a, a1]);
    let entries = executor.cached_entries();

    let c = executor.tree_mut().add_child(r, "members", None).unwrap();
    executor.tree_mut().set_property(c, "name", Some("A")).unwrap();
    executor.tree_mut().set_property(b, "kind", Some("x")).unwrap();
    executor.tree_mut().set_property(b, "name", Some("B")).unwrap();
    apply_changes(&mut executor);

    assert!(executor.update(&query, |_| {}).is_err());
    assert_eq!(executor.cached_entries(), entries);
    assert_eq!(executor.matched_nodes(), vec![a, a1]);

    executor.tree_mut().set_property(b, "kind", None).unwrap();
    apply_changes(&mut executor);
    let (calls, changed) = update(&mut executor, &query);
    assert_eq!(calls, vec![c]);
    assert_eq!(changed, set(&[c]));
    assert_eq!(executor.matched_nodes(), vec![a, a1, c]);
}

#[test]
fn test_callbacks_of_failed_first_pass_are_repeated() {
    let Fixture { mut executor, a, b, .. } = fixture();
    let query = ModelQuery::new().root(RootQuery::root_node().query(
        Subquery::all_children().filter(Filter::or(vec![
            Filter::property("name", StringOp::equals("A")),
            Filter::property("name", StringOp::matches_regex("[")),
        ])),
    ));

    let mut calls = Vec::new();
    assert!(executor.update(&query, |node| calls.push(node)).is_err());
    assert_eq!(calls, vec![a]);

    executor.tree_mut().set_property(b, "name", Some("A")).unwrap();
    apply_changes(&mut executor);
    let (calls, changed) = update(&mut executor, &query);
    assert_eq!(calls, vec![a, b]);
    assert_eq!(changed, set(&[a, b]));
}

#[test]
fn test_invalidation_touches_only_affected_entries() {
    let Fixture { mut executor, r, b, .. } = fixture();
    let query = children_named_a();
    update(&mut executor, &query);

    assert_eq!(executor.invalidate([b]).unwrap(), 1);
    let report = executor.update_report(&query, |_| {}).unwrap();
    assert_eq!(report.rederived, 1);
    assert_eq!(report.resolved, 0);
    assert!(report.is_unchanged());

    // The root node entry and the root query entry are both keyed to R.
    assert_eq!(executor.invalidate([r]).unwrap(), 2);
    let report = executor.update_report(&query, |_| {}).unwrap();
    assert_eq!(report.rederived, 1);
    assert_eq!(report.resolved, 2);
    assert!(report.confirmed.is_empty());
    assert!(report.is_unchanged());

    assert_eq!(executor.invalidate([NodeId::new(999)]).unwrap(), 0);
}

#[test]
fn test_empty_or_and_empty_and_match_everything() {
    for filter in [Filter::or(vec![]), Filter::and(vec![])] {
        let Fixture { mut executor, a, b, .. } = fixture();
        let query = all_children(filter);
        let (calls, _) = update(&mut executor, &query);
        assert_eq!(calls, vec![a, b]);
    }
}

#[test]
fn test_missing_property_only_matches_is_null() {
    let Fixture { mut executor, a, b, .. } = fixture();
    let is_not_null = all_children(Filter::property("kind", StringOp::is_not_null()));
    let (calls, _) = update(&mut executor, &is_not_null);
    assert!(calls.is_empty());

    let is_null = all_children(Filter::property("kind", StringOp::is_null()));
    let (calls, changed) = update(&mut executor, &is_null);
    assert_eq!(calls, vec![a, b]);
    assert_eq!(changed, set(&[a, b]));
}

#[test]
fn test_by_identity_root_follows_removal_and_recreation() {
    let Fixture { mut executor, a, .. } = fixture();
    let a1 = executor.tree_mut().add_child(a, "members", None).unwrap();
    executor.tree_mut().take_changes();

    let query =
        ModelQuery::new().root(RootQuery::by_id(a.serialize()).query(Subquery::all_children()));
    let (calls, _) = update(&mut executor, &query);
    assert_eq!(calls, vec![a1]);

    executor.tree_mut().remove_node(a).unwrap();
    apply_changes(&mut executor);
    let (calls, changed) = update(&mut executor, &query);
    assert!(calls.is_empty());
    assert_eq!(changed, set(&[a1]));

    let missing = ModelQuery::new().root(RootQuery::by_id("n999").query(Subquery::all_children()));
    let (calls, changed) = update(&mut executor, &missing);
    assert!(calls.is_empty());
    assert!(changed.is_empty());
}

#[test]
fn test_reference_subquery_tracks_target() {
    let Fixture { mut executor, a, b, .. } = fixture();
    executor.tree_mut().set_reference(b, "target", Some(a)).unwrap();
    executor.tree_mut().take_changes();

    let query = ModelQuery::new().root(
        RootQuery::root_node().query(
            Subquery::all_children()
                .filter(Filter::property("name", StringOp::equals("B")))
                .query(Subquery::reference("target")),
        ),
    );
    let (calls, _) = update(&mut executor, &query);
    assert_eq!(calls, vec![b, a]);

    executor.tree_mut().set_reference(b, "target", None).unwrap();
    apply_changes(&mut executor);
    let (calls, changed) = update(&mut executor, &query);
    assert_eq!(calls, vec![b]);
    assert_eq!(changed, set(&[a]));
}

#[test]
fn test_descendants_follow_moves() {
    let Fixture { mut executor, a, b, .. } = fixture();
    let deep = executor.tree_mut().add_child(b, "members", None).unwrap();
    executor.tree_mut().set_property(deep, "name", Some("deep")).unwrap();
    executor.tree_mut().take_changes();

    let query = ModelQuery::new().root(
        RootQuery::by_id(a.serialize())
            .query(
                Subquery::descendants().filter(Filter::property("name", StringOp::equals("deep"))),
            ),
    );
    let (calls, _) = update(&mut executor, &query);
    assert!(calls.is_empty());

    executor.tree_mut().move_node(deep, a, "members").unwrap();
    apply_changes(&mut executor);
    let (calls, changed) = update(&mut executor, &query);
    assert_eq!(calls, vec![deep]);
    assert_eq!(changed, set(&[deep]));
}

#[test]
fn test_panicking_callback_poisons_executor_until_reset() {
    let Fixture { mut executor, a, .. } = fixture();
    let query = children_named_a();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let _ = executor.update(&query, |_| panic!("callback failed"));
    }));
    assert!(outcome.is_err());
    assert!(executor.is_in_flight());
    assert!(executor.update(&query, |_| {}).unwrap_err().is_reentrancy());
    assert!(executor.invalidate([a]).unwrap_err().is_reentrancy());

    executor.reset();
    let (calls, _) = update(&mut executor, &query);
    assert_eq!(calls, vec![a]);
}
