//! Query resolver: candidate nodes of a query position.
//!
//! Candidates are deduplicated by identity, keeping the first occurrence.

use crate::ast::{RootQueryKind, SubqueryKind};
use crate::planner::{PositionKind, QueryPosition};
use hashbrown::HashSet;
use sylva_core::{NodeId, NodeTree};

/// Resolves a root query against the tree.
///
/// `RootNode` always yields `root`. `ByIdentity` yields the referenced node
/// if it resolves, and nothing otherwise.
pub fn resolve_root<T: NodeTree + ?Sized>(
    tree: &T,
    root: NodeId,
    kind: &RootQueryKind,
) -> Vec<NodeId> {
    match kind {
        RootQueryKind::RootNode => vec![root],
        RootQueryKind::ByIdentity { node_id } => tree.resolve(node_id).into_iter().collect(),
    }
}

/// Resolves a subquery relative to its owning node.
pub fn resolve_subquery<T: NodeTree + ?Sized>(
    tree: &T,
    owner: NodeId,
    kind: &SubqueryKind,
) -> Vec<NodeId> {
    let candidates = match kind {
        SubqueryKind::AllChildren => tree.all_children(owner),
        SubqueryKind::ChildrenByRole { role } => tree.children_by_role(owner, role),
        SubqueryKind::Descendants => tree.descendants(owner),
        SubqueryKind::Ancestors => tree.ancestors(owner),
        SubqueryKind::Parent => tree.parent(owner).into_iter().collect(),
        SubqueryKind::ReferenceByRole { role } => {
            tree.reference_target(owner, role).into_iter().collect()
        }
    };
    dedup_first(candidates)
}

/// Resolves a compiled position.
///
/// `anchor` is the executor's root node for root positions and the owning
/// node for subquery positions.
pub fn resolve_position<T: NodeTree + ?Sized>(
    tree: &T,
    position: &QueryPosition,
    anchor: NodeId,
) -> Vec<NodeId> {
    match &position.kind {
        PositionKind::Root(kind) => resolve_root(tree, anchor, kind),
        PositionKind::Sub(kind) => resolve_subquery(tree, anchor, kind),
    }
}

fn dedup_first(mut nodes: Vec<NodeId>) -> Vec<NodeId> {
    if nodes.len() < 2 {
        return nodes;
    }
    let mut seen = HashSet::with_capacity(nodes.len());
    nodes.retain(|node| seen.insert(*node));
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ModelQuery, RootQuery, Subquery};
    use crate::planner::QueryPlan;
    use sylva_core::MemoryTree;

    struct Fixture {
        tree: MemoryTree,
        root: NodeId,
        a: NodeId,
        a1: NodeId,
        b: NodeId,
    }

    fn fixture() -> Fixture {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let a = tree.add_child(root, "members", None).unwrap();
        let a1 = tree.add_child(a, "fields", None).unwrap();
        let b = tree.add_child(root, "imports", None).unwrap();
        tree.set_reference(b, "target", Some(a1)).unwrap();
        Fixture { tree, root, a, a1, b }
    }

    #[test]
    fn test_resolve_root() {
        let f = fixture();
        assert_eq!(resolve_root(&f.tree, f.root, &RootQueryKind::RootNode), vec![f.root]);

        let by_id = RootQueryKind::ByIdentity {
            node_id: f.a.serialize(),
        };
        assert_eq!(resolve_root(&f.tree, f.root, &by_id), vec![f.a]);

        let missing = RootQueryKind::ByIdentity {
            node_id: "n404".into(),
        };
        assert!(resolve_root(&f.tree, f.root, &missing).is_empty());
    }

    #[test]
    fn test_resolve_relations() {
        let f = fixture();
        let t = &f.tree;

        assert_eq!(resolve_subquery(t, f.root, &SubqueryKind::AllChildren), vec![f.a, f.b]);
        assert_eq!(
            resolve_subquery(t, f.root, &SubqueryKind::ChildrenByRole { role: "imports".into() }),
            vec![f.b]
        );
        assert_eq!(
            resolve_subquery(t, f.root, &SubqueryKind::Descendants),
            vec![f.a, f.a1, f.b]
        );
        assert_eq!(resolve_subquery(t, f.a1, &SubqueryKind::Ancestors), vec![f.a, f.root]);
        assert_eq!(resolve_subquery(t, f.a1, &SubqueryKind::Parent), vec![f.a]);
        assert!(resolve_subquery(t, f.root, &SubqueryKind::Parent).is_empty());
        assert_eq!(
            resolve_subquery(t, f.b, &SubqueryKind::ReferenceByRole { role: "target".into() }),
            vec![f.a1]
        );
        let target = SubqueryKind::ReferenceByRole { role: "target".into() };
        assert!(resolve_subquery(t, f.a, &target).is_empty());
    }

    #[test]
    fn test_dangling_reference_resolves_empty() {
        let mut f = fixture();
        f.tree.remove_node(f.a).unwrap();
        let kind = SubqueryKind::ReferenceByRole { role: "target".into() };
        assert!(resolve_subquery(&f.tree, f.b, &kind).is_empty());
    }

    #[test]
    fn test_dedup_keeps_first() {
        let f = fixture();
        assert_eq!(dedup_first(vec![f.b, f.a, f.b, f.a1, f.a]), vec![f.b, f.a, f.a1]);
    }

    #[test]
    fn test_resolve_position() {
        let f = fixture();
        let query =
            ModelQuery::new().root(RootQuery::root_node().query(Subquery::children("members")));
        let plan = QueryPlan::compile(&query);

        let root_position = plan.position(plan.roots()[0]);
        assert_eq!(resolve_position(&f.tree, root_position, f.root), vec![f.root]);

        let sub = plan.position(root_position.nested[0]);
        assert_eq!(resolve_position(&f.tree, sub, f.root), vec![f.a]);
    }
}
