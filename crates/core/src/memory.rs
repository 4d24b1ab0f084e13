//! In-memory model tree with change tracking.
//!
//! `MemoryTree` is a simple owner of model nodes that implements `NodeTree`.
//! Every mutation records the nodes whose query-visible state changed, so
//! that the recorded set can be fed to an executor's `invalidate` call.
//!
//! Recorded nodes per mutation:
//!
//! - property, reference and concept changes: the node itself
//! - structural changes (add, remove, move): the affected parents together
//!   with all of their ancestors (their descendant sets changed), the moved
//!   or removed subtree (their ancestor sets changed), and for removals every
//!   node that still references into the removed subtree

use crate::error::{Error, Result};
use crate::node::NodeId;
use crate::tree::NodeTree;
use hashbrown::{HashMap, HashSet};

/// Concept of a node: a stable UID plus its qualified name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Concept {
    pub uid: String,
    pub long_name: String,
}

impl Concept {
    /// Creates a new concept.
    pub fn new(uid: impl Into<String>, long_name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            long_name: long_name.into(),
        }
    }
}

#[derive(Clone, Debug, Default)]
struct NodeData {
    parent: Option<NodeId>,
    role: Option<String>,
    concept: Option<Concept>,
    properties: HashMap<String, String>,
    references: HashMap<String, NodeId>,
    children: Vec<NodeId>,
}

/// An in-memory tree of model nodes.
#[derive(Clone, Debug)]
pub struct MemoryTree {
    nodes: HashMap<NodeId, NodeData>,
    root: NodeId,
    next_id: u64,
    changes: HashSet<NodeId>,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    /// Creates a tree that contains only a root node.
    pub fn new() -> Self {
        let root = NodeId::new(1);
        let mut nodes = HashMap::new();
        nodes.insert(root, NodeData::default());
        Self {
            nodes,
            root,
            next_id: 2,
            changes: HashSet::new(),
        }
    }

    /// Returns the root node.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the number of nodes, including the root.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree contains only its root.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Returns the role a node is contained in.
    pub fn role_of(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).and_then(|data| data.role.as_deref())
    }

    /// Adds a new child at the end of `parent`'s children.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        role: &str,
        concept: Option<Concept>,
    ) -> Result<NodeId> {
        if !self.nodes.contains_key(&parent) {
            return Err(Error::node_not_found(parent));
        }

        let id = NodeId::new(self.next_id);
        self.next_id += 1;

        self.nodes.insert(
            id,
            NodeData {
                parent: Some(parent),
                role: Some(role.into()),
                concept,
                ..NodeData::default()
            },
        );
        self.node_mut(parent)?.children.push(id);

        self.record_with_ancestors(parent);
        self.changes.insert(id);
        Ok(id)
    }

    /// Removes a node together with its whole subtree.
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        if node == self.root {
            return Err(Error::invalid_operation("cannot remove the root node"));
        }
        let parent = self
            .nodes
            .get(&node)
            .ok_or_else(|| Error::node_not_found(node))?
            .parent;

        let mut subtree = self.descendants(node);
        subtree.push(node);
        let removed: HashSet<NodeId> = subtree.iter().copied().collect();

        if let Some(parent) = parent {
            self.record_with_ancestors(parent);
            self.node_mut(parent)?.children.retain(|&c| c != node);
        }

        // Referrers outside the removed subtree now point to nothing.
        let referrers: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(id, data)| {
                !removed.contains(*id) && data.references.values().any(|t| removed.contains(t))
            })
            .map(|(id, _)| *id)
            .collect();
        self.changes.extend(referrers);

        for id in subtree {
            self.nodes.remove(&id);
            self.changes.insert(id);
        }
        Ok(())
    }

    /// Moves a node (with its subtree) to the end of `new_parent`'s children.
    pub fn move_node(&mut self, node: NodeId, new_parent: NodeId, role: &str) -> Result<()> {
        if node == self.root {
            return Err(Error::invalid_operation("cannot move the root node"));
        }
        if !self.nodes.contains_key(&new_parent) {
            return Err(Error::node_not_found(new_parent));
        }
        if new_parent == node || self.ancestors(new_parent).contains(&node) {
            return Err(Error::invalid_operation(
                "cannot move a node into its own subtree",
            ));
        }

        let old_parent = self.node(node)?.parent;
        if let Some(old_parent) = old_parent {
            self.record_with_ancestors(old_parent);
            self.node_mut(old_parent)?.children.retain(|&c| c != node);
        }

        {
            let data = self.node_mut(node)?;
            data.parent = Some(new_parent);
            data.role = Some(role.into());
        }
        self.node_mut(new_parent)?.children.push(node);

        self.record_with_ancestors(new_parent);
        self.changes.insert(node);
        let subtree = self.descendants(node);
        self.changes.extend(subtree);
        Ok(())
    }

    /// Sets or clears a property.
    pub fn set_property(&mut self, node: NodeId, role: &str, value: Option<&str>) -> Result<()> {
        let data = self.node_mut(node)?;
        match value {
            Some(value) => {
                data.properties.insert(role.into(), value.into());
            }
            None => {
                data.properties.remove(role);
            }
        }
        self.changes.insert(node);
        Ok(())
    }

    /// Sets or clears a reference.
    pub fn set_reference(
        &mut self,
        node: NodeId,
        role: &str,
        target: Option<NodeId>,
    ) -> Result<()> {
        if let Some(target) = target {
            if !self.nodes.contains_key(&target) {
                return Err(Error::node_not_found(target));
            }
        }
        let data = self.node_mut(node)?;
        match target {
            Some(target) => {
                data.references.insert(role.into(), target);
            }
            None => {
                data.references.remove(role);
            }
        }
        self.changes.insert(node);
        Ok(())
    }

    /// Sets or clears the concept of a node.
    pub fn set_concept(&mut self, node: NodeId, concept: Option<Concept>) -> Result<()> {
        self.node_mut(node)?.concept = concept;
        self.changes.insert(node);
        Ok(())
    }

    /// Returns the nodes changed since the last call, clearing the record.
    pub fn take_changes(&mut self) -> HashSet<NodeId> {
        core::mem::take(&mut self.changes)
    }

    /// Returns true if changes were recorded since the last `take_changes`.
    #[inline]
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    fn node(&self, node: NodeId) -> Result<&NodeData> {
        self.nodes.get(&node).ok_or_else(|| Error::node_not_found(node))
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut NodeData> {
        self.nodes
            .get_mut(&node)
            .ok_or_else(|| Error::node_not_found(node))
    }

    fn record_with_ancestors(&mut self, node: NodeId) {
        self.changes.insert(node);
        let ancestors = self.ancestors(node);
        self.changes.extend(ancestors);
    }
}

impl NodeTree for MemoryTree {
    fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn all_children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    fn children_by_role(&self, node: NodeId, role: &str) -> Vec<NodeId> {
        let Some(data) = self.nodes.get(&node) else {
            return Vec::new();
        };
        data.children
            .iter()
            .copied()
            .filter(|child| self.role_of(*child) == Some(role))
            .collect()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|data| data.parent)
    }

    fn reference_target(&self, node: NodeId, role: &str) -> Option<NodeId> {
        self.nodes
            .get(&node)
            .and_then(|data| data.references.get(role).copied())
            .filter(|target| self.nodes.contains_key(target))
    }

    fn property_value(&self, node: NodeId, role: &str) -> Option<String> {
        self.nodes
            .get(&node)
            .and_then(|data| data.properties.get(role).cloned())
    }

    fn concept_id(&self, node: NodeId) -> Option<String> {
        self.nodes
            .get(&node)
            .and_then(|data| data.concept.as_ref())
            .map(|concept| concept.uid.clone())
    }

    fn concept_long_name(&self, node: NodeId) -> Option<String> {
        self.nodes
            .get(&node)
            .and_then(|data| data.concept.as_ref())
            .map(|concept| concept.long_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept() -> Concept {
        Concept::new("c:1", "lang.structure.Class")
    }

    #[test]
    fn test_memory_tree_new() {
        let tree = MemoryTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 1);
        assert!(tree.contains(tree.root()));
        assert_eq!(tree.parent(tree.root()), None);
    }

    #[test]
    fn test_add_child_roles() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let a = tree.add_child(root, "members", Some(concept())).unwrap();
        let b = tree.add_child(root, "imports", None).unwrap();

        assert_eq!(tree.all_children(root), vec![a, b]);
        assert_eq!(tree.children_by_role(root, "members"), vec![a]);
        assert_eq!(tree.children_by_role(root, "imports"), vec![b]);
        assert!(tree.children_by_role(root, "other").is_empty());
        assert_eq!(tree.concept_id(a).as_deref(), Some("c:1"));
        assert_eq!(tree.concept_long_name(a).as_deref(), Some("lang.structure.Class"));
        assert_eq!(tree.concept_id(b), None);
    }

    #[test]
    fn test_add_child_unknown_parent() {
        let mut tree = MemoryTree::new();
        let result = tree.add_child(NodeId::new(99), "members", None);
        assert!(matches!(result, Err(Error::NodeNotFound { .. })));
    }

    #[test]
    fn test_property_changes_record_node() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let a = tree.add_child(root, "members", None).unwrap();
        tree.take_changes();

        tree.set_property(a, "name", Some("A")).unwrap();
        assert_eq!(tree.property_value(a, "name").as_deref(), Some("A"));

        let changes = tree.take_changes();
        assert_eq!(changes.len(), 1);
        assert!(changes.contains(&a));
        assert!(!tree.has_changes());

        tree.set_property(a, "name", None).unwrap();
        assert_eq!(tree.property_value(a, "name"), None);
    }

    #[test]
    fn test_add_child_records_ancestors() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let a = tree.add_child(root, "members", None).unwrap();
        tree.take_changes();

        let a1 = tree.add_child(a, "members", None).unwrap();
        let changes = tree.take_changes();
        assert!(changes.contains(&a1));
        assert!(changes.contains(&a));
        assert!(changes.contains(&root));
    }

    #[test]
    fn test_remove_node_subtree_and_referrers() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let a = tree.add_child(root, "members", None).unwrap();
        let a1 = tree.add_child(a, "members", None).unwrap();
        let b = tree.add_child(root, "members", None).unwrap();
        tree.set_reference(b, "target", Some(a1)).unwrap();
        tree.take_changes();

        tree.remove_node(a).unwrap();

        assert!(!tree.contains(a));
        assert!(!tree.contains(a1));
        assert_eq!(tree.all_children(root), vec![b]);
        assert_eq!(tree.reference_target(b, "target"), None);

        let changes = tree.take_changes();
        assert!(changes.contains(&root));
        assert!(changes.contains(&a));
        assert!(changes.contains(&a1));
        assert!(changes.contains(&b));
    }

    #[test]
    fn test_remove_root_rejected() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        assert!(matches!(
            tree.remove_node(root),
            Err(Error::InvalidOperation { .. })
        ));
    }

    #[test]
    fn test_move_node() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let a = tree.add_child(root, "members", None).unwrap();
        let b = tree.add_child(root, "members", None).unwrap();
        let b1 = tree.add_child(b, "members", None).unwrap();
        tree.take_changes();

        tree.move_node(b, a, "nested").unwrap();

        assert_eq!(tree.parent(b), Some(a));
        assert_eq!(tree.all_children(root), vec![a]);
        assert_eq!(tree.children_by_role(a, "nested"), vec![b]);
        assert_eq!(tree.ancestors(b1), vec![b, a, root]);

        let changes = tree.take_changes();
        for id in [root, a, b, b1] {
            assert!(changes.contains(&id), "{} should be recorded", id);
        }
    }

    #[test]
    fn test_move_into_own_subtree_rejected() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let a = tree.add_child(root, "members", None).unwrap();
        let a1 = tree.add_child(a, "members", None).unwrap();

        assert!(tree.move_node(a, a1, "members").is_err());
        assert!(tree.move_node(a, a, "members").is_err());
        assert_eq!(tree.parent(a1), Some(a));
    }

    #[test]
    fn test_set_reference_unknown_target() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        assert!(tree
            .set_reference(root, "target", Some(NodeId::new(50)))
            .is_err());
    }
}
