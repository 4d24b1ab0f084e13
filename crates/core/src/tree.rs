//! Read-only access to the model tree.
//!
//! The model tree is owned outside of the query engine. The engine only reads
//! it through `NodeTree`, synchronously, during an update pass.

use crate::node::NodeId;
use std::cell::RefCell;
use std::rc::Rc;

/// Read access to a tree of model nodes.
///
/// Relations that do not exist (no parent, unset reference, unknown node)
/// are reported as empty results, never as errors.
pub trait NodeTree {
    /// Returns true if the node is part of the tree.
    fn contains(&self, node: NodeId) -> bool;

    /// Returns all children of a node, in order.
    fn all_children(&self, node: NodeId) -> Vec<NodeId>;

    /// Returns the children of a node contained in the given role.
    fn children_by_role(&self, node: NodeId, role: &str) -> Vec<NodeId>;

    /// Returns the parent of a node.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Returns the target of a node's reference in the given role.
    fn reference_target(&self, node: NodeId, role: &str) -> Option<NodeId>;

    /// Returns a property value.
    fn property_value(&self, node: NodeId, role: &str) -> Option<String>;

    /// Returns the UID of the node's concept.
    fn concept_id(&self, node: NodeId) -> Option<String>;

    /// Returns the qualified name of the node's concept.
    fn concept_long_name(&self, node: NodeId) -> Option<String>;

    /// Resolves a serialized node reference against this tree.
    fn resolve(&self, serialized: &str) -> Option<NodeId> {
        serialized
            .parse::<NodeId>()
            .ok()
            .filter(|&id| self.contains(id))
    }

    /// Returns all descendants in pre-order, excluding the node itself.
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.all_children(node).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.all_children(current).into_iter().rev());
        }
        result
    }

    /// Returns all ancestors from the parent up to the root, excluding the
    /// node itself.
    fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent(node);
        while let Some(id) = current {
            result.push(id);
            current = self.parent(id);
        }
        result
    }
}

macro_rules! forward_node_tree {
    (impl[$($gen:tt)*] for $ty:ty, |$this:ident| $inner:expr) => {
        impl<$($gen)*> NodeTree for $ty {
            fn contains(&self, node: NodeId) -> bool {
                let $this = self;
                $inner.contains(node)
            }

            fn all_children(&self, node: NodeId) -> Vec<NodeId> {
                let $this = self;
                $inner.all_children(node)
            }

            fn children_by_role(&self, node: NodeId, role: &str) -> Vec<NodeId> {
                let $this = self;
                $inner.children_by_role(node, role)
            }

            fn parent(&self, node: NodeId) -> Option<NodeId> {
                let $this = self;
                $inner.parent(node)
            }

            fn reference_target(&self, node: NodeId, role: &str) -> Option<NodeId> {
                let $this = self;
                $inner.reference_target(node, role)
            }

            fn property_value(&self, node: NodeId, role: &str) -> Option<String> {
                let $this = self;
                $inner.property_value(node, role)
            }

            fn concept_id(&self, node: NodeId) -> Option<String> {
                let $this = self;
                $inner.concept_id(node)
            }

            fn concept_long_name(&self, node: NodeId) -> Option<String> {
                let $this = self;
                $inner.concept_long_name(node)
            }

            fn resolve(&self, serialized: &str) -> Option<NodeId> {
                let $this = self;
                $inner.resolve(serialized)
            }

            fn descendants(&self, node: NodeId) -> Vec<NodeId> {
                let $this = self;
                $inner.descendants(node)
            }

            fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
                let $this = self;
                $inner.ancestors(node)
            }
        }
    };
}

forward_node_tree!(impl['a, T: NodeTree + ?Sized] for &'a T, |tree| (**tree));
forward_node_tree!(impl[T: NodeTree + ?Sized] for Rc<T>, |tree| (**tree));
forward_node_tree!(impl[T: NodeTree] for RefCell<T>, |tree| tree.borrow());
