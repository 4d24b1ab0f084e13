//! Changes to the result of an observed query.

use sylva_core::NodeId;

/// The difference between two results of a query.
///
/// All lists are sorted by node id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Nodes that started matching
    pub added: Vec<NodeId>,
    /// Nodes that stopped matching
    pub removed: Vec<NodeId>,
    /// The complete result after the change
    pub current_result: Vec<NodeId>,
}

impl ChangeSet {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the nodes that joined and left a sorted result, returning
    /// the change. `entered` and `left` must be sorted; only the affected
    /// positions of `result` are touched.
    pub fn apply(result: &mut Vec<NodeId>, entered: Vec<NodeId>, left: Vec<NodeId>) -> Self {
        for node in &left {
            if let Ok(at) = result.binary_search(node) {
                result.remove(at);
            }
        }
        for &node in &entered {
            if let Err(at) = result.binary_search(&node) {
                result.insert(at, node);
            }
        }
        Self {
            added: entered,
            removed: left,
            current_result: result.clone(),
        }
    }

    /// Returns true if nothing was added or removed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Returns the number of additions and removals.
    #[inline]
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len()
    }
}
