//! The cache entry tree.
//!
//! One tree mirrors one `ModelQuery`:
//!
//! ```text
//! ModelQuery
//!   └─ RootQuery            (one per root query position)
//!        └─ Node            (one per resolved node)
//!             └─ Subquery   (one per nested position, only while the filter passes)
//!                  └─ Node  (one per candidate node)
//!                       └─ ...
//! ```
//!
//! Entries live in an `Arena` and point at their parent by handle. Each
//! entry keeps a structurally shared list of `(NodeId, EntryId)` leaves
//! covering its subtree; the list at the top feeds the reverse index.

use crate::arena::{Arena, EntryId};
use sylva_core::NodeId;
use sylva_incremental::IncrementalList;
use sylva_query::{ModelQuery, PositionId, QueryPlan};

/// Leaves of an entry subtree: every node an entry is keyed to.
pub(crate) type Leaves = IncrementalList<(NodeId, EntryId)>;

#[derive(Clone, Debug)]
pub(crate) enum EntryKind {
    ModelQuery {
        roots: Vec<EntryId>,
    },
    RootQuery {
        position: PositionId,
        children: Vec<(NodeId, EntryId)>,
    },
    Subquery {
        position: PositionId,
        owner: NodeId,
        children: Vec<(NodeId, EntryId)>,
    },
    Node {
        position: PositionId,
        node: NodeId,
        /// Result of the last filter evaluation.
        matched: bool,
        subqueries: Vec<EntryId>,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct CacheEntry {
    pub parent: Option<EntryId>,
    pub valid: bool,
    /// Some strict descendant is invalid.
    pub dirty: bool,
    /// This entry's own leaf. Root query entries are keyed to the executor
    /// root, so structural changes re-resolve identity lookups.
    pub key: Leaves,
    pub leaves: Leaves,
    pub kind: EntryKind,
}

impl CacheEntry {
    pub fn new(parent: Option<EntryId>, key: Leaves, kind: EntryKind) -> Self {
        Self {
            parent,
            valid: false,
            dirty: true,
            key,
            leaves: IncrementalList::empty(),
            kind,
        }
    }

    /// Returns the owned child entries, in order.
    pub fn children(&self) -> Vec<EntryId> {
        match &self.kind {
            EntryKind::ModelQuery { roots } => roots.clone(),
            EntryKind::RootQuery { children, .. } | EntryKind::Subquery { children, .. } => {
                children.iter().map(|&(_, id)| id).collect()
            }
            EntryKind::Node { subqueries, .. } => subqueries.clone(),
        }
    }

    /// Returns the position and node of a node entry whose last filter passed.
    pub fn matched_node(&self) -> Option<(PositionId, NodeId)> {
        match self.kind {
            EntryKind::Node {
                position,
                node,
                matched: true,
                ..
            } => Some((position, node)),
            _ => None,
        }
    }
}

/// A cache tree built for one query.
pub(crate) struct CacheTree {
    pub query: ModelQuery,
    pub plan: QueryPlan,
    pub entries: Arena<CacheEntry>,
    pub root: EntryId,
}

impl CacheTree {
    /// Creates a tree whose entries are all still to be validated.
    pub fn new(query: &ModelQuery, anchor: NodeId) -> Self {
        let plan = QueryPlan::compile(query);
        let mut entries = Arena::new();
        let root = entries.insert(CacheEntry::new(
            None,
            IncrementalList::empty(),
            EntryKind::ModelQuery { roots: Vec::new() },
        ));

        let roots: Vec<EntryId> = plan
            .roots()
            .iter()
            .map(|&position| {
                entries.insert_with(|id| {
                    CacheEntry::new(
                        Some(root),
                        IncrementalList::of((anchor, id)),
                        EntryKind::RootQuery {
                            position,
                            children: Vec::new(),
                        },
                    )
                })
            })
            .collect();

        if let Some(entry) = entries.get_mut(root) {
            entry.kind = EntryKind::ModelQuery { roots };
        }

        Self {
            query: query.clone(),
            plan,
            entries,
            root,
        }
    }

    /// Marks an entry invalid and flags its ancestors.
    ///
    /// Propagation stops at the first ancestor already flagged, whose own
    /// ancestors are flagged as well. Returns false for stale handles and
    /// entries that were already invalid.
    pub fn invalidate(&mut self, id: EntryId) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        if !entry.valid {
            return false;
        }
        entry.valid = false;

        let mut parent = entry.parent;
        while let Some(ancestor) = parent.and_then(|p| self.entries.get_mut(p)) {
            if ancestor.dirty {
                break;
            }
            ancestor.dirty = true;
            parent = ancestor.parent;
        }
        true
    }

    /// Returns the leaves of the whole tree.
    pub fn leaves(&self) -> Leaves {
        self.entries
            .get(self.root)
            .map(|entry| entry.leaves.clone())
            .unwrap_or_default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
