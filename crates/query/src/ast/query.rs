//! Query descriptors: root queries and nested subqueries.

use super::filter::Filter;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A model query: an ordered list of root queries.
///
/// Queries are plain values; two queries are equal when they are
/// structurally equal, which is what decides whether an executor may keep
/// its cache tree between updates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModelQuery {
    #[cfg_attr(feature = "serde", serde(default))]
    pub queries: Vec<RootQuery>,
}

impl ModelQuery {
    /// Creates an empty model query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a root query.
    pub fn root(mut self, query: RootQuery) -> Self {
        self.queries.push(query);
        self
    }

    /// Returns true if the query has no root queries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

/// How a root query finds its starting node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "camelCase"))]
pub enum RootQueryKind {
    /// The node with the given serialized identity, if it resolves.
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    ByIdentity { node_id: String },
    /// The root node the executor was created for.
    RootNode,
}

/// A root query position with its nested subqueries.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RootQuery {
    pub kind: RootQueryKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub queries: Vec<Subquery>,
}

impl RootQuery {
    /// Creates a root query with the given kind and no subqueries.
    pub fn new(kind: RootQueryKind) -> Self {
        Self {
            kind,
            queries: Vec::new(),
        }
    }

    /// Starts at the executor's root node.
    pub fn root_node() -> Self {
        Self::new(RootQueryKind::RootNode)
    }

    /// Starts at the node with the given serialized identity.
    pub fn by_id(node_id: impl Into<String>) -> Self {
        Self::new(RootQueryKind::ByIdentity {
            node_id: node_id.into(),
        })
    }

    /// Appends a nested subquery.
    pub fn query(mut self, subquery: Subquery) -> Self {
        self.queries.push(subquery);
        self
    }
}

/// The relation a subquery follows from its owning node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "camelCase"))]
pub enum SubqueryKind {
    AllChildren,
    ChildrenByRole { role: String },
    Descendants,
    Ancestors,
    Parent,
    ReferenceByRole { role: String },
}

/// A subquery position: a relation, the filters every produced node must
/// pass, and the subqueries evaluated relative to each passing node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Subquery {
    pub kind: SubqueryKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub filters: Vec<Filter>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub queries: Vec<Subquery>,
}

impl Subquery {
    /// Creates a subquery without filters or nested subqueries.
    pub fn new(kind: SubqueryKind) -> Self {
        Self {
            kind,
            filters: Vec::new(),
            queries: Vec::new(),
        }
    }

    /// All children, in any role.
    pub fn all_children() -> Self {
        Self::new(SubqueryKind::AllChildren)
    }

    /// Children contained in `role`.
    pub fn children(role: impl Into<String>) -> Self {
        Self::new(SubqueryKind::ChildrenByRole { role: role.into() })
    }

    /// All descendants, excluding the owning node.
    pub fn descendants() -> Self {
        Self::new(SubqueryKind::Descendants)
    }

    /// All ancestors, excluding the owning node.
    pub fn ancestors() -> Self {
        Self::new(SubqueryKind::Ancestors)
    }

    /// The parent node.
    pub fn parent() -> Self {
        Self::new(SubqueryKind::Parent)
    }

    /// The target of the reference in `role`.
    pub fn reference(role: impl Into<String>) -> Self {
        Self::new(SubqueryKind::ReferenceByRole { role: role.into() })
    }

    /// Adds a filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Appends a nested subquery.
    pub fn query(mut self, subquery: Subquery) -> Self {
        self.queries.push(subquery);
        self
    }
}
