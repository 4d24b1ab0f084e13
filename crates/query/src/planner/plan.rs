//! Flat query plans.

use crate::ast::{Filter, ModelQuery, RootQueryKind, Subquery, SubqueryKind};

/// Index of a position inside a `QueryPlan`.
pub type PositionId = usize;

/// What a query position resolves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PositionKind {
    /// A root query, resolved against the tree.
    Root(RootQueryKind),
    /// A subquery, resolved relative to the node owning it.
    Sub(SubqueryKind),
}

/// A single position of a compiled query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryPosition {
    pub kind: PositionKind,
    /// Filters a produced node must pass. Always empty for root positions.
    pub filters: Vec<Filter>,
    /// Positions evaluated relative to every node this position produces.
    pub nested: Vec<PositionId>,
    /// Nesting depth; root positions have depth 0.
    pub depth: usize,
}

impl QueryPosition {
    /// Returns true for root query positions.
    #[inline]
    pub fn is_root(&self) -> bool {
        matches!(self.kind, PositionKind::Root(_))
    }
}

/// A `ModelQuery` flattened into id-addressed positions.
///
/// Positions are stored in pre-order, so a position's id is always greater
/// than the id of the position it is nested in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryPlan {
    positions: Vec<QueryPosition>,
    roots: Vec<PositionId>,
}

impl QueryPlan {
    /// Compiles a model query.
    pub fn compile(query: &ModelQuery) -> Self {
        let mut plan = Self {
            positions: Vec::new(),
            roots: Vec::with_capacity(query.queries.len()),
        };

        for root in &query.queries {
            let id = plan.push(PositionKind::Root(root.kind.clone()), Vec::new(), 0);
            let nested = plan.compile_subqueries(&root.queries, 1);
            plan.positions[id].nested = nested;
            plan.roots.push(id);
        }

        plan
    }

    fn compile_subqueries(&mut self, queries: &[Subquery], depth: usize) -> Vec<PositionId> {
        queries
            .iter()
            .map(|query| {
                let kind = PositionKind::Sub(query.kind.clone());
                let id = self.push(kind, query.filters.clone(), depth);
                let nested = self.compile_subqueries(&query.queries, depth + 1);
                self.positions[id].nested = nested;
                id
            })
            .collect()
    }

    fn push(&mut self, kind: PositionKind, filters: Vec<Filter>, depth: usize) -> PositionId {
        let id = self.positions.len();
        self.positions.push(QueryPosition {
            kind,
            filters,
            nested: Vec::new(),
            depth,
        });
        id
    }

    /// Returns a position by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this plan.
    #[inline]
    pub fn position(&self, id: PositionId) -> &QueryPosition {
        &self.positions[id]
    }

    /// Returns a position by id, if it exists.
    #[inline]
    pub fn get(&self, id: PositionId) -> Option<&QueryPosition> {
        self.positions.get(id)
    }

    /// Returns the root positions, in query order.
    #[inline]
    pub fn roots(&self) -> &[PositionId] {
        &self.roots
    }

    /// Returns the number of positions.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if the plan has no positions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Returns the deepest nesting level of the plan.
    pub fn max_depth(&self) -> usize {
        self.positions.iter().map(|p| p.depth).max().unwrap_or(0)
    }
}
