//! Query planning.
//!
//! A `ModelQuery` is a tree of descriptors. The planner flattens it into a
//! `QueryPlan` whose positions are addressed by `PositionId`, so cache
//! entries can name their query position with a plain integer.

mod plan;

pub use plan::{PositionId, PositionKind, QueryPlan, QueryPosition};
