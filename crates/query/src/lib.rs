//! Sylva Query - Model query descriptors and their evaluation.
//!
//! This crate provides everything needed to evaluate a model query once:
//!
//! - `ast`: Query descriptors (`ModelQuery`, `RootQuery`, `Subquery`, `Filter`, `StringOp`)
//! - `planner`: Compilation of a `ModelQuery` into a flat, id-addressed `QueryPlan`
//! - `executor`: The filter evaluator and the query resolver
//!
//! Keeping the result of a query up to date across tree changes is the job of
//! `sylva-reactive`, which drives these pieces position by position.
//!
//! # Example
//!
//! ```rust
//! use sylva_query::ast::{Filter, ModelQuery, RootQuery, StringOp, Subquery};
//! use sylva_query::planner::QueryPlan;
//!
//! let query = ModelQuery::new().root(
//!     RootQuery::root_node().query(
//!         Subquery::all_children().filter(Filter::property("name", StringOp::equals("A"))),
//!     ),
//! );
//!
//! let plan = QueryPlan::compile(&query);
//! assert_eq!(plan.len(), 2);
//! assert_eq!(plan.roots().len(), 1);
//! ```

pub mod ast;
pub mod executor;
pub mod planner;

pub use ast::{Filter, ModelQuery, RootQuery, RootQueryKind, StringOp, Subquery, SubqueryKind};
pub use executor::{
    apply_string_op, resolve_position, resolve_root, resolve_subquery, FilterEvaluator, RegexCache,
};
pub use planner::{PositionId, PositionKind, QueryPlan, QueryPosition};
