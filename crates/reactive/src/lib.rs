//! Sylva Reactive - Incrementally maintained model queries.
//!
//! This crate keeps the result of a `ModelQuery` up to date while the model
//! tree changes. The caller reports changed nodes; the executor re-derives
//! only the cache entries keyed to them and reports which nodes started or
//! stopped matching.
//!
//! # Core Concepts
//!
//! - `QueryExecutor`: Owns the cache tree and reverse index for one query
//! - `SharedQueryExecutor`: `Rc<RefCell<..>>` handle that turns reentrant use into errors
//! - `ObservableModelQuery`: Keeps a sorted result and notifies subscribers with a `ChangeSet`
//!
//! # Update cycle
//!
//! 1. `update(query, on_match)` validates the cache tree and returns the changed nodes
//! 2. The caller mutates the tree and collects the changed node ids
//! 3. `invalidate(ids)` marks the affected cache entries
//! 4. The next `update` re-derives exactly those entries
//!
//! A failing update (an invalid regular expression, for instance) rolls
//! the cache tree back, so the same update can be retried once the cause
//! is fixed.

mod arena;
mod cache;
mod journal;

pub mod change_set;
pub mod executor;
pub mod observable;
pub mod shared;

pub use change_set::ChangeSet;
pub use executor::{ExecutorConfig, QueryExecutor, UpdateReport};
pub use observable::{ObservableModelQuery, SubscriptionId};
pub use shared::SharedQueryExecutor;

// Re-export commonly used types from dependencies
pub use sylva_core::{Error, NodeId, NodeTree, Result};
pub use sylva_query::{Filter, ModelQuery, RootQuery, StringOp, Subquery};
