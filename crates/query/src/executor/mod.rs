//! Query evaluation primitives.
//!
//! - `FilterEvaluator`: decides whether a node passes a position's filters
//! - `resolve_*`: produces the candidate nodes of a position

mod filter;
mod resolve;

pub use filter::{apply_string_op, FilterEvaluator, RegexCache};
pub use resolve::{resolve_position, resolve_root, resolve_subquery};
