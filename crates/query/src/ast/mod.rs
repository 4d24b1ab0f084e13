//! AST module for model query descriptors.

mod filter;
mod query;

pub use filter::{Filter, StringOp};
pub use query::{ModelQuery, RootQuery, RootQueryKind, Subquery, SubqueryKind};
