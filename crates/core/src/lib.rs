//! Sylva Core - Node identity, tree access and error types for Sylva.
//!
//! This crate provides the foundational types shared by the Sylva query engine:
//!
//! - `NodeId`: Stable identity of a node in the model tree
//! - `NodeTree`: Read-only access to the externally-owned model tree
//! - `MemoryTree`: An in-memory model tree that records which nodes changed
//! - `Error`: Error types for query execution
//!
//! # Example
//!
//! ```rust
//! use sylva_core::{MemoryTree, NodeTree};
//!
//! let mut tree = MemoryTree::new();
//! let root = tree.root();
//! let child = tree.add_child(root, "members", None).unwrap();
//! tree.set_property(child, "name", Some("A")).unwrap();
//!
//! assert_eq!(tree.all_children(root), vec![child]);
//! assert_eq!(tree.property_value(child, "name").as_deref(), Some("A"));
//! assert!(tree.take_changes().contains(&root));
//! ```

mod error;
mod memory;
mod node;
mod tree;

pub use error::{Error, Result};
pub use memory::{Concept, MemoryTree};
pub use node::NodeId;
pub use tree::NodeTree;
