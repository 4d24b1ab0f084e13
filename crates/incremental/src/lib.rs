//! Sylva Incremental - Structurally shared lists and the indexes derived from them.
//!
//! Cache trees rebuild their per-entry leaf lists after every validation
//! pass. Rebuilding a flat list would cost the size of the whole result; this
//! crate avoids that by sharing unchanged parts between the old and the new
//! list, and by re-deriving indexes only from the parts that changed.
//!
//! # Core Concepts
//!
//! - `IncrementalList<T>`: A persistent list built by concatenation; concatenating
//!   lists shares them instead of copying
//! - `IncrementalIndex<K, V>`: A `K -> {V}` index over a list of pairs, updated
//!   in time proportional to the segments that changed
//! - `Delta<T>`: An insertion or deletion reported by an index update
//!
//! # Example
//!
//! ```rust
//! use sylva_incremental::{IncrementalIndex, IncrementalList};
//!
//! let left = IncrementalList::of((1, 'a'));
//! let right = IncrementalList::of((2, 'b'));
//!
//! let mut index = IncrementalIndex::new();
//! index.update(IncrementalList::concat([left.clone(), right]));
//! assert!(index.contains(&2, &'b'));
//!
//! // Only the replaced segment is visited.
//! let deltas = index.update(IncrementalList::concat([left, IncrementalList::of((2, 'c'))]));
//! assert_eq!(deltas.len(), 2);
//! assert!(deltas[0].is_delete());
//! ```

#![no_std]

extern crate alloc;

pub mod delta;
pub mod index;
pub mod list;

pub use delta::{Delta, DeltaBatch};
pub use index::IncrementalIndex;
pub use list::{IncrementalList, Iter};
