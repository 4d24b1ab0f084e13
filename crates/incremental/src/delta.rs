//! Changes reported by incremental structures.
//!
//! A `Delta` pairs an item with a signed multiplicity: `+1` when the item
//! became visible, `-1` when it stopped being visible.

use alloc::vec::Vec;

/// A differential change to an item.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Delta<T> {
    pub data: T,
    /// +1 for insert, -1 for delete
    pub diff: i32,
}

impl<T> Delta<T> {
    #[inline]
    pub fn insert(data: T) -> Self {
        Self { data, diff: 1 }
    }

    #[inline]
    pub fn delete(data: T) -> Self {
        Self { data, diff: -1 }
    }

    #[inline]
    pub fn is_insert(&self) -> bool {
        self.diff > 0
    }

    #[inline]
    pub fn is_delete(&self) -> bool {
        self.diff < 0
    }
}

/// A batch of deltas. Deletions precede insertions.
pub type DeltaBatch<T> = Vec<Delta<T>>;
