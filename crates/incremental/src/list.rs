//! Persistent list with structural sharing.
//!
//! A list is a tree of reference-counted segments. Concatenation allocates
//! one new segment pointing at its inputs, so a list rebuilt from mostly
//! unchanged parts shares those parts with its previous version. Shared
//! segments are identified by pointer, which is what `IncrementalIndex`
//! uses to skip them.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

pub(crate) enum Segment<T> {
    Leaf(T),
    Concat { len: usize, parts: Vec<Rc<Segment<T>>> },
}

impl<T> Segment<T> {
    #[inline]
    fn len(&self) -> usize {
        match self {
            Segment::Leaf(_) => 1,
            Segment::Concat { len, .. } => *len,
        }
    }
}

/// A persistent, structurally shared list.
///
/// Cloning is O(1). The list is immutable; "modifying" it means building a
/// new list out of old ones.
pub struct IncrementalList<T> {
    root: Option<Rc<Segment<T>>>,
}

impl<T> Clone for IncrementalList<T> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
        }
    }
}

impl<T> Default for IncrementalList<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> IncrementalList<T> {
    /// Creates an empty list.
    #[inline]
    pub fn empty() -> Self {
        Self { root: None }
    }

    /// Creates a list holding a single item.
    #[inline]
    pub fn of(item: T) -> Self {
        Self {
            root: Some(Rc::new(Segment::Leaf(item))),
        }
    }

    /// Concatenates lists, in order.
    ///
    /// Empty inputs are skipped. If a single non-empty input remains it is
    /// returned as is, so the result shares its identity.
    pub fn concat<I>(lists: I) -> Self
    where
        I: IntoIterator<Item = IncrementalList<T>>,
    {
        let mut parts: Vec<Rc<Segment<T>>> =
            lists.into_iter().filter_map(|list| list.root).collect();
        match parts.len() {
            0 => Self::empty(),
            1 => Self { root: parts.pop() },
            _ => {
                let len = parts.iter().map(|part| part.len()).sum();
                Self {
                    root: Some(Rc::new(Segment::Concat { len, parts })),
                }
            }
        }
    }

    /// Returns the number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.root.as_ref().map_or(0, |root| root.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns true if both lists are the same shared value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Iterates the items in order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            stack: self.root.as_deref().into_iter().collect(),
        }
    }

    #[inline]
    pub(crate) fn root(&self) -> Option<&Rc<Segment<T>>> {
        self.root.as_ref()
    }
}

impl<T: Clone> IncrementalList<T> {
    /// Copies the items into a vector.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T> FromIterator<T> for IncrementalList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::concat(iter.into_iter().map(Self::of))
    }
}

impl<T: fmt::Debug> fmt::Debug for IncrementalList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterator over the items of an `IncrementalList`.
pub struct Iter<'a, T> {
    stack: Vec<&'a Segment<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        while let Some(segment) = self.stack.pop() {
            match segment {
                Segment::Leaf(item) => return Some(item),
                Segment::Concat { parts, .. } => {
                    self.stack.extend(parts.iter().rev().map(|part| &**part));
                }
            }
        }
        None
    }
}

impl<'a, T> IntoIterator for &'a IncrementalList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}
