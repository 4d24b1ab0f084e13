//! Reverse index maintained from an `IncrementalList` of pairs.
//!
//! The index remembers every segment of the list it was last updated with,
//! together with the number of indexed segments pointing at it. Updating to
//! a new list retains the new root and releases the old one: segments the
//! two lists share are only touched at the boundary, so the work done is
//! proportional to the segments that were added or dropped.

use crate::delta::{Delta, DeltaBatch};
use crate::list::{IncrementalList, Segment};
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::hash::Hash;
use core::mem;
use hashbrown::HashMap;

type SegmentPtr<T> = *const Segment<T>;

struct Tracked<T> {
    // Holding the segment keeps its address from being reused while tracked.
    segment: Rc<Segment<T>>,
    refs: usize,
}

/// A `K -> {V}` index over the pairs of an `IncrementalList<(K, V)>`.
///
/// A pair occurring more than once in the list is indexed once and stays
/// indexed until its last occurrence is gone.
pub struct IncrementalIndex<K, V> {
    entries: HashMap<K, HashMap<V, usize>>,
    segments: HashMap<SegmentPtr<(K, V)>, Tracked<(K, V)>>,
    current: IncrementalList<(K, V)>,
}

impl<K, V> Default for IncrementalIndex<K, V>
where
    K: Hash + Eq + Clone,
    V: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> IncrementalIndex<K, V>
where
    K: Hash + Eq + Clone,
    V: Hash + Eq + Clone,
{
    /// Creates an empty index.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            segments: HashMap::new(),
            current: IncrementalList::empty(),
        }
    }

    /// Re-derives the index from `list`.
    ///
    /// Returns the pairs that became visible or stopped being visible,
    /// deletions first. Updating with the list already indexed is free.
    pub fn update(&mut self, list: IncrementalList<(K, V)>) -> DeltaBatch<(K, V)> {
        if self.current.ptr_eq(&list) {
            return Vec::new();
        }

        let mut added = Vec::new();
        if let Some(root) = list.root() {
            self.retain(root, &mut added);
        }

        let mut dropped = Vec::new();
        let old = mem::replace(&mut self.current, list);
        if let Some(root) = old.root() {
            self.release(root, &mut dropped);
        }

        // Counting additions first keeps a pair that merely moved between
        // segments from being reported at all.
        let mut inserts = Vec::new();
        for (key, value) in added {
            if self.increment(&key, &value) {
                inserts.push(Delta::insert((key, value)));
            }
        }

        let mut batch = Vec::with_capacity(dropped.len() + inserts.len());
        for (key, value) in dropped {
            if self.decrement(&key, &value) {
                batch.push(Delta::delete((key, value)));
            }
        }
        batch.extend(inserts);
        batch
    }

    fn retain(&mut self, root: &Rc<Segment<(K, V)>>, added: &mut Vec<(K, V)>) {
        let mut stack = vec![Rc::clone(root)];
        while let Some(segment) = stack.pop() {
            let ptr = Rc::as_ptr(&segment);
            if let Some(tracked) = self.segments.get_mut(&ptr) {
                tracked.refs += 1;
                continue;
            }
            match &*segment {
                Segment::Leaf(pair) => added.push(pair.clone()),
                Segment::Concat { parts, .. } => stack.extend(parts.iter().cloned()),
            }
            self.segments.insert(ptr, Tracked { segment, refs: 1 });
        }
    }

    fn release(&mut self, root: &Rc<Segment<(K, V)>>, dropped: &mut Vec<(K, V)>) {
        let mut stack = vec![Rc::as_ptr(root)];
        while let Some(ptr) = stack.pop() {
            let Some(tracked) = self.segments.get_mut(&ptr) else {
                continue;
            };
            tracked.refs -= 1;
            if tracked.refs > 0 {
                continue;
            }
            let Some(tracked) = self.segments.remove(&ptr) else {
                continue;
            };
            match &*tracked.segment {
                Segment::Leaf(pair) => dropped.push(pair.clone()),
                Segment::Concat { parts, .. } => stack.extend(parts.iter().map(Rc::as_ptr)),
            }
        }
    }

    fn increment(&mut self, key: &K, value: &V) -> bool {
        let count = self
            .entries
            .entry(key.clone())
            .or_default()
            .entry(value.clone())
            .or_insert(0);
        *count += 1;
        *count == 1
    }

    fn decrement(&mut self, key: &K, value: &V) -> bool {
        let Some(values) = self.entries.get_mut(key) else {
            return false;
        };
        let Some(count) = values.get_mut(value) else {
            return false;
        };
        *count -= 1;
        if *count > 0 {
            return false;
        }
        values.remove(value);
        if values.is_empty() {
            self.entries.remove(key);
        }
        true
    }

    /// Returns the values indexed under `key`.
    pub fn lookup<'a>(&'a self, key: &K) -> impl Iterator<Item = &'a V> + 'a {
        self.entries.get(key).into_iter().flat_map(|values| values.keys())
    }

    /// Returns true if `(key, value)` is indexed.
    pub fn contains(&self, key: &K, value: &V) -> bool {
        self.entries.get(key).is_some_and(|values| values.contains_key(value))
    }

    /// Returns the number of distinct keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the list the index was last updated with.
    #[inline]
    pub fn list(&self) -> &IncrementalList<(K, V)> {
        &self.current
    }

    /// Returns the number of segments currently tracked.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.segments.clear();
        self.current = IncrementalList::empty();
    }
}
