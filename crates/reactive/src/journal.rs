//! Undo journal for validation passes.
//!
//! Before an entry is first mutated in a pass, the journal keeps a copy of
//! it. Entries allocated during the pass are recorded so they can be freed
//! again, and entries dropped during the pass stay allocated until the pass
//! commits. Rolling back restores every touched entry in reverse order,
//! which leaves the cache tree exactly as it was before the pass.

use crate::arena::{Arena, EntryId};
use crate::cache::CacheEntry;
use hashbrown::HashSet;

#[derive(Debug)]
enum JournalEntry {
    /// The entry as it was before the pass touched it.
    Snapshot { id: EntryId, entry: CacheEntry },
    /// The entry did not exist before the pass.
    Allocated { id: EntryId },
}

/// Changes made to a cache tree by one validation pass.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    entries: Vec<JournalEntry>,
    touched: HashSet<EntryId>,
    released: Vec<EntryId>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current state of an entry about to be mutated.
    pub fn touch(&mut self, arena: &Arena<CacheEntry>, id: EntryId) {
        if !self.touched.insert(id) {
            return;
        }
        if let Some(entry) = arena.get(id) {
            self.entries.push(JournalEntry::Snapshot {
                id,
                entry: entry.clone(),
            });
        }
    }

    /// Records an entry allocated by the pass.
    pub fn allocated(&mut self, id: EntryId) {
        self.touched.insert(id);
        self.entries.push(JournalEntry::Allocated { id });
    }

    /// Defers freeing a detached subtree until commit.
    pub fn release(&mut self, id: EntryId) {
        self.released.push(id);
    }

    /// Returns the number of recorded changes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Frees the released subtrees. Returns the number of freed entries.
    pub fn commit(self, arena: &mut Arena<CacheEntry>) -> usize {
        let mut freed = 0;
        let mut stack = self.released;
        while let Some(id) = stack.pop() {
            let Some(entry) = arena.remove(id) else {
                continue;
            };
            freed += 1;
            stack.extend(entry.children());
        }
        freed
    }

    /// Restores the state before the pass. Returns the number of restored
    /// or freed entries.
    pub fn rollback(self, arena: &mut Arena<CacheEntry>) -> usize {
        let mut undone = 0;
        for record in self.entries.into_iter().rev() {
            match record {
                JournalEntry::Snapshot { id, entry } => {
                    if let Some(slot) = arena.get_mut(id) {
                        *slot = entry;
                        undone += 1;
                    }
                }
                JournalEntry::Allocated { id } => {
                    if arena.remove(id).is_some() {
                        undone += 1;
                    }
                }
            }
        }
        undone
    }
}
