//! The query executor.
//!
//! `QueryExecutor` keeps one cache tree for the query it was last updated
//! with. An update validates the tree top-down: entries that are valid with
//! no dirty descendants are skipped, dirty ancestors only recurse, and
//! invalid entries re-derive their own state before recursing. Afterwards
//! the reverse index is re-derived from the tree's leaf list so that the
//! next `invalidate` can find the entries keyed to a changed node.

use crate::arena::{Arena, EntryId};
use crate::cache::{CacheEntry, CacheTree, EntryKind, Leaves};
use crate::journal::Journal;
use hashbrown::{HashMap, HashSet};
use std::{iter, mem};
use sylva_core::{Error, NodeId, NodeTree, Result};
use sylva_incremental::{IncrementalIndex, IncrementalList};
use sylva_query::{
    resolve_position, FilterEvaluator, ModelQuery, PositionId, QueryPlan, RegexCache,
};
use tracing::{debug, trace, warn};

/// Executor configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Report nodes resolved by root query positions like any other match.
    /// Root positions only anchor their subqueries by default.
    pub report_root_matches: bool,
    /// Number of compiled `MatchesRegex` patterns kept across updates.
    /// 0 disables the cache.
    pub regex_cache_capacity: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            report_root_matches: false,
            regex_cache_capacity: 256,
        }
    }
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report_root_matches(mut self, report: bool) -> Self {
        self.report_root_matches = report;
        self
    }

    pub fn regex_cache_capacity(mut self, capacity: usize) -> Self {
        self.regex_cache_capacity = capacity;
        self
    }
}

/// What an update did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Nodes passed to `on_match`, in call order.
    pub confirmed: Vec<NodeId>,
    /// Nodes that started matching at some position.
    pub added: HashSet<NodeId>,
    /// Nodes that matched at some position before the update and no
    /// longer do there.
    pub removed: HashSet<NodeId>,
    /// Nodes that joined the result: matched nowhere before, somewhere now.
    /// Sorted.
    pub entered: Vec<NodeId>,
    /// Nodes that left the result: matched somewhere before, nowhere now.
    /// Sorted.
    pub left: Vec<NodeId>,
    /// Number of cache entries the pass looked at.
    pub visited: usize,
    /// Number of node entries whose filter was re-evaluated.
    pub rederived: usize,
    /// Number of query entries that were re-resolved.
    pub resolved: usize,
    /// The cache tree was built from scratch for a new query.
    pub rebuilt: bool,
}

impl UpdateReport {
    /// Returns the nodes whose membership changed: `added ∪ removed`.
    pub fn changed(&self) -> HashSet<NodeId> {
        self.added.union(&self.removed).copied().collect()
    }

    /// Returns true if no membership changed.
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Incrementally maintained evaluation of a `ModelQuery` over a `NodeTree`.
///
/// The executor is single-threaded. It holds `Rc`-based lists and is
/// therefore neither `Send` nor `Sync`.
///
/// # Example
///
/// ```rust
/// use sylva_core::MemoryTree;
/// use sylva_query::{Filter, ModelQuery, RootQuery, StringOp, Subquery};
/// use sylva_reactive::QueryExecutor;
///
/// let mut tree = MemoryTree::new();
/// let root = tree.root();
/// let a = tree.add_child(root, "members", None).unwrap();
/// tree.set_property(a, "name", Some("A")).unwrap();
///
/// let query = ModelQuery::new().root(RootQuery::root_node().query(
///     Subquery::all_children().filter(Filter::property("name", StringOp::equals("A"))),
/// ));
///
/// let mut executor = QueryExecutor::new(tree, root);
/// let mut seen = Vec::new();
/// let changed = executor.update(&query, |node| seen.push(node)).unwrap();
/// assert_eq!(seen, vec![a]);
/// assert!(changed.contains(&a));
///
/// // Nothing changed: nothing is reported.
/// assert!(executor.update(&query, |_| {}).unwrap().is_empty());
/// ```
pub struct QueryExecutor<T: NodeTree> {
    tree: T,
    root: NodeId,
    config: ExecutorConfig,
    cache: Option<CacheTree>,
    index: IncrementalIndex<NodeId, EntryId>,
    regexes: RegexCache,
    /// Number of reported node entries matching each node.
    matches: HashMap<NodeId, usize>,
    in_flight: bool,
}

impl<T: NodeTree> QueryExecutor<T> {
    /// Creates an executor with the default configuration.
    pub fn new(tree: T, root: NodeId) -> Self {
        Self::with_config(tree, root, ExecutorConfig::default())
    }

    /// Creates an executor with the given configuration.
    pub fn with_config(tree: T, root: NodeId, config: ExecutorConfig) -> Self {
        let regexes = RegexCache::new(config.regex_cache_capacity);
        Self {
            tree,
            root,
            config,
            cache: None,
            index: IncrementalIndex::new(),
            regexes,
            matches: HashMap::new(),
            in_flight: false,
        }
    }

    #[inline]
    pub fn tree(&self) -> &T {
        &self.tree
    }

    /// Returns the tree for mutation. Changes must be passed to
    /// `invalidate` before the next update.
    #[inline]
    pub fn tree_mut(&mut self) -> &mut T {
        &mut self.tree
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Returns the query the cache tree was built for.
    pub fn query(&self) -> Option<&ModelQuery> {
        self.cache.as_ref().map(|cache| &cache.query)
    }

    /// Returns the number of live cache entries.
    pub fn cached_entries(&self) -> usize {
        self.cache.as_ref().map_or(0, CacheTree::len)
    }

    /// Returns true while an update is running, or after an update was
    /// aborted by a panicking callback.
    #[inline]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Runs one validation pass.
    ///
    /// `on_match` is called once for every node confirmed as a match by
    /// this pass. Returns the nodes that started or stopped matching.
    pub fn update<F>(&mut self, query: &ModelQuery, on_match: F) -> Result<HashSet<NodeId>>
    where
        F: FnMut(NodeId),
    {
        self.update_report(query, on_match).map(|report| report.changed())
    }

    /// Runs one validation pass and returns a detailed report.
    ///
    /// On error the cache tree is left exactly as it was before the call
    /// and the error is returned; calls already made to `on_match` are not
    /// undone.
    pub fn update_report<F>(&mut self, query: &ModelQuery, mut on_match: F) -> Result<UpdateReport>
    where
        F: FnMut(NodeId),
    {
        if self.in_flight {
            return Err(Error::Reentrancy);
        }
        // Stays set if `on_match` panics, so a half-validated tree is never
        // reused. `reset` clears it.
        self.in_flight = true;
        let result = self.run(query, &mut on_match);
        self.in_flight = false;
        result
    }

    fn run<F>(&mut self, query: &ModelQuery, on_match: &mut F) -> Result<UpdateReport>
    where
        F: FnMut(NodeId),
    {
        let mut report = UpdateReport::default();

        let reuse = self.cache.as_ref().is_some_and(|cache| cache.query == *query);
        if !reuse {
            let mut cache = CacheTree::new(query, self.root);
            debug!(positions = cache.plan.len(), "building cache tree for new query");

            let mut journal = Journal::new();
            let membership = Pass::new(
                &mut cache,
                &self.tree,
                &mut self.regexes,
                &self.config,
                &mut journal,
                &mut report,
                on_match,
                self.root,
            )
            .run()
            .inspect_err(|error| warn!(%error, "building cache tree failed"))?;
            journal.commit(&mut cache.entries);

            // A fresh tree starts from no matches, so the deltas are the counts.
            let previous = mem::take(&mut self.matches);
            self.apply_membership(membership, &mut report);
            report.entered.retain(|node| !previous.contains_key(node));
            report.left = previous
                .keys()
                .filter(|node| !self.matches.contains_key(*node))
                .copied()
                .collect();
            report.left.sort_unstable();
            report.added = report.entered.iter().copied().collect();
            report.removed = report.left.iter().copied().collect();
            report.rebuilt = true;

            self.index.clear();
            self.index.update(cache.leaves());
            self.cache = Some(cache);
        } else if let Some(cache) = self.cache.as_mut() {
            let mut journal = Journal::new();
            let outcome = Pass::new(
                cache,
                &self.tree,
                &mut self.regexes,
                &self.config,
                &mut journal,
                &mut report,
                on_match,
                self.root,
            )
            .run();

            let membership = match outcome {
                Ok(membership) => membership,
                Err(error) => {
                    let undone = journal.rollback(&mut cache.entries);
                    warn!(%error, undone, "update failed, cache tree rolled back");
                    return Err(error);
                }
            };

            let recorded = journal.len();
            let freed = journal.commit(&mut cache.entries);
            let deltas = self.index.update(cache.leaves());
            let unkeyed = deltas.iter().filter(|delta| delta.is_delete()).count();
            trace!(
                recorded,
                freed,
                keyed = deltas.len() - unkeyed,
                unkeyed,
                "committed validation pass"
            );
            self.apply_membership(membership, &mut report);
        }

        debug!(
            rebuilt = report.rebuilt,
            visited = report.visited,
            rederived = report.rederived,
            resolved = report.resolved,
            confirmed = report.confirmed.len(),
            entered = report.entered.len(),
            left = report.left.len(),
            "update finished"
        );
        Ok(report)
    }

    /// Folds the per-node match deltas of a committed pass into the match
    /// counts, recording the nodes whose count crossed zero.
    fn apply_membership(
        &mut self,
        membership: HashMap<NodeId, isize>,
        report: &mut UpdateReport,
    ) {
        for (node, delta) in membership {
            if delta == 0 {
                continue;
            }
            let before = self.matches.get(&node).copied().unwrap_or(0);
            let after = before as isize + delta;
            debug_assert!(after >= 0, "match count of {} dropped below zero", node);

            if after > 0 {
                self.matches.insert(node, after as usize);
                if before == 0 {
                    report.entered.push(node);
                }
            } else {
                self.matches.remove(&node);
                if before > 0 {
                    report.left.push(node);
                }
            }
        }
        report.entered.sort_unstable();
        report.left.sort_unstable();
    }

    /// Marks every cache entry keyed to one of the nodes as invalid.
    ///
    /// Returns the number of entries that became invalid. Nodes the cache
    /// tree does not know are ignored.
    ///
    /// Invalidation only happens between updates: a call made while an
    /// update is running (from inside `on_match`, through a shared handle)
    /// or after a panicking `on_match` fails with `Error::Reentrancy` and
    /// marks nothing.
    pub fn invalidate<I>(&mut self, nodes: I) -> Result<usize>
    where
        I: IntoIterator<Item = NodeId>,
    {
        if self.in_flight {
            return Err(Error::Reentrancy);
        }
        let Some(cache) = self.cache.as_mut() else {
            return Ok(0);
        };

        let mut invalidated = 0;
        for node in nodes {
            for &entry in self.index.lookup(&node) {
                if cache.invalidate(entry) {
                    trace!(%node, %entry, "invalidated cache entry");
                    invalidated += 1;
                }
            }
        }
        debug!(invalidated, "invalidation finished");
        Ok(invalidated)
    }

    /// Returns the nodes that currently match, sorted.
    pub fn matched_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.matches.keys().copied().collect();
        nodes.sort_unstable();
        nodes
    }

    /// Drops the cache tree, the index and cached patterns.
    pub fn reset(&mut self) {
        self.cache = None;
        self.index.clear();
        self.matches.clear();
        self.regexes.clear();
        self.in_flight = false;
    }
}

/// One validation pass over a cache tree.
struct Pass<'a, T: NodeTree + ?Sized, F: FnMut(NodeId)> {
    plan: &'a QueryPlan,
    entries: &'a mut Arena<CacheEntry>,
    root: EntryId,
    tree: &'a T,
    regexes: &'a mut RegexCache,
    config: &'a ExecutorConfig,
    journal: &'a mut Journal,
    report: &'a mut UpdateReport,
    on_match: &'a mut F,
    anchor: NodeId,
    confirmed: HashSet<NodeId>,
    /// Change in the number of reported matching entries per node.
    membership: HashMap<NodeId, isize>,
}

impl<'a, T: NodeTree + ?Sized, F: FnMut(NodeId)> Pass<'a, T, F> {
    #[allow(clippy::too_many_arguments)]
    fn new(
        cache: &'a mut CacheTree,
        tree: &'a T,
        regexes: &'a mut RegexCache,
        config: &'a ExecutorConfig,
        journal: &'a mut Journal,
        report: &'a mut UpdateReport,
        on_match: &'a mut F,
        anchor: NodeId,
    ) -> Self {
        Self {
            plan: &cache.plan,
            entries: &mut cache.entries,
            root: cache.root,
            tree,
            regexes,
            config,
            journal,
            report,
            on_match,
            anchor,
            confirmed: HashSet::new(),
            membership: HashMap::new(),
        }
    }

    fn run(mut self) -> Result<HashMap<NodeId, isize>> {
        self.validate(self.root)?;
        Ok(self.membership)
    }

    fn validate(&mut self, id: EntryId) -> Result<()> {
        let Some(entry) = self.entries.get(id) else {
            return Ok(());
        };
        self.report.visited += 1;
        if entry.valid && !entry.dirty {
            return Ok(());
        }
        let needs_derive = !entry.valid;

        self.journal.touch(self.entries, id);
        if needs_derive {
            self.derive(id)?;
        }

        let Some(entry) = self.entries.get(id) else {
            return Ok(());
        };
        let children = entry.children();
        let key = entry.key.clone();
        for &child in &children {
            self.validate(child)?;
        }

        let parts: Vec<Leaves> = children
            .iter()
            .filter_map(|&child| self.entries.get(child))
            .map(|child| child.leaves.clone())
            .collect();
        let leaves = IncrementalList::concat(iter::once(key).chain(parts));

        if let Some(entry) = self.entries.get_mut(id) {
            entry.leaves = leaves;
            entry.valid = true;
            entry.dirty = false;
        }
        Ok(())
    }

    fn derive(&mut self, id: EntryId) -> Result<()> {
        let Some(entry) = self.entries.get(id) else {
            return Ok(());
        };

        let kind = match entry.kind.clone() {
            EntryKind::ModelQuery { roots } => EntryKind::ModelQuery { roots },
            EntryKind::RootQuery { position, children } => {
                let children = self.resolve(id, position, self.anchor, &children);
                EntryKind::RootQuery { position, children }
            }
            EntryKind::Subquery {
                position,
                owner,
                children,
            } => {
                let children = self.resolve(id, position, owner, &children);
                EntryKind::Subquery {
                    position,
                    owner,
                    children,
                }
            }
            EntryKind::Node {
                position,
                node,
                matched,
                subqueries,
            } => self.derive_node(id, position, node, matched, subqueries)?,
        };

        if let Some(entry) = self.entries.get_mut(id) {
            entry.kind = kind;
        }
        Ok(())
    }

    /// Re-resolves a query entry, reusing the entries of surviving nodes.
    fn resolve(
        &mut self,
        id: EntryId,
        position: PositionId,
        anchor: NodeId,
        previous: &[(NodeId, EntryId)],
    ) -> Vec<(NodeId, EntryId)> {
        self.report.resolved += 1;
        let candidates = resolve_position(self.tree, self.plan.position(position), anchor);

        let mut existing: HashMap<NodeId, EntryId> = previous.iter().copied().collect();
        let children: Vec<(NodeId, EntryId)> = candidates
            .into_iter()
            .map(|node| match existing.remove(&node) {
                Some(child) => (node, child),
                None => (node, self.allocate_node(id, position, node)),
            })
            .collect();

        for (_, vanished) in existing {
            self.release(vanished);
        }
        trace!(%id, position, candidates = children.len(), "resolved query entry");
        children
    }

    fn derive_node(
        &mut self,
        id: EntryId,
        position: PositionId,
        node: NodeId,
        was_matched: bool,
        mut subqueries: Vec<EntryId>,
    ) -> Result<EntryKind> {
        self.report.rederived += 1;
        let plan = self.plan;
        let query_position = plan.position(position);

        let matched = if query_position.is_root() {
            true
        } else {
            FilterEvaluator::new(self.tree, &mut *self.regexes)
                .matches_all(node, &query_position.filters)?
        };
        let reported = self.is_reported(position);
        trace!(%id, %node, matched, "derived node entry");

        if matched {
            if reported {
                if self.confirmed.insert(node) {
                    self.report.confirmed.push(node);
                    (self.on_match)(node);
                }
                if !was_matched {
                    self.report.added.insert(node);
                    *self.membership.entry(node).or_default() += 1;
                }
            }

            if subqueries.is_empty() {
                subqueries = query_position
                    .nested
                    .iter()
                    .map(|&nested| self.allocate_subquery(id, nested, node))
                    .collect();
            } else {
                // The node changed, so everything resolved relative to it
                // has to be resolved again.
                for &subquery in &subqueries {
                    self.journal.touch(self.entries, subquery);
                    if let Some(entry) = self.entries.get_mut(subquery) {
                        entry.valid = false;
                    }
                }
            }
        } else {
            if reported && was_matched {
                self.report.removed.insert(node);
                *self.membership.entry(node).or_default() -= 1;
            }
            for subquery in subqueries.drain(..) {
                self.release(subquery);
            }
        }

        Ok(EntryKind::Node {
            position,
            node,
            matched,
            subqueries,
        })
    }

    fn allocate_node(&mut self, parent: EntryId, position: PositionId, node: NodeId) -> EntryId {
        let id = self.entries.insert_with(|id| {
            CacheEntry::new(
                Some(parent),
                IncrementalList::of((node, id)),
                EntryKind::Node {
                    position,
                    node,
                    matched: false,
                    subqueries: Vec::new(),
                },
            )
        });
        self.journal.allocated(id);
        id
    }

    fn allocate_subquery(
        &mut self,
        parent: EntryId,
        position: PositionId,
        owner: NodeId,
    ) -> EntryId {
        let id = self.entries.insert(CacheEntry::new(
            Some(parent),
            IncrementalList::empty(),
            EntryKind::Subquery {
                position,
                owner,
                children: Vec::new(),
            },
        ));
        self.journal.allocated(id);
        id
    }

    /// Detaches a subtree, reporting the nodes it matched as removed.
    fn release(&mut self, id: EntryId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(entry) = self.entries.get(current) else {
                continue;
            };
            if let Some((position, node)) = entry.matched_node() {
                if self.is_reported(position) {
                    self.report.removed.insert(node);
                    *self.membership.entry(node).or_default() -= 1;
                }
            }
            stack.extend(entry.children());
        }
        self.journal.release(id);
    }

    /// Nodes matched at root positions only anchor their subqueries unless
    /// configured otherwise.
    fn is_reported(&self, position: PositionId) -> bool {
        self.config.report_root_matches || !self.plan.position(position).is_root()
    }
}
