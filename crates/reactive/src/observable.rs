//! Observable model queries.
//!
//! `ObservableModelQuery` binds an executor to one query and keeps the last
//! result. Subscribers are notified with a `ChangeSet` whenever a refresh
//! changes the result.

use crate::change_set::ChangeSet;
use crate::executor::{QueryExecutor, UpdateReport};
use std::mem;
use sylva_core::{NodeId, NodeTree, Result};
use sylva_query::ModelQuery;
use tracing::debug;

/// Identifies a subscriber of an observed query.
pub type SubscriptionId = u64;

type Subscriber = Box<dyn Fn(&ChangeSet)>;

/// A query whose result is kept up to date and observed.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use sylva_core::MemoryTree;
/// use sylva_query::{ModelQuery, RootQuery, Subquery};
/// use sylva_reactive::{ObservableModelQuery, QueryExecutor};
///
/// let tree = Rc::new(RefCell::new(MemoryTree::new()));
/// let root = tree.borrow().root();
/// let query = ModelQuery::new().root(RootQuery::root_node().query(Subquery::all_children()));
///
/// let mut observed = ObservableModelQuery::new(QueryExecutor::new(tree.clone(), root), query);
/// let log = Rc::new(RefCell::new(Vec::new()));
/// let sink = log.clone();
/// observed.subscribe(move |changes| sink.borrow_mut().push(changes.added.clone()));
/// observed.refresh().unwrap();
///
/// let child = tree.borrow_mut().add_child(root, "members", None).unwrap();
/// let changed = tree.borrow_mut().take_changes();
/// observed.on_tree_change(changed).unwrap();
///
/// assert_eq!(*log.borrow(), vec![vec![child]]);
/// assert_eq!(observed.result(), &[child]);
/// ```
pub struct ObservableModelQuery<T: NodeTree> {
    executor: QueryExecutor<T>,
    query: ModelQuery,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: SubscriptionId,
    result: Vec<NodeId>,
    last_report: UpdateReport,
}

impl<T: NodeTree> ObservableModelQuery<T> {
    /// Creates an observed query. Nothing is evaluated until the first
    /// `refresh`.
    pub fn new(executor: QueryExecutor<T>, query: ModelQuery) -> Self {
        Self {
            executor,
            query,
            subscribers: Vec::new(),
            next_id: 1,
            result: Vec::new(),
            last_report: UpdateReport::default(),
        }
    }

    #[inline]
    pub fn query(&self) -> &ModelQuery {
        &self.query
    }

    #[inline]
    pub fn executor(&self) -> &QueryExecutor<T> {
        &self.executor
    }

    /// Returns the observed tree for mutation. Report the changed nodes
    /// through `on_tree_change`.
    #[inline]
    pub fn tree_mut(&mut self) -> &mut T {
        self.executor.tree_mut()
    }

    /// Returns the report of the last refresh.
    #[inline]
    pub fn last_report(&self) -> &UpdateReport {
        &self.last_report
    }

    /// Returns the result of the last refresh, sorted.
    #[inline]
    pub fn result(&self) -> &[NodeId] {
        &self.result
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.result.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }

    /// Subscribes to changes. Subscribers are notified in subscription
    /// order.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeSet) + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns true if the subscriber was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    #[inline]
    pub fn subscription_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Replaces the observed query. The next refresh rebuilds the cache.
    pub fn set_query(&mut self, query: ModelQuery) {
        self.query = query;
    }

    /// Brings the result up to date and notifies subscribers if it changed.
    ///
    /// Only the nodes that started or stopped matching are applied to the
    /// kept result, so a refresh with no invalidated entries costs one
    /// cache lookup.
    pub fn refresh(&mut self) -> Result<ChangeSet> {
        let mut report = self.executor.update_report(&self.query, |_| {})?;
        let entered = mem::take(&mut report.entered);
        let left = mem::take(&mut report.left);
        self.last_report = report;

        if entered.is_empty() && left.is_empty() {
            return Ok(ChangeSet {
                current_result: self.result.clone(),
                ..ChangeSet::new()
            });
        }

        let changes = ChangeSet::apply(&mut self.result, entered, left);
        debug!(
            added = changes.added.len(),
            removed = changes.removed.len(),
            subscribers = self.subscribers.len(),
            "observed query changed"
        );
        for (_, callback) in &self.subscribers {
            callback(&changes);
        }
        Ok(changes)
    }

    /// Invalidates the changed nodes and refreshes.
    pub fn on_tree_change<I>(&mut self, changed: I) -> Result<ChangeSet>
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.executor.invalidate(changed)?;
        self.refresh()
    }
}
