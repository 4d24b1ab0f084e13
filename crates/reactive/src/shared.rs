//! Shared executor handle.
//!
//! Query registries keep executors behind `Rc<RefCell<..>>`. A callback
//! that reaches back into the same executor while an update is running
//! would make `RefCell` panic; `SharedQueryExecutor` reports it as
//! `Error::Reentrancy` instead.

use crate::executor::{QueryExecutor, UpdateReport};
use hashbrown::HashSet;
use std::cell::RefCell;
use std::rc::Rc;
use sylva_core::{Error, NodeId, NodeTree, Result};
use sylva_query::ModelQuery;

/// A cloneable handle to one `QueryExecutor`.
pub struct SharedQueryExecutor<T: NodeTree> {
    inner: Rc<RefCell<QueryExecutor<T>>>,
}

impl<T: NodeTree> Clone for SharedQueryExecutor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: NodeTree> SharedQueryExecutor<T> {
    pub fn new(executor: QueryExecutor<T>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(executor)),
        }
    }

    /// See `QueryExecutor::update`.
    pub fn update<F>(&self, query: &ModelQuery, on_match: F) -> Result<HashSet<NodeId>>
    where
        F: FnMut(NodeId),
    {
        let mut executor = self.inner.try_borrow_mut().map_err(|_| Error::Reentrancy)?;
        executor.update(query, on_match)
    }

    /// See `QueryExecutor::update_report`.
    pub fn update_report<F>(&self, query: &ModelQuery, on_match: F) -> Result<UpdateReport>
    where
        F: FnMut(NodeId),
    {
        let mut executor = self.inner.try_borrow_mut().map_err(|_| Error::Reentrancy)?;
        executor.update_report(query, on_match)
    }

    /// See `QueryExecutor::invalidate`.
    pub fn invalidate<I>(&self, nodes: I) -> Result<usize>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut executor = self.inner.try_borrow_mut().map_err(|_| Error::Reentrancy)?;
        executor.invalidate(nodes)
    }

    /// Runs `f` with shared access to the executor.
    pub fn with<R>(&self, f: impl FnOnce(&QueryExecutor<T>) -> R) -> Result<R> {
        let executor = self.inner.try_borrow().map_err(|_| Error::Reentrancy)?;
        Ok(f(&executor))
    }

    /// Runs `f` with exclusive access to the executor.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut QueryExecutor<T>) -> R) -> Result<R> {
        let mut executor = self.inner.try_borrow_mut().map_err(|_| Error::Reentrancy)?;
        Ok(f(&mut executor))
    }

    /// Returns the nodes that currently match.
    pub fn matched_nodes(&self) -> Result<Vec<NodeId>> {
        self.with(QueryExecutor::matched_nodes)
    }
}
