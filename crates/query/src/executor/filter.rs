//! Filter evaluator.

use crate::ast::{Filter, StringOp};
use hashbrown::HashMap;
use regex::Regex;
use sylva_core::{Error, NodeId, NodeTree, Result};

/// Compiled `MatchesRegex` patterns, keyed by their source text.
///
/// Only patterns that compiled are kept. When the cache is full it is
/// cleared before the next pattern is stored; a capacity of 0 disables
/// caching.
#[derive(Clone, Debug)]
pub struct RegexCache {
    capacity: usize,
    compiled: HashMap<String, Regex>,
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::new(256)
    }
}

impl RegexCache {
    /// Creates a cache holding up to `capacity` patterns.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            compiled: HashMap::new(),
        }
    }

    /// Returns the compiled form of `pattern`, anchored to the whole value.
    pub fn get_or_compile(&mut self, pattern: &str) -> Result<Regex> {
        if let Some(regex) = self.compiled.get(pattern) {
            return Ok(regex.clone());
        }

        // Validate the bare pattern first: wrapping it in a group could turn
        // an unbalanced pattern such as `a)(b` into a valid one.
        Regex::new(pattern).map_err(|e| Error::pattern_compile(pattern, e))?;
        let regex = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|e| Error::pattern_compile(pattern, e))?;

        if self.capacity > 0 {
            if self.compiled.len() >= self.capacity {
                self.compiled.clear();
            }
            self.compiled.insert(pattern.into(), regex.clone());
        }
        Ok(regex)
    }

    /// Returns the number of cached patterns.
    #[inline]
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    /// Returns true if no pattern is cached.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// Drops all cached patterns.
    pub fn clear(&mut self) {
        self.compiled.clear();
    }
}

/// Applies a string operator to an optional value.
///
/// A missing value satisfies `IsNull` and nothing else, `IsNotNull`
/// included. Regex patterns are only compiled when there is a value to
/// match.
pub fn apply_string_op(
    value: Option<&str>,
    op: &StringOp,
    regexes: &mut RegexCache,
) -> Result<bool> {
    let Some(value) = value else {
        return Ok(matches!(op, StringOp::IsNull));
    };

    let result = match op {
        StringOp::Contains { substring } => value.contains(substring.as_str()),
        StringOp::StartsWith { prefix } => value.starts_with(prefix.as_str()),
        StringOp::EndsWith { suffix } => value.ends_with(suffix.as_str()),
        StringOp::Equals { value: expected } => value == expected,
        StringOp::MatchesRegex { pattern } => regexes.get_or_compile(pattern)?.is_match(value),
        StringOp::IsNull => false,
        StringOp::IsNotNull => true,
    };
    Ok(result)
}

/// Evaluates filters against nodes of a tree.
pub struct FilterEvaluator<'a, T: NodeTree + ?Sized> {
    tree: &'a T,
    regexes: &'a mut RegexCache,
}

impl<'a, T: NodeTree + ?Sized> FilterEvaluator<'a, T> {
    /// Creates a new filter evaluator.
    pub fn new(tree: &'a T, regexes: &'a mut RegexCache) -> Self {
        Self { tree, regexes }
    }

    /// Returns true if the node passes every filter.
    pub fn matches_all(&mut self, node: NodeId, filters: &[Filter]) -> Result<bool> {
        for filter in filters {
            if !self.matches(node, filter)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Returns true if the node passes the filter.
    pub fn matches(&mut self, node: NodeId, filter: &Filter) -> Result<bool> {
        match filter {
            Filter::And { filters } => self.matches_all(node, filters),
            Filter::Or { filters } => {
                if filters.is_empty() {
                    return Ok(true);
                }
                for filter in filters {
                    if self.matches(node, filter)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Filter::ByConceptId { uid } => {
                Ok(self.tree.concept_id(node).as_deref() == Some(uid.as_str()))
            }
            Filter::ByConceptLongName { op } => {
                let name = self.tree.concept_long_name(node);
                apply_string_op(name.as_deref(), op, self.regexes)
            }
            Filter::ByProperty { role, op } => {
                let value = self.tree.property_value(node, role);
                apply_string_op(value.as_deref(), op, self.regexes)
            }
        }
    }
}
