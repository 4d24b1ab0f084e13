//! Filter expressions over a single node.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A filter a node must pass to be produced by a subquery.
///
/// Every filter only reads the node it is applied to. A filter that looked
/// at other nodes would also need those nodes to invalidate the entry it was
/// evaluated for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "camelCase"))]
pub enum Filter {
    /// All filters pass. An empty list passes.
    And { filters: Vec<Filter> },
    /// Any filter passes. An empty list also passes.
    Or { filters: Vec<Filter> },
    /// The concept UID equals `uid`.
    ByConceptId { uid: String },
    /// The concept's qualified name satisfies `op`.
    ByConceptLongName { op: StringOp },
    /// The property in `role` satisfies `op`.
    ByProperty { role: String, op: StringOp },
}

impl Filter {
    /// Creates an all-of filter.
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    /// Creates an any-of filter.
    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { filters }
    }

    /// Creates a concept UID filter.
    pub fn concept_id(uid: impl Into<String>) -> Self {
        Filter::ByConceptId { uid: uid.into() }
    }

    /// Creates a concept name filter.
    pub fn concept_long_name(op: StringOp) -> Self {
        Filter::ByConceptLongName { op }
    }

    /// Creates a property filter.
    pub fn property(role: impl Into<String>, op: StringOp) -> Self {
        Filter::ByProperty {
            role: role.into(),
            op,
        }
    }
}

/// A comparison applied to an optional string value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "camelCase"))]
pub enum StringOp {
    Contains { substring: String },
    StartsWith { prefix: String },
    EndsWith { suffix: String },
    Equals { value: String },
    /// The whole value matches the pattern.
    MatchesRegex { pattern: String },
    IsNull,
    IsNotNull,
}

impl StringOp {
    pub fn contains(substring: impl Into<String>) -> Self {
        StringOp::Contains {
            substring: substring.into(),
        }
    }

    pub fn starts_with(prefix: impl Into<String>) -> Self {
        StringOp::StartsWith {
            prefix: prefix.into(),
        }
    }

    pub fn ends_with(suffix: impl Into<String>) -> Self {
        StringOp::EndsWith {
            suffix: suffix.into(),
        }
    }

    pub fn equals(value: impl Into<String>) -> Self {
        StringOp::Equals {
            value: value.into(),
        }
    }

    pub fn matches_regex(pattern: impl Into<String>) -> Self {
        StringOp::MatchesRegex {
            pattern: pattern.into(),
        }
    }

    pub fn is_null() -> Self {
        StringOp::IsNull
    }

    pub fn is_not_null() -> Self {
        StringOp::IsNotNull
    }
}
