//! Node identity.

use crate::error::{Error, Result};
use core::fmt;
use core::str::FromStr;

/// Stable identity of a node in the model tree.
///
/// The identity does not change when the node's properties, children or
/// references change, so it is used as the key for cache reuse and for
/// change notifications. Its serialized form is `n<decimal>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Creates a node id from its raw value.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the serialized form of this id.
    pub fn serialize(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.strip_prefix('n')
            .and_then(|digits| digits.parse::<u64>().ok())
            .map(NodeId)
            .ok_or_else(|| Error::invalid_reference(s))
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        NodeId(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_serialize() {
        let id = NodeId::new(42);
        assert_eq!(id.serialize(), "n42");
        assert_eq!("n42".parse::<NodeId>().unwrap(), id);
    }

    #[test]
    fn test_node_id_parse_rejects_garbage() {
        assert!("42".parse::<NodeId>().is_err());
        assert!("n".parse::<NodeId>().is_err());
        assert!("nx1".parse::<NodeId>().is_err());
        assert!("n-1".parse::<NodeId>().is_err());
    }
}
