//! Error types for Sylva.

use crate::node::NodeId;
use thiserror::Error;

/// Result type alias for Sylva operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for query execution and tree access.
#[derive(Debug, Error)]
pub enum Error {
    /// An update was started while another one is still running on the
    /// same executor.
    #[error("query executor is already running an update")]
    Reentrancy,
    /// A `MatchesRegex` filter carries a pattern that does not compile.
    #[error("invalid regex pattern `{pattern}`: {source}")]
    PatternCompile {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    /// Node not found in the tree.
    #[error("node not found: {id}")]
    NodeNotFound { id: NodeId },
    /// A serialized node reference could not be parsed.
    #[error("invalid node reference: {reference}")]
    InvalidReference { reference: String },
    /// Invalid operation.
    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },
}

impl Error {
    /// Creates a pattern compile error.
    pub fn pattern_compile(pattern: impl Into<String>, source: regex::Error) -> Self {
        Error::PatternCompile {
            pattern: pattern.into(),
            source,
        }
    }

    /// Creates a node not found error.
    pub fn node_not_found(id: NodeId) -> Self {
        Error::NodeNotFound { id }
    }

    /// Creates an invalid reference error.
    pub fn invalid_reference(reference: impl Into<String>) -> Self {
        Error::InvalidReference {
            reference: reference.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true if this is a reentrancy error.
    pub fn is_reentrancy(&self) -> bool {
        matches!(self, Error::Reentrancy)
    }

    /// Returns true if this is a pattern compile error.
    pub fn is_pattern_compile(&self) -> bool {
        matches!(self, Error::PatternCompile { .. })
    }
}
