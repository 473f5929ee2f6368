//! Error taxonomy shared by every collection and operator.

use thiserror::Error;

use crate::collection::Kind;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlgebraError {
    #[error("Incompatible kind: {op} requires tuples, got {kind}")]
    IncompatibleKind { op: &'static str, kind: Kind },

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// A predicate field does not resolve through a merged property map.
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Malformed key: {0}")]
    MalformedKey(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid type tag: {0}")]
    InvalidTypeTag(String),

    #[error("Expected a tuple, got {0}")]
    NotATuple(String),

    /// Failure reported by a leaf dataset provider.
    #[error("Provider error: {0}")]
    Provider(String),
}

pub type Result<T> = std::result::Result<T, AlgebraError>;
