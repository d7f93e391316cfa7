use reaf_types::{CombinationId, EntityId, VersionId};

/// Errors from tree and selection operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),

    #[error("unknown version: {0}")]
    UnknownVersion(VersionId),

    #[error("unknown combination: {0}")]
    UnknownCombination(CombinationId),
}

/// Result alias for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;
