use reaf_types::{CombinationId, EntityId};

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The combination does not exist.
    #[error("combination not found")]
    CombinationNotFound(CombinationId),

    /// The entity does not exist.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The backend refused the reaffirmation.
    #[error("{message}")]
    Rejected { id: CombinationId, message: String },

    /// A with-changes reaffirmation arrived without replacement text.
    #[error("no new requirement text supplied")]
    MissingRequirements,

    /// The request parameters are unusable (e.g. a zero page size).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Seed data failed to parse.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for repository operations.
pub type StoreResult<T> = Result<T, StoreError>;
