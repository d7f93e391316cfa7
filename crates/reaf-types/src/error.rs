use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("identifier must not be empty")]
    EmptyIdentifier,

    #[error("unknown reaffirmation status: {0}")]
    UnknownStatus(String),

    #[error("unknown reaffirmation action: {0}")]
    UnknownAction(String),
}
