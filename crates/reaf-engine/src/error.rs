use reaf_types::OperationId;

/// Errors returned synchronously by the engine and controller.
///
/// Batch outcomes, including engine-level failures inside a run, are never
/// reported this way; they arrive as [`crate::ProgressMessage`]s.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    /// A batch is already in flight on this engine.
    #[error("bulk operation {running} is still running")]
    Busy { running: OperationId },

    /// No tokio runtime is available to host the batch task.
    #[error("no async runtime available")]
    NoRuntime,

    /// The controller's dispatcher task has stopped.
    #[error("controller is shut down")]
    ControllerClosed,
}

/// A request the engine refuses to process.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("combination id at position {0} is blank")]
    BlankCombinationId(usize),

    #[error("REAFFIRMED_WITH_CHANGES requires at least one new requirement")]
    MissingRequirements,

    #[error("new requirement at position {0} has a blank title or text")]
    BlankRequirement(usize),
}

/// Convenience alias for engine results.
pub type EngineResult<T> = Result<T, EngineError>;
