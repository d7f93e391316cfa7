//! High-level API for reviewing and bulk-reaffirming compliance
//! combinations.
//!
//! [`Tracker`] ties the pieces together: it pages entities and
//! combinations out of a [`ComplianceRepository`] into a [`TreeModel`],
//! turns the current selection into a bulk run on the
//! [`BulkReaffirmationEngine`], and diffs requirement text.

pub mod config;
pub mod error;
pub mod tracker;

pub use config::TrackerConfig;
pub use error::{SdkError, SdkResult};
pub use tracker::Tracker;

// Re-export key types
pub use reaf_diff::{DiffKind, DiffLine, DiffStrategy};
pub use reaf_engine::{
    BulkOperationProgress, BulkReaffirmationEngine, BulkReaffirmationRequest, EngineConfig,
    OperationStatus, ProgressMessage, ProgressStream,
};
pub use reaf_store::{ComplianceRepository, EntityFilters, InMemoryRepository, RepositoryConfig};
pub use reaf_tree::{ExpandOutcome, TreeModel, TriState};
pub use reaf_types::{
    CombinationId, EntityId, NewRequirement, OperationId, ReaffirmationAction,
    ReaffirmationStatus, VersionId,
};
