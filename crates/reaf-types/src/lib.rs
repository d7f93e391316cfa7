//! Foundation types for the bulk reaffirmation toolkit.
//!
//! This crate provides the identifier, status, and action types shared by the
//! tree model, the batch engine, and the persistence adapter. Every other
//! `reaf-*` crate depends on `reaf-types`.
//!
//! # Key Types
//!
//! - [`EntityId`] / [`VersionId`] / [`CombinationId`] -- Node identifiers
//! - [`OperationId`] -- UUID v7 identifier for one bulk run
//! - [`ReaffirmationStatus`] -- CURRENT / DUE_SOON / OVERDUE, derived from a due date
//! - [`ReaffirmationAction`] -- As-is or with-changes reaffirmation
//! - [`RequirementRef`] / [`NewRequirement`] -- Requirement text references
//! - [`Classification`] -- The attribute tuple that identifies a combination

pub mod action;
pub mod error;
pub mod ids;
pub mod status;

pub use action::{Classification, NewRequirement, ReaffirmationAction, RequirementRef};
pub use error::TypeError;
pub use ids::{CombinationId, EntityId, OperationId, VersionId};
pub use status::{ReaffirmationStatus, DEFAULT_DUE_SOON_DAYS};
