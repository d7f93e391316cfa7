//! Persistence adapter for bulk reaffirmation.
//!
//! The core never talks to a concrete database. Everything it needs from the
//! record store goes through the [`ComplianceRepository`] trait: reaffirming
//! one combination, listing entities, and paging through an entity's
//! combinations for lazy tree expansion.
//!
//! # Backends
//!
//! - [`InMemoryRepository`] -- `RwLock`ed tables for tests, demos and the CLI,
//!   with failure injection and artificial latency.
//!
//! # Contract
//!
//! 1. Each call resolves or fails exactly once. No retries, no timeouts.
//! 2. `reaffirm` is not idempotent: calling it twice reaffirms twice.
//! 3. Pages are stable for a fixed data set and filter.

pub mod error;
pub mod filters;
pub mod memory;
pub mod records;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use filters::EntityFilters;
pub use memory::{InMemoryRepository, RepositoryConfig, RepositorySeed, SeedEntity};
pub use records::{
    CombinationPage, CombinationRecord, EntityListing, EntityRecord, EntitySummary,
    ReaffirmCommand,
};
pub use traits::ComplianceRepository;
