use async_trait::async_trait;
use reaf_types::{CombinationId, EntityId};

use crate::error::StoreResult;
use crate::filters::EntityFilters;
use crate::records::{CombinationPage, EntityListing, ReaffirmCommand};

/// Record store consumed by the tree model and the batch engine.
///
/// Implementations must be shareable across tasks: the engine calls
/// `reaffirm` from a background task while the caller may be paging
/// combinations on its own task.
#[async_trait]
pub trait ComplianceRepository: Send + Sync {
    /// Reaffirm a single combination.
    ///
    /// `Err` is a per-item failure; the engine records it and moves on.
    async fn reaffirm(&self, id: &CombinationId, command: &ReaffirmCommand) -> StoreResult<()>;

    /// List entities with aggregate counters, restricted by `filters`.
    async fn get_entities(&self, filters: &EntityFilters) -> StoreResult<EntityListing>;

    /// Fetch one page of an entity's combinations.
    ///
    /// `offset` is the index of the first combination returned; `limit` is
    /// the maximum page length and must be positive.
    async fn get_entity_combinations(
        &self,
        entity: &EntityId,
        offset: usize,
        limit: usize,
        filters: &EntityFilters,
    ) -> StoreResult<CombinationPage>;
}
