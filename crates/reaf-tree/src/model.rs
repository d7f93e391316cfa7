use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use reaf_store::{CombinationPage, CombinationRecord, EntityListing};
use reaf_types::{
    CombinationId, EntityId, ReaffirmationStatus, VersionId, DEFAULT_DUE_SOON_DAYS,
};

use crate::error::{TreeError, TreeResult};
use crate::node::{EntityNode, ExpansionState, VersionNode};
use crate::selection::SelectionState;

/// What the caller must do after toggling an entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpandOutcome {
    /// The entity is now expanding; fetch the page at `offset` and hand it to
    /// [`TreeModel::apply_entity_page`].
    FetchRequired { entity: EntityId, offset: usize },
    /// Children were already loaded and are now shown.
    Shown,
    /// The entity was collapsed. Children and selection are kept.
    Hidden,
    /// A fetch is already in flight; nothing changed.
    AlreadyLoading,
}

/// Flat-table tree of entities, versions and combinations.
///
/// Mutated only from the caller's side. The batch engine never touches it;
/// after a run the caller re-queries the repository and feeds the results
/// back through [`Self::replace_entities`] and [`Self::apply_entity_page`].
#[derive(Clone, Debug)]
pub struct TreeModel {
    pub(crate) entity_order: Vec<EntityId>,
    pub(crate) entities: HashMap<EntityId, EntityNode>,
    pub(crate) versions: HashMap<VersionId, VersionNode>,
    pub(crate) combinations: HashMap<CombinationId, CombinationRecord>,
    pub(crate) loading: HashSet<EntityId>,
    pub(crate) selection: SelectionState,
    due_soon_window: Duration,
}

impl TreeModel {
    /// Create an empty tree using the default DUE_SOON window.
    pub fn new() -> Self {
        Self::with_due_soon_window(Duration::days(DEFAULT_DUE_SOON_DAYS))
    }

    /// Create an empty tree with an explicit DUE_SOON window.
    pub fn with_due_soon_window(window: Duration) -> Self {
        Self {
            entity_order: Vec::new(),
            entities: HashMap::new(),
            versions: HashMap::new(),
            combinations: HashMap::new(),
            loading: HashSet::new(),
            selection: SelectionState::default(),
            due_soon_window: window,
        }
    }

    // ---- Lookups ----

    pub fn entity(&self, id: &EntityId) -> TreeResult<&EntityNode> {
        self.entities
            .get(id)
            .ok_or_else(|| TreeError::UnknownEntity(id.clone()))
    }

    pub fn version(&self, id: &VersionId) -> TreeResult<&VersionNode> {
        self.versions
            .get(id)
            .ok_or_else(|| TreeError::UnknownVersion(id.clone()))
    }

    pub fn combination(&self, id: &CombinationId) -> TreeResult<&CombinationRecord> {
        self.combinations
            .get(id)
            .ok_or_else(|| TreeError::UnknownCombination(id.clone()))
    }

    /// Entities in listing order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityNode> {
        self.entity_order.iter().filter_map(|id| self.entities.get(id))
    }

    /// Versions of an entity, ordered by sequence.
    pub fn versions_of(&self, entity: &EntityId) -> TreeResult<Vec<&VersionNode>> {
        let node = self.entity(entity)?;
        Ok(node
            .version_ids
            .iter()
            .filter_map(|id| self.versions.get(id))
            .collect())
    }

    /// Loaded combinations of a version, in fetch order.
    pub fn combinations_of(&self, version: &VersionId) -> TreeResult<Vec<&CombinationRecord>> {
        let node = self.version(version)?;
        Ok(node
            .combination_ids
            .iter()
            .filter_map(|id| self.combinations.get(id))
            .collect())
    }

    /// Number of loaded combinations across the tree.
    pub fn loaded_combination_count(&self) -> usize {
        self.combinations.len()
    }

    /// Entities that have fetched at least one page of children.
    pub fn loaded_entities(&self) -> Vec<EntityId> {
        self.entities()
            .filter(|e| e.is_loaded())
            .map(|e| e.id.clone())
            .collect()
    }

    /// The selection sets, including expansion markers.
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn due_soon_window(&self) -> Duration {
        self.due_soon_window
    }

    // ---- Status ----

    /// Status of one combination at `now`.
    pub fn combination_status(
        &self,
        id: &CombinationId,
        now: DateTime<Utc>,
    ) -> TreeResult<ReaffirmationStatus> {
        Ok(self.combination(id)?.status(now, self.due_soon_window))
    }

    /// Worst status among a version's loaded combinations.
    pub fn version_status(
        &self,
        id: &VersionId,
        now: DateTime<Utc>,
    ) -> TreeResult<ReaffirmationStatus> {
        let window = self.due_soon_window;
        Ok(ReaffirmationStatus::worst(
            self.combinations_of(id)?
                .into_iter()
                .map(|c| c.status(now, window)),
        ))
    }

    // ---- Expansion ----

    /// Current expansion state of an entity.
    pub fn entity_state(&self, id: &EntityId) -> TreeResult<ExpansionState> {
        let node = self.entity(id)?;
        Ok(if self.loading.contains(id) {
            ExpansionState::Expanding
        } else if self.selection.expanded_entities.contains(id) && node.is_loaded() {
            ExpansionState::ExpandedLoaded
        } else {
            ExpansionState::Collapsed
        })
    }

    /// Returns `true` if a fetch for `id` is in flight.
    pub fn is_loading(&self, id: &EntityId) -> bool {
        self.loading.contains(id)
    }

    /// Expand or collapse an entity.
    ///
    /// Toggling a node whose fetch is outstanding is a no-op, so a fetch is
    /// never issued twice for the same node.
    pub fn toggle_entity(&mut self, id: &EntityId) -> TreeResult<ExpandOutcome> {
        let loaded = self.entity(id)?.is_loaded();
        if self.loading.contains(id) {
            return Ok(ExpandOutcome::AlreadyLoading);
        }
        if self.selection.expanded_entities.remove(id) {
            debug!(entity = %id, "entity collapsed");
            return Ok(ExpandOutcome::Hidden);
        }
        self.selection.expanded_entities.insert(id.clone());
        if loaded {
            return Ok(ExpandOutcome::Shown);
        }
        self.loading.insert(id.clone());
        debug!(entity = %id, "entity expanding, fetch required");
        Ok(ExpandOutcome::FetchRequired {
            entity: id.clone(),
            offset: 0,
        })
    }

    /// Reserve the next page of an entity for fetching.
    ///
    /// Returns the offset to fetch, or `None` when every page is loaded or a
    /// fetch is already in flight.
    pub fn begin_load_more(&mut self, id: &EntityId) -> TreeResult<Option<usize>> {
        let next = self.entity(id)?.next_offset;
        if self.loading.contains(id) {
            return Ok(None);
        }
        if let Some(offset) = next {
            self.loading.insert(id.clone());
            return Ok(Some(offset));
        }
        Ok(None)
    }

    /// Abandon an in-flight fetch. A first-page failure collapses the entity.
    pub fn fail_entity_fetch(&mut self, id: &EntityId) -> TreeResult<()> {
        let loaded = self.entity(id)?.is_loaded();
        self.loading.remove(id);
        if !loaded {
            self.selection.expanded_entities.remove(id);
        }
        warn!(entity = %id, "entity fetch failed");
        Ok(())
    }

    /// Expand or collapse a version. Returns `true` if now expanded.
    pub fn toggle_version(&mut self, id: &VersionId) -> TreeResult<bool> {
        self.version(id)?;
        if self.selection.expanded_versions.remove(id) {
            Ok(false)
        } else {
            self.selection.expanded_versions.insert(id.clone());
            Ok(true)
        }
    }

    /// Apply a fetched page of an entity's combinations.
    ///
    /// A page at offset 0 replaces the entity's children; later pages append.
    /// Selection membership is left untouched, so a reload keeps the
    /// selection of combinations that come back.
    pub fn apply_entity_page(
        &mut self,
        id: &EntityId,
        offset: usize,
        page: CombinationPage,
    ) -> TreeResult<()> {
        self.entity(id)?;
        self.loading.remove(id);

        if offset == 0 {
            self.drop_children(id);
        }

        let mut applied = 0usize;
        for record in page.combinations {
            if &record.entity_id != id {
                warn!(entity = %id, combination = %record.id, "ignoring combination of another entity");
                continue;
            }
            self.insert_combination(record);
            applied += 1;
        }

        let complete = !page.has_more;
        let version_ids = {
            let node = self
                .entities
                .get_mut(id)
                .ok_or_else(|| TreeError::UnknownEntity(id.clone()))?;
            node.versions_loaded = true;
            node.combinations_loaded = complete;
            node.next_offset = page.next_offset.filter(|_| page.has_more);
            node.version_ids.clone()
        };
        for version_id in &version_ids {
            if let Some(version) = self.versions.get_mut(version_id) {
                version.loaded = complete;
            }
        }
        self.selection.refresh_versions(
            version_ids.iter().filter_map(|v| self.versions.get(v)),
        );

        debug!(entity = %id, offset, applied, complete, "entity page applied");
        Ok(())
    }

    fn insert_combination(&mut self, record: CombinationRecord) {
        let entity_id = record.entity_id.clone();
        let version_id = record.version_id.clone();
        let combination_id = record.id.clone();

        // A reload may move a combination to a newer version.
        if let Some(previous) = self.combinations.get(&combination_id) {
            if previous.version_id != version_id {
                let old_version = previous.version_id.clone();
                self.unlink_combination(&old_version, &combination_id);
            }
        }

        let version = self
            .versions
            .entry(version_id.clone())
            .or_insert_with(|| VersionNode {
                id: version_id.clone(),
                entity_id: entity_id.clone(),
                sequence: record.version_number(),
                combination_ids: Vec::new(),
                loaded: false,
            });
        if !version.combination_ids.contains(&combination_id) {
            version.combination_ids.push(combination_id.clone());
        }

        if let Some(entity) = self.entities.get_mut(&entity_id) {
            if !entity.version_ids.contains(&version_id) {
                entity.version_ids.push(version_id);
                let versions = &self.versions;
                entity
                    .version_ids
                    .sort_by_key(|v| versions.get(v).map(|n| n.sequence).unwrap_or_default());
            }
        }

        self.combinations.insert(combination_id, record);
    }

    fn unlink_combination(&mut self, version_id: &VersionId, combination_id: &CombinationId) {
        let emptied = match self.versions.get_mut(version_id) {
            Some(version) => {
                version.combination_ids.retain(|c| c != combination_id);
                version.combination_ids.is_empty()
            }
            None => false,
        };
        if emptied {
            self.remove_version(version_id);
        }
    }

    fn remove_version(&mut self, version_id: &VersionId) {
        if let Some(version) = self.versions.remove(version_id) {
            if let Some(entity) = self.entities.get_mut(&version.entity_id) {
                entity.version_ids.retain(|v| v != version_id);
            }
            self.selection.selected_versions.remove(version_id);
            self.selection.expanded_versions.remove(version_id);
        }
    }

    fn drop_children(&mut self, id: &EntityId) {
        let version_ids = match self.entities.get_mut(id) {
            Some(entity) => std::mem::take(&mut entity.version_ids),
            None => return,
        };
        for version_id in version_ids {
            if let Some(version) = self.versions.remove(&version_id) {
                for combination_id in &version.combination_ids {
                    self.combinations.remove(combination_id);
                }
            }
            // Expansion of a version that comes back is kept; selection is
            // re-derived on apply.
            self.selection.selected_versions.remove(&version_id);
        }
    }

    // ---- Refresh ----

    /// Replace the entity listing, keeping loaded children of entities that
    /// are still listed.
    ///
    /// Entities that disappeared are dropped along with their children,
    /// expansion markers and selection.
    pub fn replace_entities(&mut self, listing: &EntityListing) {
        let listed: HashSet<&EntityId> = listing.entities.iter().map(|e| &e.id).collect();
        let removed: Vec<EntityId> = self
            .entity_order
            .iter()
            .filter(|id| !listed.contains(id))
            .cloned()
            .collect();
        for id in &removed {
            self.drop_children(id);
            self.entities.remove(id);
            self.loading.remove(id);
            self.selection.expanded_entities.remove(id);
        }

        self.entity_order.clear();
        for record in &listing.entities {
            self.entity_order.push(record.id.clone());
            self.entities
                .entry(record.id.clone())
                .and_modify(|node| node.update_counters(record))
                .or_insert_with(|| EntityNode::from_record(record));
        }

        self.retain_existing_selection();
        debug!(
            entities = listing.entities.len(),
            removed = removed.len(),
            "entity listing replaced"
        );
    }

    /// Drop selected ids that no longer exist in the tree.
    pub fn retain_existing_selection(&mut self) {
        let combinations = &self.combinations;
        self.selection
            .selected_combinations
            .retain(|id| combinations.contains_key(id));
        let versions = &self.versions;
        self.selection
            .selected_versions
            .retain(|id| versions.contains_key(id));
        self.selection
            .expanded_versions
            .retain(|id| versions.contains_key(id));
    }
}

impl Default for TreeModel {
    fn default() -> Self {
        Self::new()
    }
}
