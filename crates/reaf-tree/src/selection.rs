//! Selection propagation over the tree.
//!
//! Parent actions push membership down to loaded combinations. Parent
//! tri-state is a pure function of the selected-combination set, computed on
//! every query, so no stored parent flag can drift out of sync.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use reaf_types::{CombinationId, EntityId, VersionId};

use crate::error::{TreeError, TreeResult};
use crate::model::TreeModel;
use crate::node::VersionNode;

/// Aggregate selection of a parent node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriState {
    None,
    Partial,
    All,
}

impl TriState {
    /// Derive from `selected` out of `total` loaded children.
    ///
    /// A node without loaded children is `None`.
    pub fn from_counts(selected: usize, total: usize) -> Self {
        if selected == 0 || total == 0 {
            Self::None
        } else if selected >= total {
            Self::All
        } else {
            Self::Partial
        }
    }
}

/// Identifier sets backing selection and expansion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
    /// Versions whose loaded combinations are all selected. Maintained after
    /// every selection change for callers; tri-state queries never read it.
    pub selected_versions: HashSet<VersionId>,
    pub selected_combinations: HashSet<CombinationId>,
    pub expanded_entities: HashSet<EntityId>,
    pub expanded_versions: HashSet<VersionId>,
}

impl SelectionState {
    pub fn is_selected(&self, id: &CombinationId) -> bool {
        self.selected_combinations.contains(id)
    }

    fn count_selected<'a>(&self, ids: impl IntoIterator<Item = &'a CombinationId>) -> (usize, usize) {
        ids.into_iter().fold((0, 0), |(selected, total), id| {
            (selected + usize::from(self.is_selected(id)), total + 1)
        })
    }

    pub(crate) fn derive_version(&self, version: &VersionNode) -> TriState {
        let (selected, total) = self.count_selected(&version.combination_ids);
        TriState::from_counts(selected, total)
    }

    pub(crate) fn refresh_versions<'a>(&mut self, versions: impl IntoIterator<Item = &'a VersionNode>) {
        for version in versions {
            if self.derive_version(version) == TriState::All {
                self.selected_versions.insert(version.id.clone());
            } else {
                self.selected_versions.remove(&version.id);
            }
        }
    }

    fn set_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a CombinationId>, select: bool) {
        for id in ids {
            if select {
                self.selected_combinations.insert(id.clone());
            } else {
                self.selected_combinations.remove(id);
            }
        }
    }
}

impl TreeModel {
    /// Toggle one combination. Returns `true` if it is now selected.
    pub fn select_combination(&mut self, id: &CombinationId) -> TreeResult<bool> {
        let version_id = self.combination(id)?.version_id.clone();
        let selected = if self.selection.selected_combinations.remove(id) {
            false
        } else {
            self.selection.selected_combinations.insert(id.clone());
            true
        };
        self.selection.refresh_versions(self.versions.get(&version_id));
        Ok(selected)
    }

    /// Set every loaded combination of a version to `select_all`.
    ///
    /// Combinations not yet loaded are unaffected and stay unselected.
    pub fn select_version(&mut self, id: &VersionId, select_all: bool) -> TreeResult<()> {
        let version = self
            .versions
            .get(id)
            .ok_or_else(|| TreeError::UnknownVersion(id.clone()))?;
        self.selection.set_all(&version.combination_ids, select_all);
        self.selection.refresh_versions(Some(version));
        debug!(version = %id, select_all, "version selection set");
        Ok(())
    }

    /// Set every loaded combination of every loaded version of an entity.
    pub fn select_entity(&mut self, id: &EntityId, select_all: bool) -> TreeResult<()> {
        let entity = self
            .entities
            .get(id)
            .ok_or_else(|| TreeError::UnknownEntity(id.clone()))?;
        for version_id in &entity.version_ids {
            if let Some(version) = self.versions.get(version_id) {
                self.selection.set_all(&version.combination_ids, select_all);
                self.selection.refresh_versions(Some(version));
            }
        }
        debug!(entity = %id, select_all, "entity selection set");
        Ok(())
    }

    /// Empty both selection sets. Expansion is unaffected.
    pub fn clear_selection(&mut self) {
        self.selection.selected_combinations.clear();
        self.selection.selected_versions.clear();
    }

    /// Tri-state of a version over its loaded combinations.
    pub fn version_selection_state(&self, id: &VersionId) -> TreeResult<TriState> {
        Ok(self.selection.derive_version(self.version(id)?))
    }

    /// Tri-state of an entity over the combinations of all its versions.
    pub fn entity_selection_state(&self, id: &EntityId) -> TreeResult<TriState> {
        let entity = self.entity(id)?;
        let (selected, total) = self.selection.count_selected(
            entity
                .version_ids
                .iter()
                .filter_map(|v| self.versions.get(v))
                .flat_map(|v| &v.combination_ids),
        );
        Ok(TriState::from_counts(selected, total))
    }

    /// Selected combinations present in the tree, in tree order
    /// (entity listing, then version sequence, then fetch order).
    pub fn selected_combination_ids(&self) -> Vec<CombinationId> {
        self.entities()
            .flat_map(|e| &e.version_ids)
            .filter_map(|v| self.versions.get(v))
            .flat_map(|v| &v.combination_ids)
            .filter(|c| self.selection.is_selected(c))
            .cloned()
            .collect()
    }

    /// Number of selected combinations present in the tree.
    pub fn selected_count(&self) -> usize {
        self.selected_combination_ids().len()
    }

    /// Replace the selection with exactly `ids`, ignoring ids not in the tree.
    pub fn select_only<'a>(&mut self, ids: impl IntoIterator<Item = &'a CombinationId>) {
        self.clear_selection();
        let combinations = &self.combinations;
        let known: Vec<CombinationId> = ids
            .into_iter()
            .filter(|id| combinations.contains_key(*id))
            .cloned()
            .collect();
        self.selection.set_all(&known, true);
        let versions = &self.versions;
        self.selection.refresh_versions(versions.values());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::loaded_tree;

    #[test]
    fn tri_state_from_counts() {
        assert_eq!(TriState::from_counts(0, 3), TriState::None);
        assert_eq!(TriState::from_counts(2, 3), TriState::Partial);
        assert_eq!(TriState::from_counts(3, 3), TriState::All);
        assert_eq!(TriState::from_counts(0, 0), TriState::None);
    }

    #[test]
    fn toggling_a_combination() {
        let mut tree = loaded_tree();
        assert!(tree.select_combination(&"c1".into()).unwrap());
        assert_eq!(
            tree.version_selection_state(&"e1-v1".into()).unwrap(),
            TriState::Partial
        );
        assert!(!tree.select_combination(&"c1".into()).unwrap());
        assert_eq!(
            tree.version_selection_state(&"e1-v1".into()).unwrap(),
            TriState::None
        );
    }

    #[test]
    fn selecting_version_makes_entity_partial_then_all() {
        let mut tree = loaded_tree();
        tree.select_version(&"e1-v1".into(), true).unwrap();
        assert_eq!(
            tree.version_selection_state(&"e1-v1".into()).unwrap(),
            TriState::All
        );
        assert_eq!(
            tree.entity_selection_state(&"e1".into()).unwrap(),
            TriState::Partial
        );

        tree.select_version(&"e1-v2".into(), true).unwrap();
        assert_eq!(tree.entity_selection_state(&"e1".into()).unwrap(), TriState::All);
        assert_eq!(tree.entity_selection_state(&"e2".into()).unwrap(), TriState::None);
    }

    #[test]
    fn deselecting_one_child_drops_version_from_all_to_partial() {
        let mut tree = loaded_tree();
        tree.select_version(&"e1-v1".into(), true).unwrap();
        assert!(tree.selection().selected_versions.contains(&"e1-v1".into()));

        tree.select_combination(&"c2".into()).unwrap();
        assert_eq!(
            tree.version_selection_state(&"e1-v1".into()).unwrap(),
            TriState::Partial
        );
        assert!(!tree.selection().selected_versions.contains(&"e1-v1".into()));
    }

    #[test]
    fn entity_selection_cascades_and_clears() {
        let mut tree = loaded_tree();
        tree.select_entity(&"e1".into(), true).unwrap();
        assert_eq!(tree.selected_count(), 3);
        assert_eq!(
            tree.version_selection_state(&"e1-v2".into()).unwrap(),
            TriState::All
        );

        tree.select_entity(&"e1".into(), false).unwrap();
        assert_eq!(tree.selected_count(), 0);
        assert!(tree.selection().selected_versions.is_empty());
    }

    #[test]
    fn version_select_ignores_unloaded_children() {
        use crate::model::tests::{listing, page, record};
        let mut tree = TreeModel::new();
        tree.replace_entities(&listing(&["e1"]));
        tree.apply_entity_page(&"e1".into(), 0, page(vec![record("c1", "e1", 1)], Some(1)))
            .unwrap();
        tree.select_version(&"e1-v1".into(), true).unwrap();
        assert_eq!(
            tree.version_selection_state(&"e1-v1".into()).unwrap(),
            TriState::All
        );

        // The next page arrives unselected.
        tree.apply_entity_page(&"e1".into(), 1, page(vec![record("c2", "e1", 1)], None))
            .unwrap();
        assert_eq!(
            tree.version_selection_state(&"e1-v1".into()).unwrap(),
            TriState::Partial
        );
    }

    #[test]
    fn clear_selection_keeps_expansion() {
        let mut tree = loaded_tree();
        tree.toggle_entity(&"e1".into()).unwrap();
        tree.select_entity(&"e2".into(), true).unwrap();
        tree.clear_selection();
        assert_eq!(tree.selected_count(), 0);
        assert!(tree.selection().expanded_entities.contains(&"e1".into()));
    }

    #[test]
    fn selected_ids_follow_tree_order() {
        let mut tree = loaded_tree();
        tree.select_combination(&"c4".into()).unwrap();
        tree.select_combination(&"c3".into()).unwrap();
        tree.select_combination(&"c1".into()).unwrap();
        let ids: Vec<String> = tree
            .selected_combination_ids()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(ids, vec!["c1", "c3", "c4"]);
    }

    #[test]
    fn select_only_replaces_selection() {
        let mut tree = loaded_tree();
        tree.select_entity(&"e1".into(), true).unwrap();
        let keep: Vec<CombinationId> = vec!["c4".into(), "ghost".into()];
        tree.select_only(&keep);
        assert_eq!(tree.selected_combination_ids(), vec![CombinationId::from("c4")]);
        assert!(tree.selection().selected_versions.contains(&"e2-v1".into()));
    }

    #[test]
    fn unknown_ids_rejected() {
        let mut tree = loaded_tree();
        assert_eq!(
            tree.select_combination(&"nope".into()),
            Err(TreeError::UnknownCombination("nope".into()))
        );
        assert!(tree.select_version(&"nope".into(), true).is_err());
        assert!(tree.entity_selection_state(&"nope".into()).is_err());
    }
}
