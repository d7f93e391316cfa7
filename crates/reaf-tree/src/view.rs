//! Nested, render-ready projection of the flat tree.

use chrono::{DateTime, Utc};

use reaf_store::CombinationRecord;
use reaf_types::{EntityId, ReaffirmationStatus, VersionId};

use crate::model::TreeModel;
use crate::node::ExpansionState;
use crate::selection::TriState;

/// A combination row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CombinationView<'a> {
    pub record: &'a CombinationRecord,
    pub status: ReaffirmationStatus,
    pub selected: bool,
}

/// A version row with its loaded combinations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionView<'a> {
    pub id: &'a VersionId,
    pub sequence: u32,
    pub status: ReaffirmationStatus,
    pub selection: TriState,
    pub expanded: bool,
    pub loaded: bool,
    pub combinations: Vec<CombinationView<'a>>,
}

/// An entity row with its loaded versions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityView<'a> {
    pub id: &'a EntityId,
    pub name: &'a str,
    pub total: usize,
    pub due: usize,
    pub overdue: usize,
    pub state: ExpansionState,
    pub selection: TriState,
    pub has_more: bool,
    /// Empty until the first page is loaded.
    pub versions: Vec<VersionView<'a>>,
}

impl EntityView<'_> {
    /// Number of combinations shown across all versions.
    pub fn loaded_combinations(&self) -> usize {
        self.versions.iter().map(|v| v.combinations.len()).sum()
    }
}

impl TreeModel {
    /// Derive the nested view at `now`.
    ///
    /// Every entity is included regardless of expansion; renderers decide
    /// what to show from [`EntityView::state`] and [`VersionView::expanded`].
    pub fn nested_view(&self, now: DateTime<Utc>) -> Vec<EntityView<'_>> {
        let window = self.due_soon_window();
        self.entities()
            .map(|entity| {
                let versions = entity
                    .version_ids
                    .iter()
                    .filter_map(|id| self.versions.get(id))
                    .map(|version| {
                        let combinations: Vec<CombinationView<'_>> = version
                            .combination_ids
                            .iter()
                            .filter_map(|id| self.combinations.get(id))
                            .map(|record| CombinationView {
                                record,
                                status: record.status(now, window),
                                selected: self.selection.is_selected(&record.id),
                            })
                            .collect();
                        VersionView {
                            id: &version.id,
                            sequence: version.sequence,
                            status: ReaffirmationStatus::worst(
                                combinations.iter().map(|c| c.status),
                            ),
                            selection: self.selection.derive_version(version),
                            expanded: self.selection.expanded_versions.contains(&version.id),
                            loaded: version.loaded,
                            combinations,
                        }
                    })
                    .collect();
                EntityView {
                    id: &entity.id,
                    name: &entity.name,
                    total: entity.total,
                    due: entity.due,
                    overdue: entity.overdue,
                    state: self
                        .entity_state(&entity.id)
                        .unwrap_or(ExpansionState::Collapsed),
                    selection: self
                        .entity_selection_state(&entity.id)
                        .unwrap_or(TriState::None),
                    has_more: entity.has_more(),
                    versions,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::loaded_tree;

    #[test]
    fn view_mirrors_tables() {
        let mut tree = loaded_tree();
        tree.toggle_entity(&"e1".into()).unwrap();
        tree.select_version(&"e1-v1".into(), true).unwrap();

        let view = tree.nested_view(Utc::now());
        assert_eq!(view.len(), 2);

        let e1 = &view[0];
        assert_eq!(e1.state, ExpansionState::ExpandedLoaded);
        assert_eq!(e1.selection, TriState::Partial);
        assert_eq!(e1.versions.len(), 2);
        assert_eq!(e1.loaded_combinations(), 3);
        assert_eq!(e1.versions[0].selection, TriState::All);
        assert!(e1.versions[0].combinations.iter().all(|c| c.selected));
        assert_eq!(e1.versions[0].status, ReaffirmationStatus::Current);

        let e2 = &view[1];
        assert_eq!(e2.state, ExpansionState::Collapsed);
        assert_eq!(e2.selection, TriState::None);
    }

    #[test]
    fn unloaded_entities_have_no_versions() {
        let mut tree = TreeModel::new();
        tree.replace_entities(&crate::model::tests::listing(&["e1"]));
        let view = tree.nested_view(Utc::now());
        assert!(view[0].versions.is_empty());
        assert!(!view[0].has_more);
    }
}
