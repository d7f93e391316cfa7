use serde::{Deserialize, Serialize};

use reaf_store::EntityRecord;
use reaf_types::{CombinationId, EntityId, VersionId};

/// Visible expansion state of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpansionState {
    /// Children hidden. They may or may not be loaded.
    Collapsed,
    /// A fetch for the children is in flight.
    Expanding,
    /// Children loaded and shown.
    ExpandedLoaded,
}

/// An entity row in the flat entity table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityNode {
    pub id: EntityId,
    pub name: String,
    pub total: usize,
    pub due: usize,
    pub overdue: usize,
    /// Child versions, ordered by sequence number.
    pub version_ids: Vec<VersionId>,
    /// Set once the first page of combinations has produced version nodes.
    pub versions_loaded: bool,
    /// Set once every page of combinations has been applied.
    pub combinations_loaded: bool,
    /// Offset of the next unfetched page, if any.
    pub next_offset: Option<usize>,
}

impl EntityNode {
    pub(crate) fn from_record(record: &EntityRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            total: record.total,
            due: record.due,
            overdue: record.overdue,
            version_ids: Vec::new(),
            versions_loaded: false,
            combinations_loaded: false,
            next_offset: None,
        }
    }

    pub(crate) fn update_counters(&mut self, record: &EntityRecord) {
        self.name = record.name.clone();
        self.total = record.total;
        self.due = record.due;
        self.overdue = record.overdue;
    }

    /// Returns `true` once any children have been fetched.
    pub fn is_loaded(&self) -> bool {
        self.versions_loaded
    }

    /// Returns `true` if further pages remain on the server.
    pub fn has_more(&self) -> bool {
        self.next_offset.is_some()
    }
}

/// A version row in the flat version table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionNode {
    pub id: VersionId,
    pub entity_id: EntityId,
    pub sequence: u32,
    /// Loaded child combinations, in fetch order.
    pub combination_ids: Vec<CombinationId>,
    /// Every combination of this version has been fetched.
    pub loaded: bool,
}
