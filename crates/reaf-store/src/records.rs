use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use reaf_types::{
    Classification, CombinationId, EntityId, NewRequirement, ReaffirmationAction,
    ReaffirmationStatus, RequirementRef, VersionId,
};

/// A combination as stored by the record store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinationRecord {
    pub id: CombinationId,
    pub entity_id: EntityId,
    pub entity_name: String,
    pub version_id: VersionId,
    #[serde(flatten)]
    pub classification: Classification,
    pub requirement: RequirementRef,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub last_reaffirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_reaffirmed_by: Option<String>,
}

impl CombinationRecord {
    /// Reaffirmation status at `now` with a DUE_SOON window of `window`.
    pub fn status(&self, now: DateTime<Utc>, window: Duration) -> ReaffirmationStatus {
        ReaffirmationStatus::derive(self.due_date, now, window)
    }

    /// Sequence number of the requirement version this combination belongs to.
    pub fn version_number(&self) -> u32 {
        self.requirement.version_number
    }
}

/// An entity with aggregate counters over its combinations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    pub id: EntityId,
    pub name: String,
    pub total: usize,
    /// Combinations in DUE_SOON.
    pub due: usize,
    pub overdue: usize,
}

/// Totals across every listed entity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySummary {
    pub total_entities: usize,
    pub total_combinations: usize,
    pub due: usize,
    pub overdue: usize,
}

/// Result of [`crate::ComplianceRepository::get_entities`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityListing {
    pub entities: Vec<EntityRecord>,
    pub summary: EntitySummary,
}

/// One page of an entity's combinations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinationPage {
    pub combinations: Vec<CombinationRecord>,
    /// Matching combinations across all pages.
    pub total: usize,
    pub has_more: bool,
    pub next_offset: Option<usize>,
}

impl CombinationPage {
    /// An empty final page.
    pub fn empty() -> Self {
        Self {
            combinations: Vec::new(),
            total: 0,
            has_more: false,
            next_offset: None,
        }
    }
}

/// Everything the store needs to reaffirm one combination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaffirmCommand {
    pub action: ReaffirmationAction,
    pub comment: String,
    #[serde(default)]
    pub new_requirements: Vec<NewRequirement>,
    #[serde(default)]
    pub actor: Option<String>,
}

impl ReaffirmCommand {
    /// An as-is reaffirmation with the given comment.
    pub fn as_is(comment: impl Into<String>) -> Self {
        Self {
            action: ReaffirmationAction::ReaffirmedAsIs,
            comment: comment.into(),
            new_requirements: Vec::new(),
            actor: None,
        }
    }

    /// A with-changes reaffirmation carrying replacement requirements.
    pub fn with_changes(comment: impl Into<String>, requirements: Vec<NewRequirement>) -> Self {
        Self {
            action: ReaffirmationAction::ReaffirmedWithChanges,
            comment: comment.into(),
            new_requirements: requirements,
            actor: None,
        }
    }
}
