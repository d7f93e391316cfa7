use serde::{Deserialize, Serialize};

use reaf_store::ReaffirmCommand;
use reaf_types::{CombinationId, NewRequirement, ReaffirmationAction};

use crate::error::RequestError;

/// A batch of combinations to reaffirm with one action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkReaffirmationRequest {
    /// Processed in this order.
    pub combination_ids: Vec<CombinationId>,
    pub action: ReaffirmationAction,
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_requirements: Option<Vec<NewRequirement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

impl BulkReaffirmationRequest {
    /// An as-is reaffirmation of `ids`.
    pub fn as_is(ids: Vec<CombinationId>, comment: impl Into<String>) -> Self {
        Self {
            combination_ids: ids,
            action: ReaffirmationAction::ReaffirmedAsIs,
            comment: comment.into(),
            new_requirements: None,
            actor: None,
        }
    }

    /// A with-changes reaffirmation of `ids`.
    pub fn with_changes(
        ids: Vec<CombinationId>,
        comment: impl Into<String>,
        requirements: Vec<NewRequirement>,
    ) -> Self {
        Self {
            combination_ids: ids,
            action: ReaffirmationAction::ReaffirmedWithChanges,
            comment: comment.into(),
            new_requirements: Some(requirements),
            actor: None,
        }
    }

    /// Record who is performing the reaffirmation.
    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Number of items the batch will process.
    pub fn len(&self) -> usize {
        self.combination_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combination_ids.is_empty()
    }

    /// Reject requests the engine cannot run at all.
    pub fn validate(&self) -> Result<(), RequestError> {
        if let Some(index) = self.combination_ids.iter().position(|id| id.is_blank()) {
            return Err(RequestError::BlankCombinationId(index));
        }
        if self.action.has_changes() {
            let requirements = self
                .new_requirements
                .as_deref()
                .filter(|r| !r.is_empty())
                .ok_or(RequestError::MissingRequirements)?;
            if let Some(index) = requirements
                .iter()
                .position(|r| r.title.trim().is_empty() || r.text.trim().is_empty())
            {
                return Err(RequestError::BlankRequirement(index));
            }
        }
        Ok(())
    }

    /// The per-item command handed to the repository.
    pub fn to_command(&self) -> ReaffirmCommand {
        ReaffirmCommand {
            action: self.action,
            comment: self.comment.clone(),
            new_requirements: self.new_requirements.clone().unwrap_or_default(),
            actor: self.actor.clone(),
        }
    }
}
