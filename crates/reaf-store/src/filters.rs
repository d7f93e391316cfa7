use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use reaf_types::ReaffirmationStatus;

use crate::records::CombinationRecord;

/// Criteria narrowing the entity listing and combination pages.
///
/// Unset fields match everything. Attribute fields compare
/// case-insensitively; `search` is a case-insensitive substring match over
/// the entity name, requirement title and classification.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityFilters {
    pub search: Option<String>,
    pub status: Option<ReaffirmationStatus>,
    pub subject_type: Option<String>,
    pub transfer_location: Option<String>,
    pub recipient_type: Option<String>,
    pub purpose: Option<String>,
}

impl EntityFilters {
    /// Returns `true` if no criterion is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns `true` if `record` satisfies every set criterion.
    pub fn matches(&self, record: &CombinationRecord, now: DateTime<Utc>, window: Duration) -> bool {
        if let Some(status) = self.status {
            if record.status(now, window) != status {
                return false;
            }
        }
        let c = &record.classification;
        let attributes = [
            (&self.subject_type, &c.subject_type),
            (&self.transfer_location, &c.transfer_location),
            (&self.recipient_type, &c.recipient_type),
            (&self.purpose, &c.purpose),
        ];
        for (wanted, actual) in attributes {
            if let Some(wanted) = wanted {
                if !wanted.eq_ignore_ascii_case(actual) {
                    return false;
                }
            }
        }
        if let Some(ref search) = self.search {
            let needle = search.to_lowercase();
            let haystacks = [
                record.entity_name.as_str(),
                record.requirement.title.as_str(),
                c.subject_type.as_str(),
                c.transfer_location.as_str(),
                c.recipient_type.as_str(),
                c.purpose.as_str(),
            ];
            if !haystacks.iter().any(|h| h.to_lowercase().contains(&needle)) {
                return false;
            }
        }
        true
    }
}
