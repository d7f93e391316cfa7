use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Width of the DUE_SOON window used when no other window is configured.
pub const DEFAULT_DUE_SOON_DAYS: i64 = 30;

/// Reaffirmation standing of a compliance item.
///
/// Variants are ordered by severity so that `max` yields the worst status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReaffirmationStatus {
    /// Due date is further away than the DUE_SOON window.
    Current,
    /// Due date falls within the window.
    DueSoon,
    /// Due date has passed.
    Overdue,
}

impl ReaffirmationStatus {
    /// Derive the status of an item due at `due`, as seen at `now`.
    pub fn derive(due: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> Self {
        if due < now {
            Self::Overdue
        } else if due <= now + window {
            Self::DueSoon
        } else {
            Self::Current
        }
    }

    /// [`Self::derive`] with the default 30-day window.
    pub fn derive_default(due: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::derive(due, now, Duration::days(DEFAULT_DUE_SOON_DAYS))
    }

    /// The most severe status in `statuses`; `Current` when empty.
    pub fn worst(statuses: impl IntoIterator<Item = Self>) -> Self {
        statuses.into_iter().max().unwrap_or(Self::Current)
    }

    /// Wire name (`CURRENT`, `DUE_SOON`, `OVERDUE`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "CURRENT",
            Self::DueSoon => "DUE_SOON",
            Self::Overdue => "OVERDUE",
        }
    }
}

impl fmt::Display for ReaffirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReaffirmationStatus {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CURRENT" => Ok(Self::Current),
            "DUE_SOON" => Ok(Self::DueSoon),
            "OVERDUE" => Ok(Self::Overdue),
            _ => Err(TypeError::UnknownStatus(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-06-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn past_due_is_overdue() {
        let due = now() - Duration::seconds(1);
        assert_eq!(
            ReaffirmationStatus::derive_default(due, now()),
            ReaffirmationStatus::Overdue
        );
    }

    #[test]
    fn within_window_is_due_soon() {
        assert_eq!(
            ReaffirmationStatus::derive_default(now(), now()),
            ReaffirmationStatus::DueSoon
        );
        let due = now() + Duration::days(30);
        assert_eq!(
            ReaffirmationStatus::derive_default(due, now()),
            ReaffirmationStatus::DueSoon
        );
    }

    #[test]
    fn beyond_window_is_current() {
        let due = now() + Duration::days(31);
        assert_eq!(
            ReaffirmationStatus::derive_default(due, now()),
            ReaffirmationStatus::Current
        );
    }

    #[test]
    fn worst_picks_most_severe() {
        use ReaffirmationStatus::*;
        assert_eq!(ReaffirmationStatus::worst([Current, Overdue, DueSoon]), Overdue);
        assert_eq!(ReaffirmationStatus::worst([Current, DueSoon]), DueSoon);
        assert_eq!(ReaffirmationStatus::worst(std::iter::empty()), Current);
    }

    #[test]
    fn wire_names() {
        let json = serde_json::to_string(&ReaffirmationStatus::DueSoon).unwrap();
        assert_eq!(json, "\"DUE_SOON\"");
        assert_eq!("overdue".parse::<ReaffirmationStatus>(), Ok(ReaffirmationStatus::Overdue));
        assert!("late".parse::<ReaffirmationStatus>().is_err());
    }
}
