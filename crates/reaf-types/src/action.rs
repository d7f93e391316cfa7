use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// How a batch of combinations is reaffirmed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReaffirmationAction {
    /// The requirement is confirmed unchanged.
    ReaffirmedAsIs,
    /// The requirement is confirmed with replacement text.
    ReaffirmedWithChanges,
}

impl ReaffirmationAction {
    /// Returns `true` if the action carries new requirement text.
    pub fn has_changes(&self) -> bool {
        matches!(self, Self::ReaffirmedWithChanges)
    }
}

impl fmt::Display for ReaffirmationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReaffirmedAsIs => f.write_str("REAFFIRMED_AS_IS"),
            Self::ReaffirmedWithChanges => f.write_str("REAFFIRMED_WITH_CHANGES"),
        }
    }
}

impl FromStr for ReaffirmationAction {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "REAFFIRMED_AS_IS" | "AS_IS" => Ok(Self::ReaffirmedAsIs),
            "REAFFIRMED_WITH_CHANGES" | "WITH_CHANGES" => Ok(Self::ReaffirmedWithChanges),
            _ => Err(TypeError::UnknownAction(s.to_string())),
        }
    }
}

/// Replacement requirement text submitted with a with-changes reaffirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRequirement {
    pub title: String,
    pub text: String,
}

impl NewRequirement {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

/// Reference to the requirement revision a combination was produced under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementRef {
    pub title: String,
    pub text: String,
    pub version_number: u32,
}

/// The attribute tuple that, together with the entity, identifies a combination.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub subject_type: String,
    pub transfer_location: String,
    pub recipient_type: String,
    pub purpose: String,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {} / {}",
            self.subject_type, self.transfer_location, self.recipient_type, self.purpose
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_wire_names() {
        let json = serde_json::to_string(&ReaffirmationAction::ReaffirmedWithChanges).unwrap();
        assert_eq!(json, "\"REAFFIRMED_WITH_CHANGES\"");
        let parsed: ReaffirmationAction = serde_json::from_str("\"REAFFIRMED_AS_IS\"").unwrap();
        assert_eq!(parsed, ReaffirmationAction::ReaffirmedAsIs);
    }

    #[test]
    fn action_parses_short_forms() {
        assert_eq!("as-is".parse(), Ok(ReaffirmationAction::ReaffirmedAsIs));
        assert_eq!(
            "with_changes".parse(),
            Ok(ReaffirmationAction::ReaffirmedWithChanges)
        );
        assert!("skip".parse::<ReaffirmationAction>().is_err());
    }

    #[test]
    fn requirement_ref_is_camel_case() {
        let r = RequirementRef {
            title: "Retention".into(),
            text: "Keep records".into(),
            version_number: 2,
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["versionNumber"], 2);
    }
}
