use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use reaf_engine::EngineConfig;
use reaf_store::RepositoryConfig;
use reaf_types::DEFAULT_DUE_SOON_DAYS;

use crate::error::SdkResult;

/// Settings for a [`crate::Tracker`] and the repository it drives.
///
/// Every key is optional in TOML; missing keys take their defaults.
///
/// ```toml
/// page_size = 100
/// due_soon_days = 14
///
/// [engine]
/// pacing_delay_ms = 0
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub engine: EngineConfig,
    /// Page length for combination fetches.
    pub page_size: usize,
    pub due_soon_days: i64,
    /// Due-date reset applied on reaffirmation.
    pub reaffirmation_interval_days: i64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            page_size: 50,
            due_soon_days: DEFAULT_DUE_SOON_DAYS,
            reaffirmation_interval_days: 365,
        }
    }
}

impl TrackerConfig {
    pub fn from_toml_str(source: &str) -> SdkResult<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> SdkResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn due_soon_window(&self) -> Duration {
        Duration::days(self.due_soon_days)
    }

    /// Page length, never zero.
    pub fn effective_page_size(&self) -> usize {
        self.page_size.max(1)
    }

    /// Settings for an [`reaf_store::InMemoryRepository`] matching this
    /// tracker.
    pub fn repository_config(&self) -> RepositoryConfig {
        RepositoryConfig {
            due_soon_days: self.due_soon_days,
            reaffirmation_interval_days: self.reaffirmation_interval_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let c = TrackerConfig::default();
        assert_eq!(c.page_size, 50);
        assert_eq!(c.due_soon_days, 30);
        assert_eq!(c.reaffirmation_interval_days, 365);
        assert_eq!(c.engine.pacing_delay_ms, 10);
    }

    #[test]
    fn partial_toml() {
        let c = TrackerConfig::from_toml_str(
            "page_size = 5\n\n[engine]\npacing_delay_ms = 0\n",
        )
        .unwrap();
        assert_eq!(c.page_size, 5);
        assert_eq!(c.engine.pacing_delay_ms, 0);
        assert_eq!(c.engine.channel_capacity, 1024);
        assert_eq!(c.due_soon_days, 30);
    }

    #[test]
    fn rejects_bad_types() {
        assert!(TrackerConfig::from_toml_str("page_size = \"many\"").is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "due_soon_days = 7").unwrap();
        let c = TrackerConfig::load(file.path()).unwrap();
        assert_eq!(c.due_soon_days, 7);
        assert_eq!(c.repository_config().due_soon_days, 7);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TrackerConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, crate::SdkError::Io(_)));
    }
}
