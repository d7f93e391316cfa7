use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use reaf_types::{CombinationId, EntityId, ReaffirmationStatus, RequirementRef, VersionId};

use crate::error::{StoreError, StoreResult};
use crate::filters::EntityFilters;
use crate::records::{
    CombinationPage, CombinationRecord, EntityListing, EntityRecord, ReaffirmCommand,
};
use crate::traits::ComplianceRepository;

/// Actor recorded when a command does not name one.
const DEFAULT_ACTOR: &str = "system";

/// Date arithmetic used by the in-memory backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Width of the DUE_SOON window in days.
    pub due_soon_days: i64,
    /// How far a reaffirmation pushes the due date out, in days.
    pub reaffirmation_interval_days: i64,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            due_soon_days: reaf_types::DEFAULT_DUE_SOON_DAYS,
            reaffirmation_interval_days: 365,
        }
    }
}

impl RepositoryConfig {
    pub fn due_soon_window(&self) -> Duration {
        Duration::days(self.due_soon_days)
    }

    pub fn reaffirmation_interval(&self) -> Duration {
        Duration::days(self.reaffirmation_interval_days)
    }
}

/// Entity row in a seed file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedEntity {
    pub id: EntityId,
    pub name: String,
}

/// Initial contents of an [`InMemoryRepository`], usually read from JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySeed {
    pub entities: Vec<SeedEntity>,
    #[serde(default)]
    pub combinations: Vec<CombinationRecord>,
}

/// In-memory repository.
///
/// Intended for tests, demos and the CLI. Entities and combinations are kept
/// in insertion order, which is the order pages are served in. Failures can
/// be injected per combination and every call can be slowed down to exercise
/// cancellation.
pub struct InMemoryRepository {
    entities: RwLock<Vec<SeedEntity>>,
    combinations: RwLock<Vec<CombinationRecord>>,
    failures: RwLock<HashMap<CombinationId, String>>,
    latency: Option<std::time::Duration>,
    config: RepositoryConfig,
    reaffirm_calls: AtomicUsize,
}

impl InMemoryRepository {
    /// Create an empty repository.
    pub fn new(config: RepositoryConfig) -> Self {
        Self {
            entities: RwLock::new(Vec::new()),
            combinations: RwLock::new(Vec::new()),
            failures: RwLock::new(HashMap::new()),
            latency: None,
            config,
            reaffirm_calls: AtomicUsize::new(0),
        }
    }

    /// Build a repository from seed data.
    ///
    /// Every combination must reference a seeded entity.
    pub fn from_seed(seed: RepositorySeed, config: RepositoryConfig) -> StoreResult<Self> {
        let repo = Self::new(config);
        for entity in seed.entities {
            repo.add_entity(entity.id, entity.name);
        }
        for record in seed.combinations {
            repo.insert_combination(record)?;
        }
        Ok(repo)
    }

    /// Parse a JSON [`RepositorySeed`] and build a repository from it.
    pub fn from_json(json: &str, config: RepositoryConfig) -> StoreResult<Self> {
        let seed: RepositorySeed = serde_json::from_str(json)?;
        Self::from_seed(seed, config)
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Register an entity. Re-registering an id renames it.
    pub fn add_entity(&self, id: impl Into<EntityId>, name: impl Into<String>) {
        let id = id.into();
        let name = name.into();
        let mut entities = self.entities.write().expect("lock poisoned");
        match entities.iter_mut().find(|e| e.id == id) {
            Some(existing) => existing.name = name,
            None => entities.push(SeedEntity { id, name }),
        }
    }

    /// Insert or replace a combination.
    pub fn insert_combination(&self, record: CombinationRecord) -> StoreResult<()> {
        let known = self
            .entities
            .read()
            .expect("lock poisoned")
            .iter()
            .any(|e| e.id == record.entity_id);
        if !known {
            return Err(StoreError::EntityNotFound(record.entity_id));
        }
        let mut combinations = self.combinations.write().expect("lock poisoned");
        match combinations.iter_mut().find(|c| c.id == record.id) {
            Some(existing) => *existing = record,
            None => combinations.push(record),
        }
        Ok(())
    }

    /// Make every future `reaffirm` of `id` fail with `message`.
    pub fn fail_on(&self, id: impl Into<CombinationId>, message: impl Into<String>) {
        self.failures
            .write()
            .expect("lock poisoned")
            .insert(id.into(), message.into());
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.failures.write().expect("lock poisoned").clear();
    }

    /// Current state of one combination.
    pub fn combination(&self, id: &CombinationId) -> Option<CombinationRecord> {
        self.combinations
            .read()
            .expect("lock poisoned")
            .iter()
            .find(|c| &c.id == id)
            .cloned()
    }

    /// Number of combinations held.
    pub fn len(&self) -> usize {
        self.combinations.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no combination is held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `reaffirm` calls received, successful or not.
    pub fn reaffirm_calls(&self) -> usize {
        self.reaffirm_calls.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn apply_reaffirmation(
        &self,
        id: &CombinationId,
        command: &ReaffirmCommand,
    ) -> StoreResult<()> {
        let now = Utc::now();
        let due_date = now + self.config.reaffirmation_interval();
        let actor = command
            .actor
            .clone()
            .unwrap_or_else(|| DEFAULT_ACTOR.to_string());

        let changes = if command.action.has_changes() {
            Some(
                command
                    .new_requirements
                    .split_first()
                    .ok_or(StoreError::MissingRequirements)?,
            )
        } else {
            None
        };

        let mut combinations = self.combinations.write().expect("lock poisoned");
        let index = combinations
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| StoreError::CombinationNotFound(id.clone()))?;

        let record = &mut combinations[index];
        record.due_date = due_date;
        record.last_reaffirmed_at = Some(now);
        record.last_reaffirmed_by = Some(actor);

        let Some((first, rest)) = changes else {
            return Ok(());
        };
        let next = record.requirement.version_number + 1;
        record.version_id = VersionId::from(format!("{}-v{}", record.entity_id, next));
        record.requirement = RequirementRef {
            title: first.title.clone(),
            text: first.text.clone(),
            version_number: next,
        };

        // Further requirements become siblings under the new version.
        let template = record.clone();
        for (n, requirement) in rest.iter().enumerate() {
            let mut sibling = template.clone();
            sibling.id = CombinationId::from(format!("{}-v{}-{}", template.id, next, n + 1));
            sibling.requirement = RequirementRef {
                title: requirement.title.clone(),
                text: requirement.text.clone(),
                version_number: next,
            };
            match combinations.iter_mut().find(|c| c.id == sibling.id) {
                Some(existing) => *existing = sibling,
                None => combinations.push(sibling),
            }
        }
        Ok(())
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new(RepositoryConfig::default())
    }
}

#[async_trait]
impl ComplianceRepository for InMemoryRepository {
    async fn reaffirm(&self, id: &CombinationId, command: &ReaffirmCommand) -> StoreResult<()> {
        self.simulate_latency().await;
        self.reaffirm_calls.fetch_add(1, Ordering::SeqCst);

        let injected = self
            .failures
            .read()
            .expect("lock poisoned")
            .get(id)
            .cloned();
        if let Some(message) = injected {
            return Err(StoreError::Rejected {
                id: id.clone(),
                message,
            });
        }

        self.apply_reaffirmation(id, command)?;
        debug!(combination = %id, action = %command.action, "combination reaffirmed");
        Ok(())
    }

    async fn get_entities(&self, filters: &EntityFilters) -> StoreResult<EntityListing> {
        self.simulate_latency().await;
        let now = Utc::now();
        let window = self.config.due_soon_window();

        let entities = self.entities.read().expect("lock poisoned");
        let combinations = self.combinations.read().expect("lock poisoned");

        let mut listing = EntityListing::default();
        for entity in entities.iter() {
            let mut record = EntityRecord {
                id: entity.id.clone(),
                name: entity.name.clone(),
                total: 0,
                due: 0,
                overdue: 0,
            };
            for combination in combinations
                .iter()
                .filter(|c| c.entity_id == entity.id && filters.matches(c, now, window))
            {
                record.total += 1;
                match combination.status(now, window) {
                    ReaffirmationStatus::DueSoon => record.due += 1,
                    ReaffirmationStatus::Overdue => record.overdue += 1,
                    ReaffirmationStatus::Current => {}
                }
            }
            // A filtered listing only shows entities with something to act on.
            if record.total == 0 && !filters.is_empty() {
                continue;
            }
            listing.summary.total_combinations += record.total;
            listing.summary.due += record.due;
            listing.summary.overdue += record.overdue;
            listing.entities.push(record);
        }
        listing.summary.total_entities = listing.entities.len();
        Ok(listing)
    }

    async fn get_entity_combinations(
        &self,
        entity: &EntityId,
        offset: usize,
        limit: usize,
        filters: &EntityFilters,
    ) -> StoreResult<CombinationPage> {
        self.simulate_latency().await;
        if limit == 0 {
            return Err(StoreError::InvalidRequest("limit must be positive".into()));
        }
        let known = self
            .entities
            .read()
            .expect("lock poisoned")
            .iter()
            .any(|e| &e.id == entity);
        if !known {
            return Err(StoreError::EntityNotFound(entity.clone()));
        }

        let now = Utc::now();
        let window = self.config.due_soon_window();
        let combinations = self.combinations.read().expect("lock poisoned");
        let matching: Vec<&CombinationRecord> = combinations
            .iter()
            .filter(|c| &c.entity_id == entity && filters.matches(c, now, window))
            .collect();

        let total = matching.len();
        let page: Vec<CombinationRecord> = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        let end = offset.saturating_add(page.len());
        let has_more = end < total;

        Ok(CombinationPage {
            combinations: page,
            total,
            has_more,
            next_offset: has_more.then_some(end),
        })
    }
}

impl std::fmt::Debug for InMemoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRepository")
            .field("combination_count", &self.len())
            .field("latency", &self.latency)
            .finish()
    }
}
