use std::sync::Arc;

use tracing::{debug, info};

use reaf_diff::{diff_with, DiffLine, DiffStrategy};
use reaf_engine::{
    BulkOperationProgress, BulkReaffirmationEngine, BulkReaffirmationRequest, OperationStatus,
    ProgressStream,
};
use reaf_store::{ComplianceRepository, EntityFilters, EntitySummary};
use reaf_tree::{ExpandOutcome, TreeModel, TriState};
use reaf_types::{
    CombinationId, EntityId, NewRequirement, OperationId, ReaffirmationAction, VersionId,
};

use crate::config::TrackerConfig;
use crate::error::{SdkError, SdkResult};

/// Review-and-reaffirm session over one repository.
///
/// Owns the tree, the active filters and a single batch engine. Batches run
/// in the background; the tracker stays usable while one is in flight.
pub struct Tracker {
    repository: Arc<dyn ComplianceRepository>,
    engine: BulkReaffirmationEngine,
    tree: TreeModel,
    filters: EntityFilters,
    summary: EntitySummary,
    actor: Option<String>,
    /// Ids of the last submitted batch, in processing order.
    submitted: Option<(OperationId, Vec<CombinationId>)>,
    config: TrackerConfig,
}

impl Tracker {
    pub fn new(repository: Arc<dyn ComplianceRepository>, config: TrackerConfig) -> Self {
        let engine = BulkReaffirmationEngine::new(Arc::clone(&repository), config.engine.clone());
        Self {
            repository,
            engine,
            tree: TreeModel::with_due_soon_window(config.due_soon_window()),
            filters: EntityFilters::default(),
            summary: EntitySummary::default(),
            actor: None,
            submitted: None,
            config,
        }
    }

    /// Record `actor` as the reaffirming user on every submitted batch.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn tree(&self) -> &TreeModel {
        &self.tree
    }

    pub fn filters(&self) -> &EntityFilters {
        &self.filters
    }

    /// Totals from the last entity listing.
    pub fn summary(&self) -> &EntitySummary {
        &self.summary
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn engine(&self) -> &BulkReaffirmationEngine {
        &self.engine
    }

    // ---- Loading ----

    /// Re-list entities under `filters` and reload every entity whose
    /// children were loaded.
    ///
    /// Reloads cover at least as many combinations as were loaded before,
    /// so selection survives for combinations that come back.
    pub async fn refresh(&mut self, filters: EntityFilters) -> SdkResult<()> {
        let listing = self.repository.get_entities(&filters).await?;
        let reload: Vec<(EntityId, usize)> = self
            .tree
            .loaded_entities()
            .into_iter()
            .map(|id| {
                let loaded = self.loaded_count(&id);
                (id, loaded)
            })
            .collect();

        self.filters = filters;
        self.summary = listing.summary.clone();
        self.tree.replace_entities(&listing);

        let mut reloaded = 0usize;
        for (id, loaded) in reload {
            if self.tree.entity(&id).is_err() {
                continue;
            }
            let limit = loaded.max(self.config.effective_page_size());
            self.fetch_page(&id, 0, limit).await?;
            reloaded += 1;
        }
        self.tree.retain_existing_selection();

        info!(
            entities = listing.entities.len(),
            reloaded,
            "tracker refreshed"
        );
        Ok(())
    }

    /// Expand or collapse an entity, fetching its first page when needed.
    pub async fn expand_entity(&mut self, id: &EntityId) -> SdkResult<ExpandOutcome> {
        let outcome = self.tree.toggle_entity(id)?;
        if let ExpandOutcome::FetchRequired { entity, offset } = &outcome {
            let limit = self.config.effective_page_size();
            self.fetch_page(entity, *offset, limit).await?;
        }
        Ok(outcome)
    }

    /// Fetch the next page of an entity. Returns `false` when nothing was
    /// fetched.
    pub async fn load_more(&mut self, id: &EntityId) -> SdkResult<bool> {
        let Some(offset) = self.tree.begin_load_more(id)? else {
            return Ok(false);
        };
        let limit = self.config.effective_page_size();
        self.fetch_page(id, offset, limit).await?;
        Ok(true)
    }

    /// Expand every listed entity and page through all of its combinations.
    pub async fn load_all(&mut self) -> SdkResult<()> {
        let ids: Vec<EntityId> = self.tree.entities().map(|e| e.id.clone()).collect();
        for id in &ids {
            let loaded = self.tree.entity(id)?.is_loaded();
            if !loaded {
                self.expand_entity(id).await?;
            }
            while self.load_more(id).await? {}
        }
        Ok(())
    }

    pub fn toggle_version(&mut self, id: &VersionId) -> SdkResult<bool> {
        Ok(self.tree.toggle_version(id)?)
    }

    async fn fetch_page(&mut self, id: &EntityId, offset: usize, limit: usize) -> SdkResult<()> {
        let fetched = self
            .repository
            .get_entity_combinations(id, offset, limit, &self.filters)
            .await;
        match fetched {
            Ok(page) => {
                debug!(entity = %id, offset, returned = page.combinations.len(), "page fetched");
                self.tree.apply_entity_page(id, offset, page)?;
                Ok(())
            }
            Err(err) => {
                self.tree.fail_entity_fetch(id)?;
                Err(err.into())
            }
        }
    }

    fn loaded_count(&self, id: &EntityId) -> usize {
        self.tree
            .versions_of(id)
            .map(|versions| versions.iter().map(|v| v.combination_ids.len()).sum())
            .unwrap_or(0)
    }

    // ---- Selection ----

    pub fn select_combination(&mut self, id: &CombinationId) -> SdkResult<bool> {
        Ok(self.tree.select_combination(id)?)
    }

    pub fn select_version(&mut self, id: &VersionId, select_all: bool) -> SdkResult<()> {
        Ok(self.tree.select_version(id, select_all)?)
    }

    pub fn select_entity(&mut self, id: &EntityId, select_all: bool) -> SdkResult<()> {
        Ok(self.tree.select_entity(id, select_all)?)
    }

    pub fn clear_selection(&mut self) {
        self.tree.clear_selection();
    }

    pub fn version_selection(&self, id: &VersionId) -> SdkResult<TriState> {
        Ok(self.tree.version_selection_state(id)?)
    }

    pub fn entity_selection(&self, id: &EntityId) -> SdkResult<TriState> {
        Ok(self.tree.entity_selection_state(id)?)
    }

    /// Selected combination ids in tree order.
    pub fn selected_ids(&self) -> Vec<CombinationId> {
        self.tree.selected_combination_ids()
    }

    // ---- Bulk runs ----

    /// Start a batch over the current selection.
    pub fn submit_selected(
        &mut self,
        action: ReaffirmationAction,
        comment: impl Into<String>,
        new_requirements: Vec<NewRequirement>,
    ) -> SdkResult<ProgressStream> {
        let ids = self.selected_ids();
        if ids.is_empty() {
            return Err(SdkError::EmptySelection);
        }
        let request = match action {
            ReaffirmationAction::ReaffirmedAsIs => BulkReaffirmationRequest::as_is(ids, comment),
            ReaffirmationAction::ReaffirmedWithChanges => {
                BulkReaffirmationRequest::with_changes(ids, comment, new_requirements)
            }
        };
        self.submit(request)
    }

    /// Start a batch for an explicit request under a fresh operation id.
    ///
    /// The tracker's actor fills in a request that names none.
    pub fn submit(&mut self, mut request: BulkReaffirmationRequest) -> SdkResult<ProgressStream> {
        if request.actor.is_none() {
            request.actor = self.actor.clone();
        }
        let operation_id = OperationId::generate();
        let ids = request.combination_ids.clone();
        let stream = self.engine.start(operation_id.clone(), request)?;
        self.submitted = Some((operation_id, ids));
        Ok(stream)
    }

    /// Cancel the batch in flight, if any.
    pub fn cancel(&self) -> Option<OperationId> {
        self.engine.cancel()
    }

    /// Apply the outcome of a finished batch.
    ///
    /// Refreshes the tree under the current filters, then leaves exactly
    /// the combinations that still need a decision selected: the failed
    /// ones, plus every unprocessed one when the batch itself FAILED.
    pub async fn finish_run(&mut self, progress: &BulkOperationProgress) -> SdkResult<()> {
        if !progress.is_terminal() {
            return Err(SdkError::InvalidOperation(format!(
                "operation {} is still running",
                progress.operation_id
            )));
        }
        let mut retry = progress.failed_ids.clone();
        if progress.status == OperationStatus::Failed {
            match self.submitted.take() {
                Some((id, ids)) if id == progress.operation_id => {
                    // Items run in order, so the unprocessed ones are the tail.
                    retry.extend(ids.into_iter().skip(progress.processed_items));
                }
                other => self.submitted = other,
            }
        }

        let filters = self.filters.clone();
        self.refresh(filters).await?;
        self.tree.select_only(retry.iter());
        info!(
            operation = %progress.operation_id,
            status = %progress.status,
            failed = progress.failed_items,
            reselected = retry.len(),
            "bulk run applied"
        );
        Ok(())
    }

    // ---- Diff ----

    /// Diff a combination's current requirement text against `proposed`.
    pub fn diff_requirement(&self, id: &CombinationId, proposed: &str) -> SdkResult<Vec<DiffLine>> {
        self.diff_requirement_with(DiffStrategy::default(), id, proposed)
    }

    pub fn diff_requirement_with(
        &self,
        strategy: DiffStrategy,
        id: &CombinationId,
        proposed: &str,
    ) -> SdkResult<Vec<DiffLine>> {
        let record = self.tree.combination(id)?;
        Ok(diff_with(strategy, &record.requirement.text, proposed))
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("entities", &self.tree.entities().count())
            .field("loaded_combinations", &self.tree.loaded_combination_count())
            .field("selected", &self.tree.selected_count())
            .field("engine", &self.engine)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use reaf_diff::DiffKind;
    use reaf_store::{CombinationRecord, InMemoryRepository};
    use reaf_types::{Classification, RequirementRef, ReaffirmationStatus};

    fn record(id: &str, entity: &str, due_in_days: i64) -> CombinationRecord {
        CombinationRecord {
            id: id.into(),
            entity_id: entity.into(),
            entity_name: entity.to_uppercase(),
            version_id: format!("{entity}-v1").into(),
            classification: Classification {
                subject_type: "Customer".into(),
                transfer_location: "US".into(),
                recipient_type: "Processor".into(),
                purpose: "Support".into(),
            },
            requirement: RequirementRef {
                title: "Encryption".into(),
                text: "Encrypt at rest\nEncrypt in transit".into(),
                version_number: 1,
            },
            due_date: Utc::now() + Duration::days(due_in_days),
            last_reaffirmed_at: None,
            last_reaffirmed_by: None,
        }
    }

    fn repository() -> Arc<InMemoryRepository> {
        let repo = InMemoryRepository::default();
        repo.add_entity("acme", "Acme");
        repo.add_entity("globex", "Globex");
        for (n, due) in [(1, -5), (2, 10), (3, 90)] {
            repo.insert_combination(record(&format!("a{n}"), "acme", due))
                .unwrap();
        }
        repo.insert_combination(record("g1", "globex", 200)).unwrap();
        Arc::new(repo)
    }

    fn config(page_size: usize) -> TrackerConfig {
        TrackerConfig {
            page_size,
            engine: reaf_engine::EngineConfig::unpaced(),
            ..Default::default()
        }
    }

    async fn tracker(page_size: usize) -> (Arc<InMemoryRepository>, Tracker) {
        let repo = repository();
        let mut tracker = Tracker::new(repo.clone(), config(page_size));
        tracker.refresh(EntityFilters::default()).await.unwrap();
        (repo, tracker)
    }

    #[tokio::test]
    async fn refresh_lists_entities_without_children() {
        let (_, tracker) = tracker(50).await;
        assert_eq!(tracker.tree().entities().count(), 2);
        assert_eq!(tracker.tree().loaded_combination_count(), 0);
        assert_eq!(tracker.summary().total_combinations, 4);
    }

    #[tokio::test]
    async fn expand_fetches_first_page_once() {
        let (_, mut tracker) = tracker(2).await;
        let acme: EntityId = "acme".into();

        let outcome = tracker.expand_entity(&acme).await.unwrap();
        assert!(matches!(outcome, ExpandOutcome::FetchRequired { offset: 0, .. }));
        assert_eq!(tracker.tree().loaded_combination_count(), 2);
        assert!(tracker.tree().entity(&acme).unwrap().has_more());

        // collapse then expand again: no refetch
        assert_eq!(tracker.expand_entity(&acme).await.unwrap(), ExpandOutcome::Hidden);
        assert_eq!(tracker.expand_entity(&acme).await.unwrap(), ExpandOutcome::Shown);

        assert!(tracker.load_more(&acme).await.unwrap());
        assert_eq!(tracker.tree().loaded_combination_count(), 3);
        assert!(!tracker.load_more(&acme).await.unwrap());
    }

    #[tokio::test]
    async fn empty_selection_is_rejected() {
        let (_, mut tracker) = tracker(50).await;
        let err = tracker
            .submit_selected(ReaffirmationAction::ReaffirmedAsIs, "ok", Vec::new())
            .unwrap_err();
        assert!(matches!(err, SdkError::EmptySelection));
    }

    #[tokio::test]
    async fn bulk_run_updates_tree_and_keeps_failures_selected() {
        let (repo, mut tracker) = tracker(50).await;
        tracker.load_all().await.unwrap();
        repo.fail_on("a2", "locked by another reviewer");

        tracker.select_entity(&"acme".into(), true).unwrap();
        assert_eq!(tracker.selected_ids().len(), 3);

        let progress = tracker
            .submit_selected(ReaffirmationAction::ReaffirmedAsIs, "annual", Vec::new())
            .unwrap()
            .wait()
            .await
            .unwrap();
        assert_eq!(progress.status, OperationStatus::Completed);
        assert_eq!(progress.completed_items, 2);
        assert_eq!(progress.failed_items, 1);

        tracker.finish_run(&progress).await.unwrap();
        assert_eq!(tracker.selected_ids(), vec![CombinationId::from("a2")]);

        let now = Utc::now();
        assert_eq!(
            tracker.tree().combination_status(&"a1".into(), now).unwrap(),
            ReaffirmationStatus::Current
        );
        assert_eq!(
            tracker.tree().entity_selection_state(&"acme".into()).unwrap(),
            TriState::Partial
        );
    }

    #[tokio::test]
    async fn actor_is_recorded_on_reaffirmed_combinations() {
        let repo = repository();
        let mut tracker = Tracker::new(repo.clone(), config(50)).with_actor("dana");
        tracker.refresh(EntityFilters::default()).await.unwrap();
        tracker.load_all().await.unwrap();
        tracker.select_combination(&"g1".into()).unwrap();

        tracker
            .submit_selected(ReaffirmationAction::ReaffirmedAsIs, "ok", Vec::new())
            .unwrap()
            .wait()
            .await
            .unwrap();
        let g1 = repo.combination(&"g1".into()).unwrap();
        assert_eq!(g1.last_reaffirmed_by.as_deref(), Some("dana"));
    }

    #[tokio::test]
    async fn rejected_batch_keeps_whole_selection() {
        let (repo, mut tracker) = tracker(50).await;
        tracker.load_all().await.unwrap();
        tracker.select_entity(&"acme".into(), true).unwrap();
        let selected = tracker.selected_ids();
        assert_eq!(selected.len(), 3);

        let progress = tracker
            .submit_selected(ReaffirmationAction::ReaffirmedWithChanges, "oops", Vec::new())
            .unwrap()
            .wait()
            .await
            .unwrap();
        assert_eq!(progress.status, OperationStatus::Failed);
        assert_eq!(progress.processed_items, 0);

        tracker.finish_run(&progress).await.unwrap();
        assert_eq!(tracker.selected_ids(), selected);
        assert_eq!(repo.reaffirm_calls(), 0);
    }

    #[tokio::test]
    async fn finish_run_requires_terminal_progress() {
        let (_, mut tracker) = tracker(50).await;
        let running = BulkOperationProgress::start("op".into(), 1);
        assert!(matches!(
            tracker.finish_run(&running).await,
            Err(SdkError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn refresh_keeps_loaded_pages_and_selection() {
        let (_, mut tracker) = tracker(2).await;
        let acme: EntityId = "acme".into();
        tracker.expand_entity(&acme).await.unwrap();
        tracker.load_more(&acme).await.unwrap();
        tracker.select_combination(&"a3".into()).unwrap();

        tracker.refresh(EntityFilters::default()).await.unwrap();
        assert_eq!(tracker.tree().loaded_combination_count(), 3);
        assert_eq!(tracker.selected_ids(), vec![CombinationId::from("a3")]);
    }

    #[tokio::test]
    async fn diff_against_current_requirement() {
        let (_, mut tracker) = tracker(50).await;
        tracker.load_all().await.unwrap();
        let lines = tracker
            .diff_requirement(&"g1".into(), "Encrypt at rest\nEncrypt everywhere")
            .unwrap();
        let kinds: Vec<DiffKind> = lines.iter().map(|l| l.kind).collect();
        assert_eq!(kinds, vec![DiffKind::Unchanged, DiffKind::Removed, DiffKind::Added]);

        assert!(matches!(
            tracker.diff_requirement(&"missing".into(), "x"),
            Err(SdkError::Tree(_))
        ));
    }
}
