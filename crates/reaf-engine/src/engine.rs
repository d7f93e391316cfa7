use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use reaf_store::ComplianceRepository;
use reaf_types::OperationId;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::message::ProgressMessage;
use crate::progress::BulkOperationProgress;
use crate::request::BulkReaffirmationRequest;

/// Runs bulk reaffirmations in the background, one batch at a time.
///
/// Each run processes its ids strictly in order with at most one
/// repository call in flight. A failing item is recorded in the progress
/// and the batch moves on. Cancelling a run stops it silently: the
/// [`ProgressStream`] ends without a terminal message.
pub struct BulkReaffirmationEngine {
    repository: Arc<dyn ComplianceRepository>,
    config: EngineConfig,
    active: Mutex<Option<ActiveRun>>,
}

struct ActiveRun {
    operation_id: OperationId,
    cancelled: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ActiveRun {
    fn is_live(&self) -> bool {
        !self.finished.load(Ordering::SeqCst) && !self.handle.is_finished()
    }

    fn stop(self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.handle.abort();
    }
}

impl BulkReaffirmationEngine {
    pub fn new(repository: Arc<dyn ComplianceRepository>, config: EngineConfig) -> Self {
        Self {
            repository,
            config,
            active: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a batch on the current tokio runtime.
    ///
    /// Fails with [`EngineError::Busy`] while another run is in flight; the
    /// running batch is left untouched and nothing is queued. Invalid
    /// requests are accepted here and reported as an `ERROR` message.
    pub fn start(
        &self,
        operation_id: OperationId,
        request: BulkReaffirmationRequest,
    ) -> EngineResult<ProgressStream> {
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;

        let mut active = self.active.lock().expect("lock poisoned");
        if let Some(run) = active.as_ref().filter(|run| run.is_live()) {
            return Err(EngineError::Busy {
                running: run.operation_id.clone(),
            });
        }

        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let cancelled = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));

        info!(
            operation = %operation_id,
            items = request.len(),
            action = %request.action,
            "bulk reaffirmation started"
        );

        let worker = BatchWorker {
            operation_id: operation_id.clone(),
            request,
            repository: Arc::clone(&self.repository),
            config: self.config.clone(),
            tx,
            cancelled: Arc::clone(&cancelled),
            finished: Arc::clone(&finished),
        };
        let handle = runtime.spawn(worker.run());

        *active = Some(ActiveRun {
            operation_id: operation_id.clone(),
            cancelled: Arc::clone(&cancelled),
            finished,
            handle,
        });

        Ok(ProgressStream {
            operation_id,
            rx,
            cancelled,
        })
    }

    /// Cancel the run in flight. Returns the cancelled run's id.
    ///
    /// A run that has already finished is left alone, so its terminal
    /// message is still delivered.
    pub fn cancel(&self) -> Option<OperationId> {
        let mut active = self.active.lock().expect("lock poisoned");
        let run = active.take().filter(ActiveRun::is_live)?;
        let id = run.operation_id.clone();
        run.stop();
        info!(operation = %id, "bulk reaffirmation cancelled");
        Some(id)
    }

    /// Cancel the run with this id if it is still in flight. Other ids are
    /// ignored.
    pub fn cancel_operation(&self, operation_id: &OperationId) -> bool {
        let mut active = self.active.lock().expect("lock poisoned");
        match active.take() {
            Some(run) if &run.operation_id == operation_id && run.is_live() => {
                run.stop();
                info!(operation = %operation_id, "bulk reaffirmation cancelled");
                true
            }
            other => {
                *active = other;
                debug!(operation = %operation_id, "cancel for idle operation ignored");
                false
            }
        }
    }

    /// Returns `true` while a run is in flight.
    pub fn is_running(&self) -> bool {
        self.active
            .lock()
            .expect("lock poisoned")
            .as_ref()
            .is_some_and(ActiveRun::is_live)
    }

    /// Id of the run in flight, if any.
    pub fn running_operation(&self) -> Option<OperationId> {
        self.active
            .lock()
            .expect("lock poisoned")
            .as_ref()
            .filter(|run| run.is_live())
            .map(|run| run.operation_id.clone())
    }
}

impl Drop for BulkReaffirmationEngine {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(run) = active.take() {
                run.stop();
            }
        }
    }
}

impl std::fmt::Debug for BulkReaffirmationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkReaffirmationEngine")
            .field("config", &self.config)
            .field("running", &self.running_operation())
            .finish()
    }
}

/// The background side of one run.
struct BatchWorker {
    operation_id: OperationId,
    request: BulkReaffirmationRequest,
    repository: Arc<dyn ComplianceRepository>,
    config: EngineConfig,
    tx: mpsc::Sender<ProgressMessage>,
    cancelled: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl BatchWorker {
    async fn run(self) {
        let total = self.request.len();
        let mut progress = BulkOperationProgress::start(self.operation_id.clone(), total);
        self.emit(ProgressMessage::ProgressUpdate {
            data: progress.clone(),
        })
        .await;

        if let Err(err) = self.request.validate() {
            warn!(operation = %self.operation_id, error = %err, "bulk request rejected");
            progress.fail(format!("invalid request: {err}"));
            self.finished.store(true, Ordering::SeqCst);
            self.emit(ProgressMessage::Error { data: progress }).await;
            return;
        }

        let command = self.request.to_command();
        let pacing = self.config.pacing_delay();

        for (index, id) in self.request.combination_ids.iter().enumerate() {
            if self.is_cancelled() {
                return;
            }

            match self.repository.reaffirm(id, &command).await {
                Ok(()) => {
                    debug!(operation = %self.operation_id, combination = %id, "item reaffirmed");
                    progress.record_success();
                }
                Err(err) => {
                    warn!(
                        operation = %self.operation_id,
                        combination = %id,
                        error = %err,
                        "item failed"
                    );
                    progress.record_failure(id, &err.to_string());
                }
            }

            self.emit(ProgressMessage::ProgressUpdate {
                data: progress.clone(),
            })
            .await;

            if !pacing.is_zero() && index + 1 < total {
                tokio::time::sleep(pacing).await;
            }
        }

        if self.is_cancelled() {
            return;
        }

        progress.complete();
        self.finished.store(true, Ordering::SeqCst);
        info!(
            operation = %self.operation_id,
            completed = progress.completed_items,
            failed = progress.failed_items,
            "bulk reaffirmation completed"
        );
        self.emit(ProgressMessage::Completion { data: progress }).await;
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn emit(&self, message: ProgressMessage) {
        if self.is_cancelled() {
            return;
        }
        // A dropped receiver does not stop the batch.
        let _ = self.tx.send(message).await;
    }
}

/// Receiving side of one run's progress.
///
/// Yields `PROGRESS_UPDATE` messages followed by exactly one terminal
/// message. After cancellation it yields nothing more, including messages
/// already buffered.
#[derive(Debug)]
pub struct ProgressStream {
    operation_id: OperationId,
    rx: mpsc::Receiver<ProgressMessage>,
    cancelled: Arc<AtomicBool>,
}

impl ProgressStream {
    pub fn operation_id(&self) -> &OperationId {
        &self.operation_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Next message, or `None` once the run has ended or was cancelled.
    pub async fn recv(&mut self) -> Option<ProgressMessage> {
        if self.is_cancelled() {
            return None;
        }
        let message = self.rx.recv().await?;
        if self.is_cancelled() {
            return None;
        }
        Some(message)
    }

    /// Drain every remaining message.
    pub async fn collect(mut self) -> Vec<ProgressMessage> {
        let mut messages = Vec::new();
        while let Some(message) = self.recv().await {
            messages.push(message);
        }
        messages
    }

    /// Wait for the run to end and return its last snapshot.
    pub async fn wait(mut self) -> Option<BulkOperationProgress> {
        let mut last = None;
        while let Some(message) = self.recv().await {
            last = Some(message.into_data());
        }
        last
    }
}
