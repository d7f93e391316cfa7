use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::{BulkReaffirmationEngine, ProgressStream};
use crate::error::{EngineError, EngineResult};
use crate::hub::{ProgressFilter, ProgressHub, ProgressSubscription};
use crate::message::{ControlMessage, ProgressMessage};

/// Message-driven front end for a [`BulkReaffirmationEngine`].
///
/// Accepts [`ControlMessage`]s on a channel and publishes every progress
/// message of every run to a [`ProgressHub`].
pub struct BulkController;

impl BulkController {
    /// Spawn the dispatcher on the current runtime.
    pub fn spawn(engine: Arc<BulkReaffirmationEngine>, hub_capacity: usize) -> ControllerHandle {
        let (commands, rx) = mpsc::channel(64);
        let hub = Arc::new(ProgressHub::new(hub_capacity));
        let dispatcher = Dispatcher {
            engine,
            hub: Arc::clone(&hub),
            commands: rx,
            current: None,
        };
        let task = tokio::spawn(dispatcher.run());
        ControllerHandle {
            commands,
            hub,
            task,
        }
    }
}

/// Handle to a running controller.
pub struct ControllerHandle {
    commands: mpsc::Sender<ControlMessage>,
    hub: Arc<ProgressHub>,
    task: JoinHandle<()>,
}

impl ControllerHandle {
    pub async fn send(&self, message: ControlMessage) -> EngineResult<()> {
        self.commands
            .send(message)
            .await
            .map_err(|_| EngineError::ControllerClosed)
    }

    pub fn subscribe(&self, filter: ProgressFilter) -> ProgressSubscription {
        self.hub.subscribe(filter)
    }

    pub fn hub(&self) -> &Arc<ProgressHub> {
        &self.hub
    }

    /// Stop the dispatcher and cancel any run in flight.
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(err) = self.task.await {
            warn!(error = %err, "controller task ended abnormally");
        }
    }
}

struct Dispatcher {
    engine: Arc<BulkReaffirmationEngine>,
    hub: Arc<ProgressHub>,
    commands: mpsc::Receiver<ControlMessage>,
    current: Option<ProgressStream>,
}

impl Dispatcher {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                message = next_message(&mut self.current) => match message {
                    Some(message) => self.hub.route(&message),
                    None => self.current = None,
                },
            }
        }
        if self.engine.cancel().is_some() {
            debug!("run cancelled on controller shutdown");
        }
        info!("bulk controller stopped");
    }

    async fn handle(&mut self, command: ControlMessage) {
        match command {
            ControlMessage::StartBulkReaffirmation {
                operation_id,
                request,
            } => match self.engine.start(operation_id.clone(), request) {
                Ok(stream) => {
                    if let Some(previous) = self.current.replace(stream) {
                        self.drain(previous).await;
                    }
                }
                Err(err) => {
                    warn!(operation = %operation_id, error = %err, "start ignored");
                }
            },
            ControlMessage::Cancel { operation_id } => {
                if self.engine.cancel_operation(&operation_id) {
                    self.current = None;
                }
            }
        }
    }

    /// Publish what is left of a finished run, up to its terminal message.
    async fn drain(&self, mut stream: ProgressStream) {
        let mut forwarded = 0usize;
        while let Some(message) = stream.recv().await {
            self.hub.route(&message);
            forwarded += 1;
        }
        debug!(operation = %stream.operation_id(), forwarded, "previous run drained");
    }
}

/// Next message of the current run; pends forever when there is none.
async fn next_message(current: &mut Option<ProgressStream>) -> Option<ProgressMessage> {
    match current {
        Some(stream) => stream.recv().await,
        None => std::future::pending().await,
    }
}
