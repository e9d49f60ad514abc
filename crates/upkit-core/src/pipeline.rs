//! Upload pipeline: async driver around an [`UploadQueue`].
//!
//! One actor task owns the queue; handle methods and upload completions reach it
//! as messages, so the valid/invalid sets are only mutated between suspension
//! points of that single task. Each admitted file is uploaded on its own spawned
//! task, which reports back to the actor when the request resolves. A request
//! that panics or is cancelled reports an `Unknown Error` failure.
//!
//! Shutdown: [`UploadPipeline::shutdown`] stops accepting commands and waits for
//! in-flight uploads to report. Dropping the pipeline instead aborts the actor;
//! uploads already spawned still run to completion in the background and their
//! outcomes are lost.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::UploadConfig;
use crate::error::UploadError;
use crate::models::{FileCandidate, FileId, FileState, TrackedFile, UploadEvent};
use crate::queue::{UploadJob, UploadQueue};
use crate::translate::{DefaultTranslator, Translator};
use crate::transport::{TransportError, UploadTransport, UNKNOWN_ERROR_STATUS_TEXT};

type UploadOutcome = (FileId, Result<String, TransportError>);

/// Copy of the tracked sets at one point in time.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PipelineSnapshot {
    pub valid: Vec<TrackedFile>,
    pub invalid: Vec<TrackedFile>,
}

impl PipelineSnapshot {
    fn of(queue: &UploadQueue) -> Self {
        Self {
            valid: queue.valid_files().to_vec(),
            invalid: queue.invalid_files().to_vec(),
        }
    }

    pub fn count_in(&self, state: FileState) -> usize {
        self.valid.iter().filter(|f| f.state == state).count()
    }

    /// Valid files followed by invalid files.
    pub fn all(&self) -> impl Iterator<Item = &TrackedFile> {
        self.valid.iter().chain(self.invalid.iter())
    }

    pub fn find_by_name(&self, name: &str) -> Option<&TrackedFile> {
        self.all().find(|f| f.name == name)
    }

    pub fn is_settled(&self) -> bool {
        !self.valid.iter().any(|f| f.state.is_unsettled())
    }
}

enum Command {
    Submit {
        batch: Vec<FileCandidate>,
        reply: oneshot::Sender<PipelineSnapshot>,
    },
    Remove {
        id: FileId,
        reply: oneshot::Sender<Option<TrackedFile>>,
    },
    Clear {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<PipelineSnapshot>,
    },
    Reconfigure {
        config: UploadConfig,
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

pub struct UploadPipeline {
    commands: mpsc::UnboundedSender<Command>,
    task: Option<JoinHandle<()>>,
}

impl UploadPipeline {
    /// Start a pipeline on the current tokio runtime.
    ///
    /// Returns the handle and the receiver on which every [`UploadEvent`] is
    /// delivered in emission order. Events are dropped if the receiver is gone.
    pub fn new(
        config: UploadConfig,
        transport: Option<Arc<dyn UploadTransport>>,
        translator: Arc<dyn Translator>,
    ) -> (Self, mpsc::UnboundedReceiver<UploadEvent>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();

        if transport.is_none() {
            UploadError::TransportMissing.log();
        }

        let mut queue = UploadQueue::new(config, translator);
        queue.set_admitting(transport.is_some());

        let actor = PipelineActor {
            queue,
            transport,
            events: events_tx,
            finished_tx,
            in_flight: 0,
        };
        let task = tokio::spawn(actor.run(commands_rx, finished_rx));

        (
            Self {
                commands: commands_tx,
                task: Some(task),
            },
            events_rx,
        )
    }

    /// Start a pipeline with the built-in translation table.
    pub fn with_transport(
        config: UploadConfig,
        transport: Arc<dyn UploadTransport>,
    ) -> (Self, mpsc::UnboundedReceiver<UploadEvent>) {
        Self::new(config, Some(transport), Arc::new(DefaultTranslator::new()))
    }

    /// Classify a batch, track it, and start uploads up to the concurrency ceiling.
    ///
    /// The `start` event has been emitted and the admitted uploads dispatched by
    /// the time this returns. An empty batch is logged and ignored.
    pub async fn submit(&self, batch: Vec<FileCandidate>) -> Result<PipelineSnapshot, UploadError> {
        self.request(|reply| Command::Submit { batch, reply }).await
    }

    /// Stop tracking a file. Returns the removed file, or `None` if it was not tracked.
    pub async fn remove(&self, id: FileId) -> Result<Option<TrackedFile>, UploadError> {
        self.request(|reply| Command::Remove { id, reply }).await
    }

    /// Forget every tracked file without emitting events.
    pub async fn clear(&self) -> Result<(), UploadError> {
        self.request(|reply| Command::Clear { reply }).await
    }

    pub async fn snapshot(&self) -> Result<PipelineSnapshot, UploadError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Replace the constraint set for subsequent batches and uploads.
    pub async fn reconfigure(&self, config: UploadConfig) -> Result<(), UploadError> {
        self.request(|reply| Command::Reconfigure { config, reply })
            .await
    }

    /// Stop accepting commands and wait for in-flight uploads to finish.
    pub async fn shutdown(mut self) {
        tracing::info!("Shutting down upload pipeline");
        let _ = self.commands.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Upload pipeline task failed");
            }
        }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, UploadError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .map_err(|_| UploadError::PipelineClosed)?;
        reply_rx.await.map_err(|_| UploadError::PipelineClosed)
    }
}

impl Drop for UploadPipeline {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct PipelineActor {
    queue: UploadQueue,
    transport: Option<Arc<dyn UploadTransport>>,
    events: mpsc::UnboundedSender<UploadEvent>,
    finished_tx: mpsc::UnboundedSender<UploadOutcome>,
    in_flight: usize,
}

impl PipelineActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut finished: mpsc::UnboundedReceiver<UploadOutcome>,
    ) {
        tracing::debug!("Upload pipeline started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                Some((id, outcome)) = finished.recv() => self.on_finished(id, outcome),
            }
        }

        while self.in_flight > 0 {
            match finished.recv().await {
                Some((id, outcome)) => self.on_finished(id, outcome),
                None => break,
            }
        }

        tracing::debug!("Upload pipeline stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Submit { batch, reply } => {
                self.submit(batch);
                let _ = reply.send(PipelineSnapshot::of(&self.queue));
            }
            Command::Remove { id, reply } => {
                let removed = self.queue.remove(id);
                self.flush_events();
                let _ = reply.send(removed);
            }
            Command::Clear { reply } => {
                self.queue.clear();
                let _ = reply.send(());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(PipelineSnapshot::of(&self.queue));
            }
            Command::Reconfigure { config, reply } => {
                self.queue.set_config(config);
                let _ = reply.send(());
            }
            Command::Shutdown => {}
        }
    }

    #[tracing::instrument(skip(self, batch), fields(files = batch.len()))]
    fn submit(&mut self, batch: Vec<FileCandidate>) {
        let jobs = self.queue.submit(batch);
        if self.transport.is_none() && self.queue.pending_count() > 0 {
            UploadError::TransportMissing.log();
        }
        self.flush_events();
        self.dispatch(jobs);
    }

    fn on_finished(&mut self, id: FileId, outcome: Result<String, TransportError>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match &outcome {
            Ok(url) => tracing::info!(file_id = %id, url = %url, "File uploaded"),
            Err(e) => tracing::warn!(file_id = %id, error = %e, status = ?e.status, "File upload failed"),
        }

        let next = self.queue.finish(id, outcome);
        self.flush_events();
        self.dispatch(next);
    }

    fn dispatch(&mut self, jobs: Vec<UploadJob>) {
        // Admission is closed when there is no transport, so no jobs arrive here.
        let Some(transport) = self.transport.clone() else {
            return;
        };

        for job in jobs {
            self.in_flight += 1;
            tracing::debug!(file_id = %job.file_id, endpoint = %job.endpoint, "Starting upload");

            let transport = Arc::clone(&transport);
            let finished_tx = self.finished_tx.clone();
            tokio::spawn(async move {
                let file_id = job.file_id;
                let request = tokio::spawn(async move {
                    transport.post_multipart(&job.endpoint, job.payload).await
                });
                let outcome = match request.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!(file_id = %file_id, error = %e, "Upload task failed");
                        Err(TransportError::network(UNKNOWN_ERROR_STATUS_TEXT))
                    }
                };
                let _ = finished_tx.send((file_id, outcome));
            });
        }
    }

    fn flush_events(&mut self) {
        for event in self.queue.take_events() {
            tracing::trace!(event = event.name(), "Emitting upload event");
            let _ = self.events.send(event);
        }
    }
}
