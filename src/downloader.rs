use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::DownloadError;
use crate::progress::{ProgressTracker, SlotStatus};
use crate::reader::InstrumentedReader;
use crate::source::{Resource, ResourceSource};

/// One resource to fetch. `index` doubles as the progress slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadTask {
    pub index: usize,
    pub source_url: String,
    pub destination: PathBuf,
}

impl DownloadTask {
    /// Builds tasks from `(url, destination)` pairs, numbering them by position.
    pub fn from_pairs<I>(pairs: I) -> Vec<DownloadTask>
    where
        I: IntoIterator<Item = (String, PathBuf)>,
    {
        pairs
            .into_iter()
            .enumerate()
            .map(|(index, (source_url, destination))| DownloadTask {
                index,
                source_url,
                destination,
            })
            .collect()
    }

    pub fn file_name(&self) -> String {
        self.destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.destination.display().to_string())
    }
}

#[derive(Debug)]
pub struct DownloadOutcome {
    pub index: usize,
    pub status: SlotStatus,
    pub error: Option<DownloadError>,
}

impl DownloadOutcome {
    pub fn completed(index: usize) -> Self {
        Self {
            index,
            status: SlotStatus::Completed,
            error: None,
        }
    }

    pub fn failed(index: usize, error: DownloadError) -> Self {
        Self {
            index,
            status: SlotStatus::Failed,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SlotStatus::Completed
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerPhase {
    Pending,
    Connecting,
    Writing,
    Completed,
    Failed,
}

/// Drives a single task from request to a terminal state.
pub struct DownloadWorker<S> {
    task: DownloadTask,
    source: Arc<S>,
    tracker: Arc<ProgressTracker>,
    display_unit: u64,
    cancel: CancellationToken,
    phase: WorkerPhase,
}

impl<S: ResourceSource> DownloadWorker<S> {
    pub fn new(
        task: DownloadTask,
        source: Arc<S>,
        tracker: Arc<ProgressTracker>,
        display_unit: u64,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            task,
            source,
            tracker,
            display_unit,
            cancel,
            phase: WorkerPhase::Pending,
        }
    }

    /// Runs the task to completion. Never returns early without marking the
    /// progress slot; every error is folded into the outcome.
    pub async fn run(mut self) -> DownloadOutcome {
        let index = self.task.index;
        let result = self.transfer().await;

        let outcome = match result {
            Ok(()) => {
                self.enter(WorkerPhase::Completed);
                info!(
                    index,
                    path = %self.task.destination.display(),
                    bytes = self.tracker.bytes_read(index).unwrap_or(0),
                    "download completed"
                );
                DownloadOutcome::completed(index)
            }
            Err(e) => {
                self.enter(WorkerPhase::Failed);
                // Reported in the summary; the bar already shows the failure.
                debug!(index, url = %self.task.source_url, error = %e, "download failed");
                DownloadOutcome::failed(index, e)
            }
        };

        self.tracker
            .mark_status(index, outcome.status, outcome.status.label());
        outcome
    }

    async fn transfer(&mut self) -> Result<(), DownloadError> {
        let index = self.task.index;

        self.enter(WorkerPhase::Connecting);
        let resource = tokio::select! {
            opened = self.source.open(&self.task.source_url) => opened?,
            _ = self.cancel.cancelled() => return Err(DownloadError::Cancelled),
        };

        self.tracker
            .set_total(index, resource.content_length, self.display_unit);

        // On failure `resource` is dropped here, closing the response body.
        let file = self.create_destination().await?;

        self.enter(WorkerPhase::Writing);
        self.write(resource, file).await
    }

    async fn create_destination(&self) -> Result<File, DownloadError> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.task.destination)
            .await
            .map_err(|source| DownloadError::FileCreation {
                path: self.task.destination.clone(),
                source,
            })
    }

    /// Copies the whole body into `file`. Both handles are owned here and
    /// dropped on every return path; a partial file stays on disk.
    async fn write(&self, resource: Resource, mut file: File) -> Result<(), DownloadError> {
        let mut reader =
            InstrumentedReader::new(resource.body, self.tracker.clone(), self.task.index);

        let copied = tokio::select! {
            res = tokio::io::copy(&mut reader, &mut file) => res.map_err(DownloadError::Transfer)?,
            _ = self.cancel.cancelled() => return Err(DownloadError::Cancelled),
        };

        file.flush().await.map_err(DownloadError::Transfer)?;
        debug!(index = self.task.index, copied, "stream exhausted");
        Ok(())
    }

    fn enter(&mut self, phase: WorkerPhase) {
        debug!(index = self.task.index, from = ?self.phase, to = ?phase, "worker transition");
        self.phase = phase;
    }
}
