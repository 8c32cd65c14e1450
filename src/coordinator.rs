use std::sync::Arc;
use std::time::Duration;

use indicatif::ProgressDrawTarget;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::downloader::{DownloadOutcome, DownloadTask, DownloadWorker};
use crate::error::DownloadError;
use crate::progress::{ProgressState, ProgressTracker, SlotStatus};
use crate::render::ProgressRenderer;
use crate::source::ResourceSource;

pub const DEFAULT_REFRESH: Duration = Duration::from_millis(100);

/// Everything a finished batch produced, indexed by task.
#[derive(Debug)]
pub struct DownloadReport {
    pub outcomes: Vec<DownloadOutcome>,
    pub progress: Vec<ProgressState>,
}

impl DownloadReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &DownloadOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Fans a batch of tasks out to one worker each and waits for all of them.
pub struct DownloadCoordinator<S> {
    source: Arc<S>,
    display_unit: u64,
    refresh: Duration,
    draw_target: fn() -> ProgressDrawTarget,
    cancel: CancellationToken,
}

impl<S: ResourceSource> DownloadCoordinator<S> {
    pub fn new(source: Arc<S>, display_unit: u64) -> Self {
        Self {
            source,
            display_unit,
            refresh: DEFAULT_REFRESH,
            draw_target: ProgressDrawTarget::stderr,
            cancel: CancellationToken::new(),
        }
    }

    pub fn refresh_interval(mut self, refresh: Duration) -> Self {
        self.refresh = refresh;
        self
    }

    #[cfg(test)]
    pub fn draw_target(mut self, target: fn() -> ProgressDrawTarget) -> Self {
        self.draw_target = target;
        self
    }

    /// Token that aborts every in-flight worker when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(&self, tasks: Vec<DownloadTask>) -> DownloadReport {
        let (report, renderer) = self.execute(tasks).await;
        if let Some(renderer) = renderer {
            if !renderer.all_finished() {
                debug!("render loop stopped with unfinished bars");
            }
        }
        report
    }

    async fn execute(
        &self,
        tasks: Vec<DownloadTask>,
    ) -> (DownloadReport, Option<ProgressRenderer>) {
        let tracker = Arc::new(ProgressTracker::new(tasks.len()));
        let labels: Vec<String> = tasks.iter().map(DownloadTask::file_name).collect();

        // Rendering outlives cancellation: it only stops once every worker
        // has been joined, so the last frame shows every terminal state.
        let stop_render = CancellationToken::new();
        let render_handle = self.spawn_render_loop(labels, tracker.clone(), stop_render.clone());

        let handles: Vec<(usize, JoinHandle<DownloadOutcome>)> = tasks
            .into_iter()
            .map(|task| {
                let index = task.index;
                let worker = DownloadWorker::new(
                    task,
                    self.source.clone(),
                    tracker.clone(),
                    self.display_unit,
                    self.cancel.clone(),
                );
                (index, tokio::spawn(worker.run()))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (index, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(index, error = %e, "download worker aborted");
                    tracker.mark_status(index, SlotStatus::Failed, SlotStatus::Failed.label());
                    DownloadOutcome::failed(
                        index,
                        DownloadError::Transfer(std::io::Error::other(e.to_string())),
                    )
                }
            };
            outcomes.push(outcome);
        }
        outcomes.sort_by_key(|o| o.index);

        stop_render.cancel();
        let renderer = match render_handle.await {
            Ok(renderer) => Some(renderer),
            Err(e) => {
                debug!(error = %e, "render loop ended abnormally");
                None
            }
        };

        let report = DownloadReport {
            outcomes,
            progress: tracker.snapshot_all(),
        };
        (report, renderer)
    }

    fn spawn_render_loop(
        &self,
        labels: Vec<String>,
        tracker: Arc<ProgressTracker>,
        stop: CancellationToken,
    ) -> JoinHandle<ProgressRenderer> {
        let target = (self.draw_target)();
        let refresh = self.refresh;
        tokio::spawn(async move {
            let mut renderer = ProgressRenderer::new(&labels, target);
            loop {
                renderer.refresh(&tracker);
                tokio::select! {
                    _ = tokio::time::sleep(refresh) => {}
                    _ = stop.cancelled() => break,
                }
            }
            renderer.refresh(&tracker);
            renderer
        })
    }
}
