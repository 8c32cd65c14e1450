use anyhow::{Context, Result};
use indicatif::HumanBytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::info;

use crate::cli::{LectureSelection, ResourceKind};
use crate::coordinator::{DownloadCoordinator, DownloadReport};
use crate::downloader::DownloadTask;
use crate::providers::{self, DownloadItem};
use crate::source::{http_client, HttpSource};
use crate::utils::course_dir;

pub struct CourseDownload {
    pub course: String,
    pub kind: ResourceKind,
    pub selection: LectureSelection,
    pub download_dir: PathBuf,
    pub per_course_dir: bool,
    pub refresh: Duration,
}

pub async fn run_course_download(opts: CourseDownload) -> Result<()> {
    // Resolution errors are fatal; nothing has been downloaded yet.
    let client = http_client();
    let items = providers::fetch_items(&client, &opts.course, opts.kind, &opts.selection)
        .await
        .with_context(|| format!("Failed to resolve lectures for course {}", opts.course))?;

    println!("Found {} lectures for course {}", items.len(), opts.course);

    let dest_dir = course_dir(&opts.download_dir, &opts.course, opts.per_course_dir);
    if !dest_dir.exists() {
        fs::create_dir_all(&dest_dir)
            .await
            .with_context(|| format!("Failed to create output directory {:?}", dest_dir))?;
    }

    let tasks = build_tasks(&items, &dest_dir);
    let source = Arc::new(HttpSource::with_client(client));
    let coordinator =
        DownloadCoordinator::new(source, opts.kind.display_unit()).refresh_interval(opts.refresh);

    let cancel = coordinator.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, abandoning in-flight downloads");
            cancel.cancel();
        }
    });

    let report = coordinator.run(tasks.clone()).await;
    interrupt.abort();

    for line in summary_lines(&tasks, &report) {
        println!("{}", line);
    }
    info!(
        succeeded = report.succeeded(),
        failed = report.outcomes.len() - report.succeeded(),
        "batch finished"
    );
    Ok(())
}

pub fn build_tasks(items: &[DownloadItem], dest_dir: &Path) -> Vec<DownloadTask> {
    DownloadTask::from_pairs(
        items
            .iter()
            .map(|item| (item.url.clone(), dest_dir.join(&item.file_name))),
    )
}

fn summary_lines(tasks: &[DownloadTask], report: &DownloadReport) -> Vec<String> {
    let bytes: u64 = report.progress.iter().map(|p| p.bytes_read).sum();
    let mut lines = vec![format!(
        "Summary: Completed: {}/{} | Failed: {} | Downloaded: {}",
        report.succeeded(),
        report.outcomes.len(),
        report.outcomes.len() - report.succeeded(),
        HumanBytes(bytes)
    )];

    for outcome in report.failed() {
        let name = tasks
            .get(outcome.index)
            .map(DownloadTask::file_name)
            .unwrap_or_else(|| format!("#{}", outcome.index));
        let mut line = match &outcome.error {
            Some(e) => format!("  Failed {}: [{}] {}", name, e.kind(), e),
            None => format!("  Failed {}", name),
        };
        if let Some(fraction) = report
            .progress
            .get(outcome.index)
            .and_then(|p| p.fraction())
            .filter(|f| *f > 0.0)
        {
            line.push_str(&format!(" ({:.0}% transferred)", fraction * 100.0));
        }
        lines.push(line);
    }
    lines
}
