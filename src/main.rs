mod cli;
mod commands;
mod coordinator;
mod downloader;
mod error;
mod progress;
mod providers;
mod reader;
mod render;
mod source;
mod utils;

use anyhow::Result;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::cli::{LectureSelection, ResourceKind};
use crate::commands::CourseDownload;

/// Download lecture videos or handouts from Stanford Engineering Everywhere.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("lectures").required(true).args(["all", "lec"])))]
struct Args {
    /// Course code, e.g. CS229 or EE261
    #[arg(short = 'c', long)]
    course: String,

    /// Whether to download videos or pdfs
    #[arg(short = 't', long = "type", value_enum, default_value = "pdf")]
    kind: ResourceKind,

    /// Download material for every lecture of the course
    #[arg(short = 'a', long)]
    all: bool,

    /// Comma separated list of lectures, e.g. 1,3,10
    #[arg(short = 'l', long, value_delimiter = ',', num_args = 1..)]
    lec: Vec<u32>,

    /// Directory to save downloaded files
    #[arg(short = 'd', long = "download-dir", default_value = ".")]
    download_dir: PathBuf,

    /// Save into a subdirectory named after the course
    #[arg(long = "course-dir")]
    course_dir: bool,

    /// Progress refresh period in milliseconds
    #[arg(long = "refresh-ms", default_value_t = 100)]
    refresh_ms: u64,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "stanford_dl=debug" } else { "stanford_dl=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let selection = if args.all {
        LectureSelection::All
    } else {
        LectureSelection::List(args.lec)
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        crate::commands::run_course_download(CourseDownload {
            course: args.course,
            kind: args.kind,
            selection,
            download_dir: args.download_dir,
            per_course_dir: args.course_dir,
            refresh: Duration::from_millis(args.refresh_ms.max(1)),
        })
        .await
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lecture_list() {
        let args =
            Args::try_parse_from(["stanford-dl", "-c", "CS229", "-t", "video", "-l", "1,3,10"])
                .unwrap();
        assert_eq!(args.course, "CS229");
        assert_eq!(args.kind, ResourceKind::Video);
        assert_eq!(args.lec, vec![1, 3, 10]);
        assert!(!args.all);
    }

    #[test]
    fn test_defaults_to_pdf() {
        let args = Args::try_parse_from(["stanford-dl", "--course", "EE261", "--all"]).unwrap();
        assert_eq!(args.kind, ResourceKind::Pdf);
        assert!(args.all);
        assert_eq!(args.download_dir, PathBuf::from("."));
    }

    #[test]
    fn test_requires_lecture_selection() {
        assert!(Args::try_parse_from(["stanford-dl", "-c", "CS229"]).is_err());
        assert!(Args::try_parse_from(["stanford-dl", "-c", "CS229", "--all", "-l", "1"]).is_err());
    }

    #[test]
    fn test_rejects_unknown_type() {
        let parsed = Args::try_parse_from(["stanford-dl", "-c", "CS229", "--all", "-t", "audio"]);
        assert!(parsed.is_err());
    }
}
