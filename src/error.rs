use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a single download task.
///
/// None of these escape the worker that produced them: they are recorded in
/// the task's outcome and sibling downloads carry on.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Host unreachable, request failed, or the server answered with a
    /// non-success status.
    #[error("connection to {url} failed: {reason}")]
    Connection { url: String, reason: String },

    /// The destination file could not be opened for writing.
    #[error("cannot create {}: {source}", .path.display())]
    FileCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The stream broke (or the disk refused a write) mid-copy.
    #[error("transfer interrupted: {0}")]
    Transfer(#[source] io::Error),

    #[error("download cancelled")]
    Cancelled,
}

impl DownloadError {
    pub fn connection(url: &str, reason: impl ToString) -> Self {
        DownloadError::Connection {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Short name of the error kind, used in the final summary.
    pub fn kind(&self) -> &'static str {
        match self {
            DownloadError::Connection { .. } => "ConnectionError",
            DownloadError::FileCreation { .. } => "FileCreationError",
            DownloadError::Transfer(_) => "TransferError",
            DownloadError::Cancelled => "Cancelled",
        }
    }
}

/// Errors raised while turning a course page into a list of downloads.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to fetch course page {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("course page {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("no lectures found for course {0}")]
    NoLectures(String),

    #[error("lecture {lecture} does not exist (course has {available} lectures)")]
    LectureOutOfRange { lecture: u32, available: usize },

    #[error("no download link found for lecture {lecture}")]
    MissingLink { lecture: u32 },

    #[error("invalid link {href}: {source}")]
    InvalidLink {
        href: String,
        #[source]
        source: url::ParseError,
    },
}
