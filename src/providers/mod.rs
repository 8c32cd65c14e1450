pub mod see;

use reqwest::Client;

use crate::cli::{LectureSelection, ResourceKind};
use crate::error::ResolveError;

/// A resolved lecture resource: where to fetch it and what to call it locally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadItem {
    pub url: String,
    pub file_name: String,
}

/// Resolves the lecture resources of `course` from Stanford Engineering Everywhere.
pub async fn fetch_items(
    client: &Client,
    course: &str,
    kind: ResourceKind,
    selection: &LectureSelection,
) -> Result<Vec<DownloadItem>, ResolveError> {
    let endpoints = see::SeeEndpoints::default();
    let html = see::fetch_course_page(client, &endpoints, course).await?;
    see::resolve(&html, &endpoints, course, kind, selection)
}
