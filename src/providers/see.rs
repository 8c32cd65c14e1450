//! Stanford Engineering Everywhere course pages.
//!
//! Videos are listed as one `<table class="table">` per lecture and live under
//! a predictable path on the video host. Handouts are listed as one
//! `<ul class="list-inline">` per lecture whose second link is the PDF.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tracing::debug;

use super::DownloadItem;
use crate::cli::{LectureSelection, ResourceKind};
use crate::error::ResolveError;
use crate::utils::{join_url, lecture_file_name};

static TABLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<table\b([^>]*)>").unwrap());
/// Opening and closing `<ul>` tags plus opening `<a>` tags, in document order.
static LIST_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(/?)(ul|a)\b([^>]*)>").unwrap());
static CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bclass\s*=\s*["']([^"']*)["']"#).unwrap());
static HREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bhref\s*=\s*["']([^"']*)["']"#).unwrap());

#[derive(Clone, Debug)]
pub struct SeeEndpoints {
    pub site_base: String,
    pub course_base: String,
    pub video_base: String,
}

impl Default for SeeEndpoints {
    fn default() -> Self {
        Self {
            site_base: "https://see.stanford.edu".to_string(),
            course_base: "https://see.stanford.edu/Course/".to_string(),
            video_base: "http://html5.stanford.edu/videos/courses/see/".to_string(),
        }
    }
}

pub async fn fetch_course_page(
    client: &Client,
    endpoints: &SeeEndpoints,
    course: &str,
) -> Result<String, ResolveError> {
    let url = format!("{}{}", endpoints.course_base, course);

    debug!(%url, "fetching course page");
    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|source| ResolveError::Fetch {
            url: url.clone(),
            source,
        })?;
    if !resp.status().is_success() {
        return Err(ResolveError::Status {
            url,
            status: resp.status().as_u16(),
        });
    }
    resp.text()
        .await
        .map_err(|source| ResolveError::Fetch { url, source })
}

/// Turns a course page into download items for the selected lectures.
pub fn resolve(
    html: &str,
    endpoints: &SeeEndpoints,
    course: &str,
    kind: ResourceKind,
    selection: &LectureSelection,
) -> Result<Vec<DownloadItem>, ResolveError> {
    let ext = kind.extension();
    match kind {
        ResourceKind::Video => {
            let available = count_video_lectures(html);
            let lectures = select(course, selection, available)?;
            Ok(lectures
                .into_iter()
                .map(|n| {
                    let file_name = lecture_file_name(course, n, ext);
                    DownloadItem {
                        url: format!("{}{}/{}", endpoints.video_base, course, file_name),
                        file_name,
                    }
                })
                .collect())
        }
        ResourceKind::Pdf => {
            let links = pdf_lecture_links(html);
            let lectures = select(course, selection, links.len())?;
            lectures
                .into_iter()
                .map(|n| -> Result<DownloadItem, ResolveError> {
                    let href = links[n as usize - 1]
                        .as_deref()
                        .ok_or(ResolveError::MissingLink { lecture: n })?;
                    let url = join_url(&endpoints.site_base, href).map_err(|source| {
                        ResolveError::InvalidLink {
                            href: href.to_string(),
                            source,
                        }
                    })?;
                    Ok(DownloadItem {
                        url,
                        file_name: lecture_file_name(course, n, ext),
                    })
                })
                .collect()
        }
    }
}

fn select(
    course: &str,
    selection: &LectureSelection,
    available: usize,
) -> Result<Vec<u32>, ResolveError> {
    if available == 0 {
        return Err(ResolveError::NoLectures(course.to_string()));
    }
    let lectures = selection.lectures(available);
    if lectures.is_empty() {
        return Err(ResolveError::NoLectures(course.to_string()));
    }
    if let Some(&lecture) = lectures
        .iter()
        .find(|&&n| n == 0 || n as usize > available)
    {
        return Err(ResolveError::LectureOutOfRange { lecture, available });
    }
    Ok(lectures)
}

pub fn count_video_lectures(html: &str) -> usize {
    TABLE_RE
        .captures_iter(html)
        .filter(|c| has_class(&c[1], "table"))
        .count()
}

/// For every `<ul class="list-inline">`, in document order, the href of the
/// second link anywhere inside it, if any.
///
/// Lists are matched by tag depth, so sub-lists and lecture lists nested in
/// other lists are both handled.
pub fn pdf_lecture_links(html: &str) -> Vec<Option<String>> {
    struct OpenList {
        slot: Option<usize>,
        anchors: Vec<Option<String>>,
    }

    let mut links: Vec<Option<String>> = Vec::new();
    let mut open: Vec<OpenList> = Vec::new();

    for tag in LIST_TAG_RE.captures_iter(html) {
        let closing = !tag[1].is_empty();
        let attrs = &tag[3];
        match (tag[2].to_ascii_lowercase().as_str(), closing) {
            ("ul", false) => {
                let slot = has_class(attrs, "list-inline").then(|| {
                    links.push(None);
                    links.len() - 1
                });
                open.push(OpenList {
                    slot,
                    anchors: Vec::new(),
                });
            }
            ("ul", true) => {
                if let Some(list) = open.pop() {
                    close_list(&mut links, list.slot, list.anchors);
                }
            }
            ("a", false) => {
                let href = HREF_RE.captures(attrs).map(|h| h[1].to_string());
                for list in open.iter_mut().filter(|l| l.slot.is_some()) {
                    list.anchors.push(href.clone());
                }
            }
            _ => {}
        }
    }

    // Unterminated lists still count.
    while let Some(list) = open.pop() {
        close_list(&mut links, list.slot, list.anchors);
    }
    links
}

fn close_list(links: &mut [Option<String>], slot: Option<usize>, anchors: Vec<Option<String>>) {
    if let Some(slot) = slot {
        links[slot] = anchors.into_iter().nth(1).flatten();
    }
}

fn has_class(attrs: &str, class: &str) -> bool {
    CLASS_RE
        .captures(attrs)
        .map(|c| c[1].split_whitespace().any(|name| name == class))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::http_client;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn endpoints_for(server: &MockServer) -> SeeEndpoints {
        SeeEndpoints {
            site_base: server.uri(),
            course_base: format!("{}/Course/", server.uri()),
            video_base: format!("{}/videos/", server.uri()),
        }
    }

    const VIDEO_PAGE: &str = r#"
        <html><body>
        <table class="table"><tr><td>Lecture 1</td></tr></table>
        <table class="layout"><tr><td>not a lecture</td></tr></table>
        <TABLE class="table table-striped"><tr><td>Lecture 2</td></tr></TABLE>
        <table class='table'><tr><td>Lecture 3</td></tr></table>
        </body></html>
    "#;

    const PDF_PAGE: &str = r#"
        <ul class="nav"><li><a href="/home">Home</a></li><li><a href="/about">About</a></li></ul>
        <ul class="list-inline">
            <li><a href="/materials/cs229/transcript1.html">Transcript</a></li>
            <li><a href="/materials/cs229/lecture1.pdf">PDF</a></li>
        </ul>
        <ul class="list-inline">
            <li><a href="/materials/cs229/transcript2.html">Transcript</a></li>
            <li><a class="pdf" href="https://cdn.example.org/lecture2.pdf">PDF</a></li>
        </ul>
        <ul class="list-inline">
            <li><a href="/materials/cs229/transcript3.html">Only one</a></li>
        </ul>
    "#;

    #[test]
    fn test_count_video_lectures() {
        assert_eq!(count_video_lectures(VIDEO_PAGE), 3);
        assert_eq!(count_video_lectures("<p>nothing</p>"), 0);
    }

    #[test]
    fn test_resolve_videos() {
        let endpoints = SeeEndpoints::default();
        let items = resolve(
            VIDEO_PAGE,
            &endpoints,
            "CS229",
            ResourceKind::Video,
            &LectureSelection::List(vec![3, 1]),
        )
        .unwrap();
        assert_eq!(
            items,
            vec![
                DownloadItem {
                    url: format!("{}CS229/CS229-lecture03.mp4", endpoints.video_base),
                    file_name: "CS229-lecture03.mp4".into(),
                },
                DownloadItem {
                    url: format!("{}CS229/CS229-lecture01.mp4", endpoints.video_base),
                    file_name: "CS229-lecture01.mp4".into(),
                },
            ]
        );
    }

    #[test]
    fn test_pdf_links_take_second_anchor() {
        let links = pdf_lecture_links(PDF_PAGE);
        assert_eq!(
            links,
            vec![
                Some("/materials/cs229/lecture1.pdf".to_string()),
                Some("https://cdn.example.org/lecture2.pdf".to_string()),
                None,
            ]
        );
    }

    #[test]
    fn test_resolve_pdfs() {
        let endpoints = SeeEndpoints::default();
        let items = resolve(
            PDF_PAGE,
            &endpoints,
            "CS229",
            ResourceKind::Pdf,
            &LectureSelection::List(vec![1, 2]),
        )
        .unwrap();
        assert_eq!(items[0].url, "https://see.stanford.edu/materials/cs229/lecture1.pdf");
        assert_eq!(items[0].file_name, "CS229-lecture01.pdf");
        assert_eq!(items[1].url, "https://cdn.example.org/lecture2.pdf");
    }

    #[test]
    fn test_missing_pdf_link() {
        let err = resolve(
            PDF_PAGE,
            &SeeEndpoints::default(),
            "CS229",
            ResourceKind::Pdf,
            &LectureSelection::All,
        )
        .unwrap_err();
        assert!(matches!(err, ResolveError::MissingLink { lecture: 3 }));
    }

    #[test]
    fn test_out_of_range_lecture() {
        let err = resolve(
            VIDEO_PAGE,
            &SeeEndpoints::default(),
            "CS229",
            ResourceKind::Video,
            &LectureSelection::List(vec![1, 4]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::LectureOutOfRange {
                lecture: 4,
                available: 3
            }
        ));

        let err = resolve(
            VIDEO_PAGE,
            &SeeEndpoints::default(),
            "CS229",
            ResourceKind::Video,
            &LectureSelection::List(vec![0]),
        )
        .unwrap_err();
        assert!(matches!(err, ResolveError::LectureOutOfRange { lecture: 0, .. }));
    }

    #[test]
    fn test_empty_page_has_no_lectures() {
        let err = resolve(
            "<html></html>",
            &SeeEndpoints::default(),
            "XX000",
            ResourceKind::Pdf,
            &LectureSelection::All,
        )
        .unwrap_err();
        assert!(matches!(err, ResolveError::NoLectures(_)));
    }

    #[test]
    fn test_lecture_lists_nested_in_outer_list() {
        let html = r#"
            <ul class="lectures">
                <li><ul class="list-inline">
                    <li><a href="/t1.html">Transcript</a></li>
                    <li><a href="/l1.pdf">PDF</a></li>
                </ul></li>
                <li><ul class="list-inline">
                    <li><a href="/t2.html">Transcript</a></li>
                    <li><a href="/l2.pdf">PDF</a></li>
                </ul></li>
            </ul>
        "#;
        assert_eq!(
            pdf_lecture_links(html),
            vec![Some("/l1.pdf".to_string()), Some("/l2.pdf".to_string())]
        );

        let items = resolve(
            html,
            &SeeEndpoints::default(),
            "CS229",
            ResourceKind::Pdf,
            &LectureSelection::List(vec![1]),
        )
        .unwrap();
        assert_eq!(items[0].url, "https://see.stanford.edu/l1.pdf");
        assert_eq!(items[0].file_name, "CS229-lecture01.pdf");
    }

    #[test]
    fn test_lecture_list_with_sub_list() {
        let html = r#"
            <ul class="list-inline">
                <li><a href="/t1.html">Transcript</a>
                    <ul class="dropdown"><li>no links here</li></ul>
                </li>
                <li><a href="/l1.pdf">PDF</a></li>
            </ul>
            <ul class="list-inline">
                <li><ul><li><a href="/t2.html">Transcript</a></li></ul></li>
                <li><a href="/l2.pdf">PDF</a></li>
            </ul>
        "#;
        assert_eq!(
            pdf_lecture_links(html),
            vec![Some("/l1.pdf".to_string()), Some("/l2.pdf".to_string())]
        );
    }

    #[test]
    fn test_lecture_list_nested_in_lecture_list() {
        let html = r#"
            <ul class="list-inline">
                <li><a href="/outer-t.html">Transcript</a></li>
                <li><ul class="list-inline">
                    <li><a href="/inner-t.html">Transcript</a></li>
                    <li><a href="/inner.pdf">PDF</a></li>
                </ul></li>
            </ul>
        "#;
        // Document order of the opening tags, links counted over all descendants.
        assert_eq!(
            pdf_lecture_links(html),
            vec![Some("/inner-t.html".to_string()), Some("/inner.pdf".to_string())]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_course_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Course/CS229"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PDF_PAGE))
            .mount(&server)
            .await;

        let html = fetch_course_page(&http_client(), &endpoints_for(&server), "CS229")
            .await
            .unwrap();
        assert_eq!(pdf_lecture_links(&html).len(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_course_page_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Course/XX999"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = fetch_course_page(&http_client(), &endpoints_for(&server), "XX999")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Status { status: 500, .. }));
    }
}
