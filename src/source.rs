//! Where download bytes come from.
//!
//! Workers only need "open this URL, give me a length and a byte stream", so
//! the network sits behind [`ResourceSource`]. Production uses
//! [`HttpSource`]; tests script their own responses.

use std::future::Future;
use std::io;
use std::time::Duration;

use futures::TryStreamExt;
use reqwest::Client;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

use crate::error::DownloadError;

pub type Body = Box<dyn AsyncRead + Send + Unpin>;

/// An opened remote resource. Dropping it releases the underlying stream.
pub struct Resource {
    pub content_length: Option<u64>,
    pub body: Body,
}

pub trait ResourceSource: Send + Sync + 'static {
    /// Issues the request for `url`. A transport failure or a non-success
    /// status must surface as [`DownloadError::Connection`].
    fn open(&self, url: &str) -> impl Future<Output = Result<Resource, DownloadError>> + Send;
}

/// Client used for both the course page and the downloads.
pub fn http_client() -> Client {
    Client::builder()
        .user_agent(concat!("stanford-dl/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new())
}

pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new() -> Self {
        Self::with_client(http_client())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSource for HttpSource {
    async fn open(&self, url: &str) -> Result<Resource, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::connection(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::connection(url, format!("HTTP {}", status)));
        }

        let content_length = response.content_length();
        let stream = response.bytes_stream().map_err(io::Error::other);

        Ok(Resource {
            content_length,
            body: Box::new(StreamReader::new(Box::pin(stream))),
        })
    }
}
