//! Network boundary for the media cache
//!
//! The cache only needs two things from the network: the byte size of a
//! resource (without its body) and a whole-file download to a path.
//! [`MediaFetcher`] is the seam; [`HttpFetcher`] is the reqwest implementation.

use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Errors from the network boundary
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Response carries no usable Content-Length")]
    NoContentLength,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Write to {path} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Source of remote media bytes and metadata
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Byte size of the resource, without downloading the body
    async fn content_length(&self, url: &str) -> Result<u64, FetchError>;

    /// Download the whole resource to `dest`; returns bytes written.
    ///
    /// `dest` must only appear once the body is complete.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// reqwest-backed fetcher
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the given request timeout
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|e| {
                    warn!("fetch: client setup failed, using defaults without timeout: {}", e);
                    reqwest::Client::new()
                }),
        }
    }

    /// Create a fetcher around an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> FetchError {
    let path = path.to_path_buf();
    move |source| FetchError::Io { path, source }
}

fn check_status(status: StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(FetchError::Status(status.as_u16()))
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn content_length(&self, url: &str) -> Result<u64, FetchError> {
        let response = self.client.head(url).send().await?;
        check_status(response.status())?;

        // reqwest reports 0 for HEAD bodies, read the header itself
        let length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .ok_or(FetchError::NoContentLength)?;

        debug!("fetch: size probe url='{}' bytes={}", url, length);
        Ok(length)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let mut response = self.client.get(url).send().await?;
        check_status(response.status())?;

        // Sibling temp file, renamed into place once complete
        let tmp = dest.with_extension(format!("part.{}", uuid::Uuid::new_v4().simple()));

        let mut file = tokio::fs::File::create(&tmp).await.map_err(io_err(&tmp))?;
        let mut written = 0u64;

        let result: Result<(), FetchError> = async {
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await.map_err(io_err(&tmp))?;
                written += chunk.len() as u64;
            }
            file.flush().await.map_err(io_err(&tmp))?;
            file.sync_all().await.map_err(io_err(&tmp))?;
            Ok(())
        }
        .await;

        drop(file);

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }

        if let Err(source) = tokio::fs::rename(&tmp, dest).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(FetchError::Io {
                path: dest.to_path_buf(),
                source,
            });
        }

        debug!(
            "fetch: download OK url='{}' dest='{}' bytes={}",
            url,
            dest.display(),
            written
        );
        Ok(written)
    }
}
