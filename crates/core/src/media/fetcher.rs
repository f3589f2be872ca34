//! Remote resource download.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Url};
use std::path::Path;
use std::time::Duration;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use super::error::MediaError;
use crate::config::MediaConfig;

/// Downloads a single resource to a local file.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Writes the resource at `url` to `destination` and returns the byte count.
    ///
    /// Implementations must refuse resources larger than `max_bytes` and must
    /// not leave a partial file behind on failure.
    async fn fetch(&self, url: &Url, destination: &Path, max_bytes: u64)
        -> Result<u64, MediaError>;
}

/// `reqwest`-backed fetcher that streams the body to disk.
pub struct HttpMediaFetcher {
    client: Client,
}

impl HttpMediaFetcher {
    pub fn new(config: &MediaConfig) -> Result<Self, MediaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(concat!("pdfsmith/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MediaError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    async fn stream_to_file(
        &self,
        url: &Url,
        destination: &Path,
        max_bytes: u64,
    ) -> Result<u64, MediaError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| MediaError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if response.content_length().is_some_and(|len| len > max_bytes) {
            return Err(MediaError::TooLarge {
                url: url.to_string(),
                limit: max_bytes,
            });
        }

        let io_error = |source| MediaError::Io {
            path: destination.to_path_buf(),
            source,
        };
        let mut file = File::create(destination).await.map_err(io_error)?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| MediaError::transport(url, e))?;
            written += chunk.len() as u64;
            if written > max_bytes {
                return Err(MediaError::TooLarge {
                    url: url.to_string(),
                    limit: max_bytes,
                });
            }
            file.write_all(&chunk).await.map_err(io_error)?;
        }
        file.flush().await.map_err(io_error)?;

        Ok(written)
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(
        &self,
        url: &Url,
        destination: &Path,
        max_bytes: u64,
    ) -> Result<u64, MediaError> {
        let result = self.stream_to_file(url, destination, max_bytes).await;
        if result.is_err() {
            // Best effort; the file may never have been created.
            let _ = fs::remove_file(destination).await;
        }
        result
    }
}
