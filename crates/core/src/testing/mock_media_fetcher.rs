//! Mock media fetcher for testing.

use async_trait::async_trait;
use reqwest::Url;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::media::{MediaError, MediaFetcher};

/// Mock implementation of the MediaFetcher trait.
///
/// Writes a fixed body for every URL except those marked as failing, and
/// records every requested URL in order.
#[derive(Debug, Clone)]
pub struct MockMediaFetcher {
    requests: Arc<RwLock<Vec<String>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    body: Arc<RwLock<Vec<u8>>>,
}

impl Default for MockMediaFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMediaFetcher {
    /// Create a new mock fetcher.
    pub fn new() -> Self {
        Self {
            requests: Arc::new(RwLock::new(Vec::new())),
            failing: Arc::new(RwLock::new(HashSet::new())),
            body: Arc::new(RwLock::new(b"\x89PNG mock media".to_vec())),
        }
    }

    /// Make every fetch of `url` fail.
    pub async fn fail_url(&self, url: impl Into<String>) {
        self.failing.write().await.insert(url.into());
    }

    /// Set the body written for successful fetches.
    pub async fn set_body(&self, body: impl Into<Vec<u8>>) {
        *self.body.write().await = body.into();
    }

    /// URLs requested so far, in order.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl MediaFetcher for MockMediaFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(
        &self,
        url: &Url,
        destination: &Path,
        max_bytes: u64,
    ) -> Result<u64, MediaError> {
        self.requests.write().await.push(url.to_string());

        if self.failing.read().await.contains(url.as_str()) {
            return Err(MediaError::transport(url, "mock failure"));
        }

        let body = self.body.read().await.clone();
        if body.len() as u64 > max_bytes {
            return Err(MediaError::TooLarge {
                url: url.to_string(),
                limit: max_bytes,
            });
        }

        tokio::fs::write(destination, &body)
            .await
            .map_err(|source| MediaError::Io {
                path: destination.to_path_buf(),
                source,
            })?;
        Ok(body.len() as u64)
    }
}
