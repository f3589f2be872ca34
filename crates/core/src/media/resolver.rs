//! Media marker scanning and template rewriting.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Url;
use serde::Serialize;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::MediaError;
use super::fetcher::MediaFetcher;
use crate::config::MediaConfig;
use crate::metrics::MEDIA_FETCHES_TOTAL;
use crate::workspace::{Workspace, WorkspaceError};

/// `img:<url>`, where the URL runs up to the first `}`.
static MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"img:(https?://[^}]*)").unwrap());

/// A marker whose resource could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaFailure {
    /// Position of the marker in the template, which is also its file index.
    pub index: usize,
    /// Normalized URL.
    pub url: String,
    pub reason: String,
}

/// What happened to every marker of one template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaReport {
    /// Local file names that were written.
    pub fetched: Vec<String>,
    pub failures: Vec<MediaFailure>,
}

impl MediaReport {
    /// Total number of markers seen.
    pub fn markers(&self) -> usize {
        self.fetched.len() + self.failures.len()
    }
}

/// Template text with every marker replaced by its local file name.
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    pub text: String,
    pub report: MediaReport,
}

/// Local file name assigned to the marker at `index`.
pub fn media_file_name(index: usize) -> String {
    format!("img{}.png", index)
}

/// Strips backslash escapes and decodes `&amp;`.
fn normalize_url(raw: &str) -> String {
    raw.replace('\\', "").replace("&amp;", "&")
}

/// Fetches the resources referenced by a template into its workspace.
pub struct MediaResolver {
    fetcher: Arc<dyn MediaFetcher>,
    config: MediaConfig,
}

impl MediaResolver {
    pub fn new(fetcher: Arc<dyn MediaFetcher>, config: MediaConfig) -> Self {
        Self { fetcher, config }
    }

    /// Downloads every marker's resource and rewrites the marker to `img<N>.png`.
    ///
    /// Markers are processed in order of appearance and each occurrence gets its
    /// own file, even when two markers share a URL. A failed fetch is logged and
    /// recorded on the report, and the marker is still rewritten, so the
    /// document will reference a file that does not exist. Only workspace
    /// errors are returned.
    pub async fn resolve(
        &self,
        template: &str,
        workspace: &Workspace,
    ) -> Result<ResolvedTemplate, WorkspaceError> {
        let markers: Vec<(Range<usize>, &str)> = MARKER
            .captures_iter(template)
            .filter_map(|caps| Some((caps.get(0)?.range(), caps.get(1)?.as_str())))
            .collect();

        let mut report = MediaReport::default();
        if markers.is_empty() {
            return Ok(ResolvedTemplate {
                text: template.to_string(),
                report,
            });
        }

        workspace.ensure_created().await?;
        info!(
            "Resolving {} media markers for workspace {}",
            markers.len(),
            workspace.id()
        );

        let mut text = String::with_capacity(template.len());
        let mut cursor = 0;

        for (index, (span, raw_url)) in markers.into_iter().enumerate() {
            let local = media_file_name(index);
            let url = normalize_url(raw_url);

            match self.fetch_one(index, &url, workspace, &local).await {
                Ok(bytes) => {
                    debug!("Fetched {} ({} bytes) as {}", url, bytes, local);
                    MEDIA_FETCHES_TOTAL.with_label_values(&["ok"]).inc();
                    report.fetched.push(local.clone());
                }
                Err(e) => {
                    warn!("Media {} could not be fetched, {} will be missing: {}", url, local, e);
                    MEDIA_FETCHES_TOTAL.with_label_values(&["failed"]).inc();
                    report.failures.push(MediaFailure {
                        index,
                        url,
                        reason: e.to_string(),
                    });
                }
            }

            text.push_str(&template[cursor..span.start]);
            text.push_str(&local);
            cursor = span.end;
        }
        text.push_str(&template[cursor..]);

        Ok(ResolvedTemplate { text, report })
    }

    async fn fetch_one(
        &self,
        index: usize,
        url: &str,
        workspace: &Workspace,
        local: &str,
    ) -> Result<u64, MediaError> {
        if index >= self.config.max_fetches {
            return Err(MediaError::LimitExceeded {
                limit: self.config.max_fetches,
            });
        }
        let parsed = Url::parse(url).map_err(|e| MediaError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        self.fetcher
            .fetch(&parsed, &workspace.file(local), self.config.max_bytes)
            .await
    }
}
