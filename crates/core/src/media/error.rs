//! Error types for the media module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while fetching a single remote resource.
///
/// None of these abort a generation; the resolver turns them into
/// per-marker failures on the report.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The marker URL could not be parsed.
    #[error("Invalid media URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The HTTP client could not be built.
    #[error("Media client unavailable: {0}")]
    Client(String),

    /// Connection, TLS or body transfer failure.
    #[error("Failed to fetch {url}: {reason}")]
    Transport { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("Fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The resource is larger than the per-resource cap.
    #[error("Resource {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: u64 },

    /// The marker is past the per-template fetch cap.
    #[error("Fetch limit of {limit} resources per template reached")]
    LimitExceeded { limit: usize },

    /// Writing the fetched bytes failed.
    #[error("Failed to write media to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MediaError {
    pub fn transport(url: impl ToString, reason: impl ToString) -> Self {
        Self::Transport {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
