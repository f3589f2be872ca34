//! Error types for the workspace module.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while allocating or writing into a workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The configured temp root does not exist and could not be created.
    #[error("Workspace root unavailable: {path}: {source}")]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A filesystem operation inside a workspace failed.
    #[error("Workspace I/O failed during {operation} on {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceError {
    pub(crate) fn io(operation: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Errors raised while unpacking an archive submission.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The bytes are not a readable zip archive.
    #[error("Invalid archive: {0}")]
    Invalid(String),

    /// An entry would escape the workspace.
    #[error("Unsafe archive entry: {entry}")]
    UnsafeEntry { entry: String },

    /// The archive has no template at its root.
    #[error("Archive does not contain {expected}")]
    MissingTemplate { expected: &'static str },

    /// The template is not valid UTF-8.
    #[error("Archive template is not valid UTF-8")]
    TemplateEncoding,

    /// Uncompressed content exceeds the configured cap.
    #[error("Archive expands beyond {limit} bytes")]
    TooLarge { limit: u64 },

    /// Writing extracted entries failed.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Invalid(err.to_string())
    }
}
