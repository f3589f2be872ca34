//! Error types for the generation module.

use thiserror::Error;
use uuid::Uuid;

use crate::admission::AdmissionError;
use crate::workspace::{ArchiveError, WorkspaceError};

/// Fatal failures: the request produces no artifact.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Filesystem failure in the workspace or its root.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// The submitted archive could not be unpacked.
    #[error("Archive extraction failed: {0}")]
    ArchiveExtraction(ArchiveError),

    /// A typesetting pass failed, timed out, or produced no document.
    #[error("Typesetting failed on pass {pass}: {reason}")]
    TypesetFailed {
        pass: u32,
        reason: String,
        /// Tail of the engine output, when it ran to completion.
        output: Option<String>,
    },

    /// A typesetting pass was killed by a signal.
    #[error("Typesetting was interrupted on pass {pass}")]
    ToolInterrupted { pass: u32 },

    /// The admission coordinator is gone.
    #[error("Admission controller is not running")]
    AdmissionClosed,

    /// The request id is already admitted or waiting.
    #[error("Request {0} is already admitted or waiting")]
    DuplicateRequest(Uuid),
}

impl GenerationError {
    /// Stable snake_case identifier for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Workspace(_) => "workspace_io",
            Self::ArchiveExtraction(_) => "archive_extraction",
            Self::TypesetFailed { .. } => "typeset_failed",
            Self::ToolInterrupted { .. } => "tool_interrupted",
            Self::AdmissionClosed => "admission_closed",
            Self::DuplicateRequest(_) => "duplicate_request",
        }
    }

    /// Whether the failure is caused by the submitted input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ArchiveExtraction(_))
    }
}

impl From<ArchiveError> for GenerationError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Workspace(inner) => Self::Workspace(inner),
            other => Self::ArchiveExtraction(other),
        }
    }
}

impl From<AdmissionError> for GenerationError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::Closed => Self::AdmissionClosed,
            AdmissionError::Duplicate(id) => Self::DuplicateRequest(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_workspace_failure_is_workspace_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: GenerationError = ArchiveError::Workspace(WorkspaceError::Io {
            operation: "archive.copy",
            path: "/tmp/x".into(),
            source: io,
        })
        .into();
        assert_eq!(err.kind(), "workspace_io");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_bad_archive_is_client_error() {
        let err: GenerationError = ArchiveError::MissingTemplate {
            expected: "template.tex",
        }
        .into();
        assert_eq!(err.kind(), "archive_extraction");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_admission_errors_keep_their_kind() {
        let closed: GenerationError = AdmissionError::Closed.into();
        assert_eq!(closed.kind(), "admission_closed");

        let id = Uuid::new_v4();
        let duplicate: GenerationError = AdmissionError::Duplicate(id).into();
        assert!(matches!(duplicate, GenerationError::DuplicateRequest(d) if d == id));
        assert_eq!(duplicate.kind(), "duplicate_request");
        assert!(!duplicate.is_client_error());
    }
}
