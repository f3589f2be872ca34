//! Error types for the toolchain module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running an external tool.
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// The tool binary could not be found.
    #[error("{tool} not found at path: {path}")]
    NotFound { tool: &'static str, path: PathBuf },

    /// Spawning or waiting on the process failed.
    #[error("I/O error running {tool}: {source}")]
    Io {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The process outlived its time budget and was killed.
    #[error("{tool} timed out after {secs} seconds")]
    Timeout { tool: &'static str, secs: u64 },

    /// The process exited with a non-zero status.
    #[error("{tool} exited with code {code}")]
    Failed {
        tool: &'static str,
        code: i32,
        /// Tail of the combined stdout/stderr.
        output: String,
    },

    /// The process was terminated by a signal.
    #[error("{tool} was interrupted")]
    Interrupted { tool: &'static str },
}

impl ToolchainError {
    /// Name of the tool that failed.
    pub fn tool(&self) -> &'static str {
        match self {
            Self::NotFound { tool, .. }
            | Self::Io { tool, .. }
            | Self::Timeout { tool, .. }
            | Self::Failed { tool, .. }
            | Self::Interrupted { tool } => *tool,
        }
    }

    /// Captured process output, if the process ran to completion.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Failed { output, .. } if !output.is_empty() => Some(output),
            _ => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}
