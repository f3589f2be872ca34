//! Types for the generation module.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::media::MediaFailure;

/// How far an artifact got through the post-processing stages.
///
/// Each stage has its own canonical file name, so the name alone says what
/// was done to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStage {
    /// Raw typesetting output.
    Typeset,
    /// Rewritten by the optimizer.
    Optimized,
    /// Optimized, with the original metadata restored.
    Restored,
}

impl ArtifactStage {
    /// File name prefix that marks this stage.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Typeset => "",
            Self::Optimized => "final-",
            Self::Restored => "patched-final-",
        }
    }

    /// Canonical file name of the artifact for a source base name.
    pub fn file_name(&self, base: &str) -> String {
        format!("{}{}.pdf", self.prefix(), base)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Typeset => "typeset",
            Self::Optimized => "optimized",
            Self::Restored => "restored",
        }
    }
}

impl std::fmt::Display for ArtifactStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal problem that lowered the quality of a successful result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// A media marker's resource is missing from the workspace.
    MediaFetchFailed {
        index: usize,
        url: String,
        reason: String,
    },
    /// The optimizer failed; the raw typeset artifact was kept.
    OptimizationDegraded { reason: String },
    /// Metadata could not be restored onto the optimized artifact.
    MetadataRestoreUncertain { reason: String },
}

impl Degradation {
    /// Stable snake_case identifier.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MediaFetchFailed { .. } => "media_fetch_failed",
            Self::OptimizationDegraded { .. } => "optimization_degraded",
            Self::MetadataRestoreUncertain { .. } => "metadata_restore_uncertain",
        }
    }
}

impl From<MediaFailure> for Degradation {
    fn from(failure: MediaFailure) -> Self {
        Self::MediaFetchFailed {
            index: failure.index,
            url: failure.url,
            reason: failure.reason,
        }
    }
}

/// The terminal artifact of one generation.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Absolute location of the artifact inside the workspace.
    pub artifact: PathBuf,
    /// File name of the artifact.
    pub file_name: String,
    pub stage: ArtifactStage,
    pub degradations: Vec<Degradation>,
}

impl PipelineResult {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// Settings for a `GenerationPipeline`.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Typesetting passes per generation.
    pub passes: u32,
    /// Bound for a single typesetting pass.
    pub timeout: Duration,
    /// Bound for metadata dump, optimization and metadata restore.
    pub tool_timeout: Duration,
    /// Report the restored artifact name even when restoring failed.
    pub legacy_restore_naming: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

impl From<&GenerationConfig> for PipelineOptions {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            passes: config.typeset_passes,
            timeout: Duration::from_secs(config.timeout_secs),
            tool_timeout: Duration::from_secs(config.tool_timeout_secs),
            legacy_restore_naming: config.legacy_restore_naming,
        }
    }
}
