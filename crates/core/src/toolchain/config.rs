//! Configuration for the toolchain module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::PathsConfig;

/// Locations of the external binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Typesetting engine.
    pub pdflatex: PathBuf,
    /// Metadata dump/restore tool.
    pub pdftk: PathBuf,
    /// Optimizer.
    pub ghostscript: PathBuf,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self::from(&PathsConfig::default())
    }
}

impl From<&PathsConfig> for ToolchainConfig {
    fn from(paths: &PathsConfig) -> Self {
        Self {
            pdflatex: paths.pdflatex.clone(),
            pdftk: paths.pdftk.clone(),
            ghostscript: paths.ghostscript.clone(),
        }
    }
}
