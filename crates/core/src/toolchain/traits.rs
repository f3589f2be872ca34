//! Trait definitions for the toolchain module.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use super::error::ToolchainError;
use super::types::ToolRun;

/// The external tools that turn a template into an optimized document.
///
/// File arguments other than the typesetting source are names relative to
/// `workdir`, which is also the working directory of the process.
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Returns the name of this toolchain implementation.
    fn name(&self) -> &str;

    /// Runs one typesetting pass over `source`, writing output next to it.
    async fn typeset(&self, source: &Path, timeout: Duration) -> Result<ToolRun, ToolchainError>;

    /// Dumps the metadata of `input` into `metadata_file`.
    async fn dump_metadata(
        &self,
        workdir: &Path,
        input: &str,
        metadata_file: &str,
        timeout: Duration,
    ) -> Result<ToolRun, ToolchainError>;

    /// Rewrites `input` into a smaller, compatibility-levelled `output`.
    async fn optimize(
        &self,
        workdir: &Path,
        input: &str,
        output: &str,
        timeout: Duration,
    ) -> Result<ToolRun, ToolchainError>;

    /// Applies `metadata_file` to `input`, producing `output`.
    async fn restore_metadata(
        &self,
        workdir: &Path,
        input: &str,
        metadata_file: &str,
        output: &str,
        timeout: Duration,
    ) -> Result<ToolRun, ToolchainError>;

    /// Checks that every tool can be spawned.
    async fn validate(&self) -> Result<(), ToolchainError>;
}
