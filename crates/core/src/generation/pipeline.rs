//! Generation pipeline implementation.

use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::metrics::TYPESET_PASSES;
use crate::toolchain::{Toolchain, ToolchainError};
use crate::workspace::{Workspace, WorkspaceError, SOURCE_FILE_NAME};

use super::error::GenerationError;
use super::types::{ArtifactStage, Degradation, PipelineOptions, PipelineResult};

/// Side file the metadata dump is written to.
pub const METADATA_FILE_NAME: &str = "metadata";

/// Turns template text into a document inside a workspace.
///
/// Typesetting failures are fatal. Optimization and metadata restoration
/// failures only degrade the result. The workspace is never removed here.
pub struct GenerationPipeline {
    toolchain: Arc<dyn Toolchain>,
    options: PipelineOptions,
}

impl GenerationPipeline {
    /// Creates a new pipeline.
    pub fn new(toolchain: Arc<dyn Toolchain>, options: PipelineOptions) -> Self {
        Self { toolchain, options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Materializes, typesets and optionally optimizes `template`.
    pub async fn generate(
        &self,
        workspace: &Workspace,
        template: &str,
        optimize: bool,
    ) -> Result<PipelineResult, GenerationError> {
        let source = workspace.write_file(SOURCE_FILE_NAME, template).await?;
        let base = output_base(&source);

        self.typeset(workspace, &source).await?;

        let raw = workspace.file(&ArtifactStage::Typeset.file_name(&base));
        let produced = fs::try_exists(&raw)
            .await
            .map_err(|e| WorkspaceError::Io {
                operation: "probe_output",
                path: raw.clone(),
                source: e,
            })?;
        if !produced {
            return Err(GenerationError::TypesetFailed {
                pass: self.options.passes,
                reason: format!("no {} was produced", raw.display()),
                output: None,
            });
        }

        let mut degradations = Vec::new();
        let stage = if optimize {
            self.optimize(workspace, &base, &mut degradations).await
        } else {
            ArtifactStage::Typeset
        };

        let file_name = stage.file_name(&base);
        info!(
            "Workspace {} produced {} ({} degradations)",
            workspace.id(),
            file_name,
            degradations.len()
        );

        Ok(PipelineResult {
            artifact: workspace.file(&file_name),
            file_name,
            stage,
            degradations,
        })
    }

    /// Runs every typesetting pass; the first failing pass aborts the rest.
    async fn typeset(&self, workspace: &Workspace, source: &Path) -> Result<(), GenerationError> {
        for pass in 1..=self.options.passes {
            debug!(
                "Workspace {}: typesetting pass {}/{}",
                workspace.id(),
                pass,
                self.options.passes
            );
            match self.toolchain.typeset(source, self.options.timeout).await {
                Ok(run) => {
                    TYPESET_PASSES.with_label_values(&["success"]).inc();
                    debug!("Pass {} finished in {:?}", pass, run.elapsed);
                }
                Err(e) => {
                    TYPESET_PASSES.with_label_values(&["failed"]).inc();
                    warn!(
                        "Workspace {}: typesetting pass {} failed: {}",
                        workspace.id(),
                        pass,
                        e
                    );
                    return Err(typeset_error(pass, e));
                }
            }
        }
        Ok(())
    }

    /// Dump metadata, optimize, restore metadata. Returns the stage reached.
    async fn optimize(
        &self,
        workspace: &Workspace,
        base: &str,
        degradations: &mut Vec<Degradation>,
    ) -> ArtifactStage {
        let workdir = workspace.dir();
        let timeout = self.options.tool_timeout;
        let raw = ArtifactStage::Typeset.file_name(base);
        let optimized = ArtifactStage::Optimized.file_name(base);
        let restored = ArtifactStage::Restored.file_name(base);

        let dumped = match self
            .toolchain
            .dump_metadata(workdir, &raw, METADATA_FILE_NAME, timeout)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("Workspace {}: metadata dump failed: {}", workspace.id(), e);
                Err(format!("metadata dump failed: {}", e))
            }
        };

        let optimize_result = self
            .toolchain
            .optimize(workdir, &raw, &optimized, timeout)
            .await
            .map_err(|e| e.to_string());
        let optimize_result = match optimize_result {
            Ok(_) if !workspace.file(&optimized).is_file() => {
                Err(format!("optimizer produced no {}", optimized))
            }
            other => other.map(|_| ()),
        };
        if let Err(reason) = optimize_result {
            warn!(
                "Workspace {}: optimization failed, keeping {}: {}",
                workspace.id(),
                raw,
                reason
            );
            degradations.push(Degradation::OptimizationDegraded { reason });
            return ArtifactStage::Typeset;
        }

        let restore_result = match dumped {
            Ok(()) => self
                .toolchain
                .restore_metadata(workdir, &optimized, METADATA_FILE_NAME, &restored, timeout)
                .await
                .map_err(|e| e.to_string())
                .and_then(|_| {
                    if workspace.file(&restored).is_file() {
                        Ok(())
                    } else {
                        Err(format!("metadata restore produced no {}", restored))
                    }
                }),
            Err(reason) => Err(reason),
        };

        match restore_result {
            Ok(()) => ArtifactStage::Restored,
            Err(reason) => {
                warn!(
                    "Workspace {}: metadata not restored onto {}: {}",
                    workspace.id(),
                    optimized,
                    reason
                );
                degradations.push(Degradation::MetadataRestoreUncertain { reason });
                if self.options.legacy_restore_naming {
                    ArtifactStage::Restored
                } else {
                    ArtifactStage::Optimized
                }
            }
        }
    }
}

/// Source file name without its extension.
fn output_base(source: &Path) -> String {
    source
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "template".to_string())
}

fn typeset_error(pass: u32, err: ToolchainError) -> GenerationError {
    if err.is_interrupted() {
        return GenerationError::ToolInterrupted { pass };
    }
    GenerationError::TypesetFailed {
        pass,
        reason: err.to_string(),
        output: err.output().map(str::to_string),
    }
}
