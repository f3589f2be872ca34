//! Boundary-facing generation service.

use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::admission::{create_admission_system, AdmissionHandle};
use crate::config::{Config, GenerationConfig};
use crate::generation::{
    Degradation, GenerationError, GenerationPipeline, PipelineOptions, PipelineResult,
};
use crate::media::{MediaFetcher, MediaResolver};
use crate::metrics::{DEGRADATIONS_TOTAL, GENERATIONS_TOTAL, GENERATION_DURATION};
use crate::toolchain::Toolchain;
use crate::workspace::{extract_archive, WorkspaceManager};

use super::request::{GenerationRequest, RequestSource, RequestState};

/// Per-service settings not owned by any component.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Run the optimize/metadata sub-pipeline for every submission.
    pub optimize: bool,
    /// Total uncompressed bytes accepted from one archive.
    pub max_archive_bytes: u64,
}

impl From<&GenerationConfig> for ServiceOptions {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            optimize: config.optimize,
            max_archive_bytes: config.max_archive_bytes,
        }
    }
}

/// Admission-controlled template and archive submission.
pub struct PdfService {
    workspaces: WorkspaceManager,
    resolver: MediaResolver,
    pipeline: GenerationPipeline,
    admission: AdmissionHandle,
    options: ServiceOptions,
}

impl PdfService {
    /// Wires every component from `config` and spawns the admission coordinator.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        config: &Config,
        toolchain: Arc<dyn Toolchain>,
        fetcher: Arc<dyn MediaFetcher>,
    ) -> Self {
        let (admission, coordinator) =
            create_admission_system(config.generation.admission_capacity);
        tokio::spawn(coordinator.run());

        Self::from_parts(
            WorkspaceManager::new(config.paths.temporal.clone()),
            MediaResolver::new(fetcher, config.media.clone()),
            GenerationPipeline::new(toolchain, PipelineOptions::from(&config.generation)),
            admission,
            ServiceOptions::from(&config.generation),
        )
    }

    /// Assembles a service from already-built components.
    pub fn from_parts(
        workspaces: WorkspaceManager,
        resolver: MediaResolver,
        pipeline: GenerationPipeline,
        admission: AdmissionHandle,
        options: ServiceOptions,
    ) -> Self {
        Self {
            workspaces,
            resolver,
            pipeline,
            admission,
            options,
        }
    }

    pub fn admission(&self) -> &AdmissionHandle {
        &self.admission
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Generates a document from template text.
    pub async fn submit_template(&self, text: String) -> Result<PipelineResult, GenerationError> {
        self.submit(GenerationRequest::new(RequestSource::Template(text)))
            .await
    }

    /// Generates a document from a zip bundle carrying `template.tex`.
    pub async fn submit_archive(&self, bytes: Vec<u8>) -> Result<PipelineResult, GenerationError> {
        self.submit(GenerationRequest::new(RequestSource::Archive(bytes)))
            .await
    }

    /// Waits for a slot, runs the request, and releases the slot whatever the outcome.
    pub async fn submit(
        &self,
        mut request: GenerationRequest,
    ) -> Result<PipelineResult, GenerationError> {
        let id = request.id();
        info!("Request {} ({}) queued", id, request.source().kind());

        let permit = match self.admission.admit(id).await {
            Ok(permit) => permit,
            Err(e) => {
                error!("Request {} could not be admitted: {}", id, e);
                advance(&mut request, RequestState::Failed);
                GENERATIONS_TOTAL.with_label_values(&["failed"]).inc();
                return Err(e.into());
            }
        };
        advance(&mut request, RequestState::Admitted);

        let started = Instant::now();
        let outcome = self.execute(&mut request).await;
        drop(permit);

        let elapsed = started.elapsed().as_secs_f64();
        match &outcome {
            Ok(result) => {
                advance(&mut request, RequestState::Completed);
                GENERATIONS_TOTAL.with_label_values(&["completed"]).inc();
                GENERATION_DURATION
                    .with_label_values(&["completed"])
                    .observe(elapsed);
                for degradation in &result.degradations {
                    DEGRADATIONS_TOTAL
                        .with_label_values(&[degradation.kind()])
                        .inc();
                }
                info!(
                    "Request {} completed in {:.2}s: {} ({})",
                    id, elapsed, result.file_name, result.stage
                );
            }
            Err(e) => {
                advance(&mut request, RequestState::Failed);
                GENERATIONS_TOTAL.with_label_values(&["failed"]).inc();
                GENERATION_DURATION
                    .with_label_values(&["failed"])
                    .observe(elapsed);
                warn!("Request {} failed after {:.2}s ({}): {}", id, elapsed, e.kind(), e);
            }
        }

        outcome
    }

    async fn execute(
        &self,
        request: &mut GenerationRequest,
    ) -> Result<PipelineResult, GenerationError> {
        let id = request.id();
        let allocated = self.workspaces.allocate().await?;
        let workspace = match request.assign_workspace(allocated) {
            Ok(workspace) => workspace.clone(),
            Err(allocated) => {
                warn!("Request {} already had a workspace", id);
                request.workspace().cloned().unwrap_or(allocated)
            }
        };
        info!("Request {} running in {}", id, workspace.dir().display());
        advance(request, RequestState::Running);

        let template = match request.source_mut().take() {
            RequestSource::Template(text) => text,
            RequestSource::Archive(bytes) => {
                extract_archive(&workspace, bytes, self.options.max_archive_bytes).await?
            }
        };

        let resolved = self.resolver.resolve(&template, &workspace).await?;
        let mut result = self
            .pipeline
            .generate(&workspace, &resolved.text, self.options.optimize)
            .await?;

        let mut degradations: Vec<Degradation> = resolved
            .report
            .failures
            .into_iter()
            .map(Degradation::from)
            .collect();
        degradations.append(&mut result.degradations);
        result.degradations = degradations;

        Ok(result)
    }
}

fn advance(request: &mut GenerationRequest, next: RequestState) {
    if let Err(e) = request.transition_to(next) {
        error!("Request {}: {}", request.id(), e);
    }
}
