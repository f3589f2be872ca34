pub mod admission;
pub mod config;
pub mod generation;
pub mod media;
pub mod metrics;
pub mod service;
pub mod testing;
pub mod toolchain;
pub mod workspace;

pub use admission::{
    create_admission_system, AdmissionCoordinator, AdmissionError, AdmissionHandle,
    AdmissionPermit, AdmissionRoute, AdmissionStatus,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use generation::{
    ArtifactStage, Degradation, GenerationError, GenerationPipeline, PipelineOptions,
    PipelineResult,
};
pub use media::{HttpMediaFetcher, MediaError, MediaFetcher, MediaReport, MediaResolver};
pub use service::{GenerationRequest, PdfService, RequestSource, RequestState, ServiceOptions};
pub use toolchain::{LatexToolchain, Toolchain, ToolchainConfig, ToolchainError};
pub use workspace::{Workspace, WorkspaceError, WorkspaceManager, WorkspaceSweeper};
