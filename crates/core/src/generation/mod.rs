//! Generation pipeline: template text in, document artifact out.
//!
//! Stages run in order inside the request's workspace:
//! 1. materialize the template as `template.tex`
//! 2. typeset it a fixed number of passes (fatal on failure)
//! 3. optionally dump metadata, optimize, and restore metadata (degrade on failure)
//!
//! The stage reached is reported as an `ArtifactStage`, which owns the
//! artifact's file name.

mod error;
mod pipeline;
mod types;

pub use error::GenerationError;
pub use pipeline::{GenerationPipeline, METADATA_FILE_NAME};
pub use types::{ArtifactStage, Degradation, PipelineOptions, PipelineResult};
