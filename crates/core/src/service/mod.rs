//! The two boundary operations, `submit_template` and `submit_archive`.
//!
//! A request is queued, waits for an admission slot, gets a fresh workspace,
//! has its media resolved, runs through the generation pipeline, and gives
//! its slot back whether it succeeded or not.

mod pdf_service;
mod request;

pub use pdf_service::{PdfService, ServiceOptions};
pub use request::{GenerationRequest, InvalidTransition, RequestSource, RequestState};
