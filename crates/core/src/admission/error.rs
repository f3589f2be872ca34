//! Error types for the admission module.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// The coordinator task has stopped.
    #[error("Admission coordinator is not running")]
    Closed,

    /// The id already holds a slot or is already waiting.
    #[error("Request {0} is already admitted or waiting")]
    Duplicate(Uuid),
}
