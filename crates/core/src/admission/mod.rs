//! Admission control for generation pipelines.
//!
//! At most `capacity` requests hold a slot at any time. Requests arriving
//! while every slot is taken wait in FIFO order and are promoted the moment
//! a slot frees up; there is no polling. All state is owned by one
//! `AdmissionCoordinator` task and mutated only through its channel.

mod coordinator;
mod error;
mod handle;
mod types;

pub use coordinator::{create_admission_system, AdmissionCoordinator};
pub use error::AdmissionError;
pub use handle::{AdmissionHandle, AdmissionPermit};
pub use types::{AdmissionRoute, AdmissionStatus};
