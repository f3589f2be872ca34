//! Types for the admission module.

use serde::Serialize;
use uuid::Uuid;

/// How a request obtained its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionRoute {
    /// A slot was free on arrival.
    Direct,
    /// The request waited and was promoted from the head of the wait list.
    Promoted,
}

impl AdmissionRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Promoted => "promoted",
        }
    }
}

/// Point-in-time view of the coordinator state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmissionStatus {
    pub capacity: usize,
    /// Requests holding a slot, sorted by id.
    pub admitted: Vec<Uuid>,
    /// Waiting requests, head first.
    pub waiting: Vec<Uuid>,
}
