//! Per-request state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::OnceLock;
use thiserror::Error;
use uuid::Uuid;

use crate::workspace::Workspace;

/// What the caller submitted.
#[derive(Debug, Clone)]
pub enum RequestSource {
    /// Template text.
    Template(String),
    /// Zip bundle carrying `template.tex` and its media.
    Archive(Vec<u8>),
}

impl RequestSource {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Template(_) => "template",
            Self::Archive(_) => "archive",
        }
    }

    /// Moves the payload out, leaving an empty payload of the same kind.
    pub(crate) fn take(&mut self) -> RequestSource {
        match self {
            Self::Template(text) => Self::Template(std::mem::take(text)),
            Self::Archive(bytes) => Self::Archive(std::mem::take(bytes)),
        }
    }
}

/// Lifecycle of a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Queued,
    Admitted,
    Running,
    Completed,
    Failed,
}

impl RequestState {
    /// Whether `self -> next` is a legal step.
    pub fn can_transition_to(&self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Queued, Admitted)
                | (Queued, Failed)
                | (Admitted, Running)
                | (Admitted, Failed)
                | (Running, Completed)
                | (Running, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid request transition from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: RequestState,
    pub to: RequestState,
}

/// One submission, from arrival to its terminal state.
///
/// Owned by the submitting flow; never shared between requests.
#[derive(Debug)]
pub struct GenerationRequest {
    id: Uuid,
    source: RequestSource,
    workspace: OnceLock<Workspace>,
    state: RequestState,
    submitted_at: DateTime<Utc>,
}

impl GenerationRequest {
    pub fn new(source: RequestSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            workspace: OnceLock::new(),
            state: RequestState::Queued,
            submitted_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> &RequestSource {
        &self.source
    }

    pub(crate) fn source_mut(&mut self) -> &mut RequestSource {
        &mut self.source
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// The assigned workspace, once there is one.
    pub fn workspace(&self) -> Option<&Workspace> {
        self.workspace.get()
    }

    /// Assigns the workspace. Only the first assignment sticks; a later one
    /// hands its argument back.
    pub fn assign_workspace(&self, workspace: Workspace) -> Result<&Workspace, Workspace> {
        self.workspace.set(workspace)?;
        Ok(self.workspace.get().expect("workspace was just set"))
    }

    /// Moves to `next` if the lifecycle allows it.
    pub fn transition_to(&mut self, next: RequestState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}
