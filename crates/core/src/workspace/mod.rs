//! Workspace module: one isolated directory per request.
//!
//! - `WorkspaceManager` allocates uniquely named directories under the temp root
//! - `extract_archive` unpacks archive submissions into a workspace
//! - `WorkspaceSweeper` purges stale workspaces on a timer, independently of requests

mod archive;
mod error;
mod manager;
mod sweeper;

pub use archive::extract_archive;
pub use error::{ArchiveError, WorkspaceError};
pub use manager::{Workspace, WorkspaceManager, SOURCE_FILE_NAME};
pub use sweeper::{SweepReport, WorkspaceSweeper};
