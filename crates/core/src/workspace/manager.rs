//! Per-request workspace allocation.

use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use super::error::WorkspaceError;

/// File name of the materialized template inside every workspace.
pub const SOURCE_FILE_NAME: &str = "template.tex";

/// An isolated directory owned by a single request.
///
/// The directory is not created until the first write. Deleting it is left
/// to the periodic sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    id: Uuid,
    dir: PathBuf,
}

impl Workspace {
    /// Identifier the directory is named after.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Workspace directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a file directly inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Path of the template source file.
    pub fn source_path(&self) -> PathBuf {
        self.file(SOURCE_FILE_NAME)
    }

    /// Creates the directory if it does not exist yet.
    pub async fn ensure_created(&self) -> Result<(), WorkspaceError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| WorkspaceError::io("create_dir", &self.dir, e))
    }

    /// Writes a file into the workspace, creating the directory on demand.
    pub async fn write_file(
        &self,
        name: &str,
        contents: impl AsRef<[u8]>,
    ) -> Result<PathBuf, WorkspaceError> {
        self.ensure_created().await?;
        let path = self.file(name);
        fs::write(&path, contents)
            .await
            .map_err(|e| WorkspaceError::io("write", &path, e))?;
        Ok(path)
    }
}

/// Hands out uniquely named workspaces under a fixed root.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    /// Creates a manager rooted at the configured temp directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory all workspaces live under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocates a fresh workspace.
    ///
    /// The root is created if missing; the workspace directory itself is not.
    /// Identifiers are random, and a path already present on disk is never reused.
    pub async fn allocate(&self) -> Result<Workspace, WorkspaceError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| WorkspaceError::RootUnavailable {
                path: self.root.clone(),
                source,
            })?;

        loop {
            let id = Uuid::new_v4();
            let dir = self.root.join(id.to_string());
            let taken = fs::try_exists(&dir)
                .await
                .map_err(|e| WorkspaceError::io("probe", &dir, e))?;
            if !taken {
                tracing::debug!("Allocated workspace {}", dir.display());
                return Ok(Workspace { id, dir });
            }
        }
    }
}
