//! Periodic purge of stale workspaces.
//!
//! The sweep runs on its own schedule and knows nothing about requests; the
//! configured maximum age is what keeps it away from live workspaces.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::WorkspaceError;
use crate::config::CleanupConfig;
use crate::metrics::WORKSPACES_SWEPT;

/// Outcome of one sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Directories deleted.
    pub removed: Vec<PathBuf>,
    /// Entries younger than the cutoff.
    pub kept: usize,
    /// Entries that could not be inspected or deleted.
    pub failed: usize,
}

/// Deletes workspace directories older than the configured age.
pub struct WorkspaceSweeper {
    root: PathBuf,
    config: CleanupConfig,
}

impl WorkspaceSweeper {
    pub fn new(root: impl Into<PathBuf>, config: CleanupConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Runs a single sweep relative to the current time.
    pub async fn sweep_once(&self) -> Result<SweepReport, WorkspaceError> {
        self.sweep_at(Utc::now()).await
    }

    async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, WorkspaceError> {
        let mut report = SweepReport::default();
        // An age chrono cannot represent is longer than any workspace can have lived.
        let Some(max_age) = i64::try_from(self.config.max_age_secs)
            .ok()
            .and_then(ChronoDuration::try_seconds)
        else {
            debug!(
                "Max age {}s is out of range, nothing is stale",
                self.config.max_age_secs
            );
            return Ok(report);
        };

        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(WorkspaceError::io("sweep.read_dir", &self.root, e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| WorkspaceError::io("sweep.next_entry", &self.root, e))?
        {
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    warn!("Cannot inspect {}: {}", path.display(), e);
                    report.failed += 1;
                    continue;
                }
            };
            if !metadata.is_dir() {
                continue;
            }
            let modified: DateTime<Utc> = match metadata.modified() {
                Ok(t) => t.into(),
                Err(e) => {
                    warn!("No modification time for {}: {}", path.display(), e);
                    report.failed += 1;
                    continue;
                }
            };

            if now - modified <= max_age {
                report.kept += 1;
                continue;
            }

            match fs::remove_dir_all(&path).await {
                Ok(()) => {
                    debug!("Swept workspace {}", path.display());
                    report.removed.push(path);
                }
                Err(e) => {
                    warn!("Failed to sweep {}: {}", path.display(), e);
                    report.failed += 1;
                }
            }
        }

        WORKSPACES_SWEPT.inc_by(report.removed.len() as u64);
        Ok(report)
    }

    /// Spawns the sweep loop; it stops when `shutdown` fires or its sender is dropped.
    pub fn spawn(self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Workspace sweeper started (root: {}, every {}s, max age {}s)",
                self.root.display(),
                self.config.interval_secs,
                self.config.max_age_secs
            );
            let mut ticker = tokio::time::interval(Duration::from_secs(self.config.interval_secs));
            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        info!("Workspace sweeper received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        match self.sweep_once().await {
                            Ok(report) if !report.removed.is_empty() => {
                                info!("Swept {} stale workspaces", report.removed.len());
                            }
                            Ok(_) => {}
                            Err(e) => warn!("Workspace sweep failed: {}", e),
                        }
                    }
                }
            }
            info!("Workspace sweeper stopped");
        })
    }
}
