//! Extraction of archive submissions into a workspace.

use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};

use zip::ZipArchive;

use super::error::{ArchiveError, WorkspaceError};
use super::manager::{Workspace, SOURCE_FILE_NAME};

/// Unpacks a zip bundle into the workspace and returns the template text.
///
/// The bundle must carry `template.tex` at its root. Entries that would land
/// outside the workspace are rejected, and extraction stops once the total
/// uncompressed size passes `max_bytes`.
pub async fn extract_archive(
    workspace: &Workspace,
    bytes: Vec<u8>,
    max_bytes: u64,
) -> Result<String, ArchiveError> {
    workspace.ensure_created().await?;
    let target = workspace.dir().to_path_buf();

    tokio::task::spawn_blocking(move || extract_into(&target, bytes, max_bytes))
        .await
        .map_err(|e| ArchiveError::Invalid(format!("extraction task failed: {}", e)))?
}

fn extract_into(target: &Path, bytes: Vec<u8>, max_bytes: u64) -> Result<String, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut written: u64 = 0;

    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        let relative = sanitize_entry_path(entry.name())?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let destination = target.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&destination)
                .map_err(|e| WorkspaceError::io("archive.create_dir", &destination, e))?;
            continue;
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| WorkspaceError::io("archive.create_parent", parent, e))?;
        }

        let mut output = File::create(&destination)
            .map_err(|e| WorkspaceError::io("archive.create_file", &destination, e))?;
        // Bounded by what is left of the budget, so a lying header cannot overshoot it.
        let remaining = max_bytes.saturating_sub(written);
        let mut limited = entry.take(remaining + 1);
        let copied = io::copy(&mut limited, &mut output)
            .map_err(|e| WorkspaceError::io("archive.copy", &destination, e))?;
        if copied > remaining {
            return Err(ArchiveError::TooLarge { limit: max_bytes });
        }
        written += copied;
    }

    let source = target.join(SOURCE_FILE_NAME);
    if !source.is_file() {
        return Err(ArchiveError::MissingTemplate {
            expected: SOURCE_FILE_NAME,
        });
    }
    let raw = fs::read(&source).map_err(|e| WorkspaceError::io("archive.read", &source, e))?;
    String::from_utf8(raw).map_err(|_| ArchiveError::TemplateEncoding)
}

fn sanitize_entry_path(entry: &str) -> Result<PathBuf, ArchiveError> {
    let path = Path::new(entry);
    if path.is_absolute() {
        return Err(ArchiveError::UnsafeEntry {
            entry: entry.to_string(),
        });
    }

    let mut sanitized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => sanitized.push(segment),
            Component::CurDir => {}
            _ => {
                return Err(ArchiveError::UnsafeEntry {
                    entry: entry.to_string(),
                })
            }
        }
    }

    Ok(sanitized)
}
