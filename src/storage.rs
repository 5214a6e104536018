//! File operation handlers.
//!
//! Thin wrappers around `tokio::fs` taking already-sandboxed paths; path
//! validation is the sandbox's job, not repeated here. Filesystem errors
//! surface as typed failures so the dispatcher can pick a status without
//! inspecting `io::Error` strings.

use std::io;
use std::path::Path;
use std::time::SystemTime;
use thiserror::Error;
use tokio::fs;

use crate::clock::format_timestamp;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("not found")]
    NotFound,

    #[error("permission denied")]
    PermissionDenied,

    #[error("is a directory")]
    IsADirectory,

    #[error("not a regular file")]
    NotAFile,

    #[error("io error: {0}")]
    Io(io::Error),
}

fn classify(e: io::Error) -> FsError {
    match e.kind() {
        io::ErrorKind::NotFound => FsError::NotFound,
        io::ErrorKind::PermissionDenied => FsError::PermissionDenied,
        _ => FsError::Io(e),
    }
}

/// One entry in a directory listing.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub modified: SystemTime,
}

/// Reads a whole file. Directories are refused, not read.
pub async fn read_file(path: &Path) -> Result<Vec<u8>, FsError> {
    let meta = fs::metadata(path).await.map_err(classify)?;
    if meta.is_dir() {
        return Err(FsError::IsADirectory);
    }
    fs::read(path).await.map_err(classify)
}

/// Writes `bytes` verbatim, creating intermediate directories.
pub async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), FsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(classify)?;
    }
    fs::write(path, bytes).await.map_err(classify)
}

/// Unlinks a regular file. Anything else is refused.
pub async fn delete_file(path: &Path) -> Result<(), FsError> {
    let meta = fs::symlink_metadata(path).await.map_err(classify)?;
    if !meta.is_file() {
        return Err(FsError::NotAFile);
    }
    fs::remove_file(path).await.map_err(classify)
}

/// Lists a directory's entries with size and modification time,
/// sorted by name.
pub async fn enumerate(dir: &Path) -> Result<Vec<FileEntry>, FsError> {
    let mut reader = fs::read_dir(dir).await.map_err(classify)?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await.map_err(classify)? {
        let meta = entry.metadata().await.map_err(classify)?;
        let modified = meta.modified().map_err(classify)?;
        entries.push(FileEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            size: meta.len(),
            modified,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Formats a listing as `name - Size: <bytes> bytes - Last Modified:
/// <timestamp>` lines joined by newlines.
pub fn format_file_listing(entries: &[FileEntry]) -> String {
    entries
        .iter()
        .map(|e| {
            format!(
                "{} - Size: {} bytes - Last Modified: {}",
                e.name,
                e.size,
                format_timestamp(e.modified)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
