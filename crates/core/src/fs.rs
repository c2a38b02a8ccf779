//! Atomic file output.
//!
//! A document is written to a temporary file in the destination directory and
//! renamed over the target once fully flushed, so readers never observe a
//! partially written artifact. If anything fails before the rename, the
//! temporary file is removed and the previous target (if any) is untouched.

use crate::error::{AppError, AppResult};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write raw bytes to a file.
///
/// Creates parent directories if they don't exist.
pub fn atomic_write(path: &Path, data: &[u8]) -> AppResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    std::fs::create_dir_all(&parent)?;

    let mut tmp = NamedTempFile::new_in(&parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;

    tmp.persist(path)
        .map_err(|e| AppError::Io(e.error))?;

    tracing::debug!("Wrote {} bytes to {:?}", data.len(), path);
    Ok(())
}

/// Atomically write a string to a file.
pub fn atomic_write_str(path: &Path, content: &str) -> AppResult<()> {
    atomic_write(path, content.as_bytes())
}
