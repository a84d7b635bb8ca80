//! File replacement helpers shared by the descriptor source and cursor store

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{CastError, Result};

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn write_atomic_blocking(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut tmp = NamedTempFile::new_in(parent_dir(path))?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

/// Replace `path` with `contents` via a uniquely named sibling temp file
///
/// The temp file is synced before it is renamed over `path`, so readers see
/// either the old contents or the new ones, never a mix. Concurrent writers
/// each get their own temp file; the last rename wins.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let path = path.to_path_buf();
    let contents = contents.to_vec();

    tokio::task::spawn_blocking(move || write_atomic_blocking(&path, &contents))
        .await
        .map_err(|e| CastError::Internal(format!("file write task failed: {}", e)))??;
    Ok(())
}
