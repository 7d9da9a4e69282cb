//! Atomic file replacement.
//!
//! Writes go to a hidden temporary file next to the target, are flushed to
//! disk, and are then renamed over the target. Readers never observe a
//! partially written file.

use sentibot_core::{Result, SentibotError};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Writes `contents` to `path` atomically, creating the parent directory.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| SentibotError::io(format!("Path has no parent directory: {}", path.display())))?;
    fs::create_dir_all(parent).await?;

    let tmp_path = temp_path_for(path)?;
    let result = async {
        let mut tmp_file = fs::File::create(&tmp_path).await?;
        tmp_file.write_all(contents).await?;
        tmp_file.sync_all().await?;
        drop(tmp_file);
        fs::rename(&tmp_path, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }

    Ok(())
}

/// Temporary sibling used while writing `path`: `dir/.name.tmp`.
fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let parent = path
        .parent()
        .ok_or_else(|| SentibotError::io(format!("Path has no parent directory: {}", path.display())))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| SentibotError::io(format!("Path has no file name: {}", path.display())))?;

    Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
}
