use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::StorageError;

/// Local working directories for uploads and produced artifacts.
///
/// Writes go to a hidden temporary file in the destination directory and are
/// renamed into place, so a reader never observes a partially written file.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(upload_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create both directories if they do not exist yet.
    pub async fn ensure_dirs(&self) -> Result<(), StorageError> {
        for dir in [&self.upload_dir, &self.output_dir] {
            fs::create_dir_all(dir)
                .await
                .map_err(|source| StorageError::CreateDir {
                    path: dir.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Persist an uploaded file under `name` and return its path.
    pub async fn save_upload(&self, name: &str, data: &[u8]) -> Result<PathBuf, StorageError> {
        write_atomic(&self.upload_dir, name, data).await
    }

    /// Persist an output artifact under `name` and return its path.
    pub async fn save_output(&self, name: &str, data: &[u8]) -> Result<PathBuf, StorageError> {
        write_atomic(&self.output_dir, name, data).await
    }

    /// Read a previously stored file back into memory.
    pub async fn read(&self, path: &Path) -> Result<Bytes, StorageError> {
        fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(|source| StorageError::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Open a stored file for streaming.
    pub async fn open(&self, path: &Path) -> Result<fs::File, StorageError> {
        fs::File::open(path)
            .await
            .map_err(|source| StorageError::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Delete regular files in both directories last modified more than
    /// `max_age` ago. Returns the number of files removed.
    ///
    /// Individual failures are logged and skipped.
    pub async fn prune_older_than(&self, max_age: Duration) -> Result<usize, StorageError> {
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut removed = 0;
        for dir in [&self.upload_dir, &self.output_dir] {
            removed += prune_dir(dir, cutoff).await?;
        }
        Ok(removed)
    }
}

async fn write_atomic(dir: &Path, name: &str, data: &[u8]) -> Result<PathBuf, StorageError> {
    let final_path = dir.join(name);
    let temp_path = dir.join(format!(".{}.tmp", name));

    if let Err(source) = fs::write(&temp_path, data).await {
        return Err(StorageError::Write {
            path: temp_path,
            source,
        });
    }

    if let Err(source) = fs::rename(&temp_path, &final_path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(StorageError::Write {
            path: final_path,
            source,
        });
    }

    debug!(path = %final_path.display(), bytes = data.len(), "Stored file");
    Ok(final_path)
}

async fn prune_dir(dir: &Path, cutoff: SystemTime) -> Result<usize, StorageError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(source) => {
            return Err(StorageError::Read {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut removed = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(source) => {
                return Err(StorageError::Read {
                    path: dir.to_path_buf(),
                    source,
                })
            }
        };

        let path = entry.path();
        let modified = match entry.metadata().await {
            Ok(meta) if meta.is_file() => meta.modified().ok(),
            Ok(_) => continue,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        if modified.is_some_and(|m| m < cutoff) {
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove expired file"),
            }
        }
    }

    Ok(removed)
}

// =============================================================================
// Tests
// =============================================================================
