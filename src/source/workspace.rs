//! Temporary file lifecycle
//!
//! Every file a request touches on disk is owned by a [`TempFile`] guard and
//! removed when the guard drops, on success, error and panic paths alike.
//! Removal is best-effort: failures are logged, never returned.

use crate::error::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Shared temp directory that hands out collision-free paths.
///
/// Cheap to clone; concurrent requests share one workspace and rely only on
/// name uniqueness, never on locking.
#[derive(Debug, Clone)]
pub struct TempWorkspace {
    root: PathBuf,
}

impl TempWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Generate a fresh path under the root: `<prefix>-<nanos>-<uuid>.<ext>`.
    /// Nothing is created on disk.
    pub fn unique_path(&self, prefix: &str, extension: &str) -> PathBuf {
        let nanos = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default();
        let id = uuid::Uuid::new_v4().simple();
        self.root
            .join(format!("{}-{}-{}.{}", prefix, nanos, id, extension))
    }

    /// Reserve a unique path for a file some other party will create
    /// (e.g. an external tool's output). The guard removes it if it appears.
    pub fn allocate(&self, prefix: &str, extension: &str) -> Result<TempFile> {
        std::fs::create_dir_all(&self.root)?;
        Ok(TempFile::adopt(self.unique_path(prefix, extension)))
    }

    /// Write `data` to a new unique file. Fails rather than overwrite.
    pub fn write(&self, prefix: &str, extension: &str, data: &[u8]) -> Result<TempFile> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.unique_path(prefix, extension);
        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        // Guard before writing so a failed write still cleans up
        let guard = TempFile::adopt(path);
        file.write_all(data)?;
        file.flush()?;
        Ok(guard)
    }
}

/// Owns one temporary path and deletes it exactly once, on drop.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    /// Take ownership of an existing (or future) temporary path
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file into memory
    pub fn read(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.path)?)
    }

    /// Delete now instead of at end of scope
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed temp file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::trace!(path = %self.path.display(), "temp file already gone")
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove temp file")
            }
        }
    }
}
