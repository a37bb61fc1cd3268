//! Scratch file utilities.
//!
//! Intermediate artifacts (uploaded sources, transcoded outputs) live in a
//! work directory and must be removed on every exit path. [`ScratchFile`]
//! owns such a path and removes it when dropped; [`remove_scratch_file`] is
//! the explicit, idempotent async variant.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::error::MediaResult;

/// What a cleanup call found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    Removed,
    /// The file did not exist; treated as success.
    AlreadyGone,
}

/// Remove a scratch file.
///
/// Removing a path that is already gone is not an error, so calling this
/// twice for the same path succeeds both times.
pub async fn remove_scratch_file(path: impl AsRef<Path>) -> MediaResult<CleanupOutcome> {
    let path = path.as_ref();
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed scratch file {}", path.display());
            Ok(CleanupOutcome::Removed)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Scratch file already gone: {}", path.display());
            Ok(CleanupOutcome::AlreadyGone)
        }
        Err(e) => Err(e.into()),
    }
}

/// Build a collision-free path `{dir}/{prefix}-{millis}-{uuid}.{ext}`.
pub fn unique_scratch_path(dir: impl AsRef<Path>, prefix: &str, extension: &str) -> PathBuf {
    let millis = chrono::Utc::now().timestamp_millis();
    let token = uuid::Uuid::new_v4().simple();
    dir.as_ref()
        .join(format!("{}-{}-{}.{}", prefix, millis, token, extension))
}

/// A file removed when the guard is dropped unless it is kept.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    armed: bool,
}

impl ScratchFile {
    /// Take ownership of `path` for cleanup.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the file from cleanup and return its path.
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }

    /// Remove the file now instead of on drop.
    pub async fn remove(mut self) -> MediaResult<CleanupOutcome> {
        self.armed = false;
        remove_scratch_file(&self.path).await
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed scratch file {} on drop", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove scratch file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_remove_twice_reports_success() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed.mp4");
        fs::write(&path, b"data").await.unwrap();

        assert_eq!(remove_scratch_file(&path).await.unwrap(), CleanupOutcome::Removed);
        assert_eq!(
            remove_scratch_file(&path).await.unwrap(),
            CleanupOutcome::AlreadyGone
        );
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_guard_removes_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("source.mp4");
        fs::write(&path, b"data").await.unwrap();

        {
            let guard = ScratchFile::new(&path);
            assert_eq!(guard.path(), path.as_path());
        }

        assert!(!path.exists(), "guard should delete the file");
    }

    #[tokio::test]
    async fn test_guard_keep_disarms() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keep.mp4");
        fs::write(&path, b"data").await.unwrap();

        let kept = ScratchFile::new(&path).keep();
        assert_eq!(kept, path);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_guard_drop_on_missing_file_is_silent() {
        let dir = TempDir::new().unwrap();
        let guard = ScratchFile::new(dir.path().join("never-written.mp4"));
        drop(guard);
    }

    #[test]
    fn test_unique_paths_do_not_collide() {
        let a = unique_scratch_path("/tmp/work", "processed", "mp4");
        let b = unique_scratch_path("/tmp/work", "processed", "mp4");
        assert_ne!(a, b);
        assert!(a.starts_with("/tmp/work"));
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("mp4"));
        assert!(a
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap()
            .starts_with("processed-"));
    }
}
