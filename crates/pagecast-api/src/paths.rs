//! Work directory containment for client-supplied paths.

use std::path::{Component, Path, PathBuf};

use crate::error::{ApiError, ApiResult};

/// Resolve `candidate` against `work_dir`, rejecting anything outside it.
///
/// Relative paths are taken relative to the work directory. `..` segments
/// are refused outright, and paths that exist on disk are also checked after
/// symlink resolution. A missing file that would live inside the work
/// directory is accepted.
pub fn resolve_within(work_dir: &Path, candidate: &Path) -> ApiResult<PathBuf> {
    if candidate.as_os_str().is_empty() {
        return Err(ApiError::bad_request("file path must not be empty"));
    }
    if candidate.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(outside(candidate));
    }

    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        work_dir.join(candidate)
    };
    if !joined.starts_with(work_dir) || joined == work_dir {
        return Err(outside(candidate));
    }

    if let (Ok(real), Ok(real_root)) = (joined.canonicalize(), work_dir.canonicalize()) {
        if !real.starts_with(&real_root) {
            return Err(outside(candidate));
        }
    }

    Ok(joined)
}

fn outside(candidate: &Path) -> ApiError {
    ApiError::forbidden(format!(
        "{} is outside the work directory",
        candidate.display()
    ))
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[test]
    fn test_accepts_paths_inside() {
        let dir = tempfile::tempdir().unwrap();
        let inside = dir.path().join("processed-1.mp4");
        assert_eq!(assert_ok!(resolve_within(dir.path(), &inside)), inside);
        assert_eq!(
            resolve_within(dir.path(), Path::new("processed-1.mp4")).unwrap(),
            inside
        );
    }

    #[test]
    fn test_rejects_escapes() {
        let dir = tempfile::tempdir().unwrap();
        for bad in ["/etc/passwd", "../secret.mp4"] {
            let err = resolve_within(dir.path(), Path::new(bad)).unwrap_err();
            assert!(matches!(err, ApiError::Forbidden(_)), "{} accepted", bad);
        }
        let sneaky = dir.path().join("a/../../escape.mp4");
        assert_err!(resolve_within(dir.path(), &sneaky));
        assert_err!(resolve_within(dir.path(), dir.path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_rejects_symlink_out_of_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let target = other.path().join("target.mp4");
        std::fs::write(&target, b"data").unwrap();
        let link = dir.path().join("link.mp4");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert_err!(resolve_within(dir.path(), &link));
    }

    #[test]
    fn test_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_within(dir.path(), Path::new("")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
