//! Request-scoped directory for transient rasters and decrypted copies.
//!
//! Every extraction owns exactly one [`ArtifactDir`]. Strategies that shell
//! out write their page images here; [`ArtifactDir::cleanup`] removes the
//! directory when the extraction ends. Cleanup also runs from `Drop`, so a
//! panic inside a strategy leaves nothing behind.

use crate::error::AadhaarQrError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// The artifact directory for one extraction.
///
/// Always a fresh `aadhaar-qr-*` directory: under the configured `work_dir`
/// when there is one, otherwise under the system temp directory. Only files
/// written by this extraction are ever listed or deleted.
#[derive(Debug)]
pub struct ArtifactDir {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl ArtifactDir {
    /// Create a fresh directory inside `work_dir` (created if missing) or
    /// inside the system temp directory.
    pub fn create(work_dir: Option<&Path>) -> Result<Self, AadhaarQrError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("aadhaar-qr-");

        let temp = match work_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AadhaarQrError::Internal(format!(
                        "Failed to create work directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
                builder.tempdir_in(parent)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| AadhaarQrError::Internal(format!("tempdir: {e}")))?;

        debug!("Artifact directory: {}", temp.path().display());
        Ok(Self {
            path: temp.path().to_path_buf(),
            dir: Some(temp),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a named file inside the directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Files named `{prefix}.{ext}`, `{prefix}-N.{ext}` or `{prefix}_N.{ext}`,
    /// ordered by page number `N` (an unnumbered file sorts first).
    ///
    /// Numeric ordering matters: `page_10` must come after `page_9`.
    pub fn page_files(&self, prefix: &str, ext: &str) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot list {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        let mut numbered: Vec<(u64, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter_map(|path| page_number(&path, prefix, ext).map(|n| (n, path)))
            .collect();
        numbered.sort();
        numbered.into_iter().map(|(_, path)| path).collect()
    }

    /// Delete the directory and everything in it. Idempotent.
    ///
    /// Deletion failures are logged and swallowed so they never replace the
    /// extraction's own result. Returns the number of files removed.
    pub fn cleanup(&mut self) -> usize {
        let Some(dir) = self.dir.take() else {
            return 0;
        };

        let removed = std::fs::read_dir(dir.path())
            .map(|entries| entries.filter_map(|e| e.ok()).filter(|e| e.path().is_file()).count())
            .unwrap_or(0);

        match dir.close() {
            Ok(()) => {
                debug!("Cleanup removed {} file(s) from {}", removed, self.path.display());
                removed
            }
            Err(e) => {
                warn!(
                    "Warning: Could not clean up temp files in {}: {}",
                    self.path.display(),
                    e
                );
                0
            }
        }
    }
}

impl Drop for ArtifactDir {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn page_number(path: &Path, prefix: &str, ext: &str) -> Option<u64> {
    if !path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
    {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let rest = stem.strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some(0);
    }
    let digits = rest.strip_prefix('-').or_else(|| rest.strip_prefix('_'))?;
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn page_files_sorts_numerically_and_filters_prefix() {
        let dir = ArtifactDir::create(None).unwrap();
        for name in [
            "gs-page_10.png",
            "gs-page_2.png",
            "gs-page_1.png",
            "gs-pages_3.png",
            "gs-page_4.jpg",
            "poppler-page-1.png",
        ] {
            touch(dir.path(), name);
        }
        assert_eq!(
            names(&dir.page_files("gs-page", "png")),
            ["gs-page_1.png", "gs-page_2.png", "gs-page_10.png"]
        );
    }

    #[test]
    fn page_files_handles_unnumbered_and_padded() {
        let dir = ArtifactDir::create(None).unwrap();
        touch(dir.path(), "magick-page-1.png");
        touch(dir.path(), "magick-page.png");
        touch(dir.path(), "poppler-page-02.png");
        touch(dir.path(), "poppler-page-11.png");
        assert_eq!(dir.page_files("magick-page", "png").len(), 2);
        assert!(dir.page_files("magick-page", "png")[0].ends_with("magick-page.png"));
        assert!(dir.page_files("poppler-page", "png")[0].ends_with("poppler-page-02.png"));
    }

    #[test]
    fn leftovers_in_work_dir_are_neither_listed_nor_deleted() {
        let work = tempfile::tempdir().unwrap();
        // A page left behind by an earlier run that never cleaned up.
        touch(work.path(), "poppler-page-01.png");
        touch(work.path(), "eaadhaar.pdf");

        let mut dir = ArtifactDir::create(Some(work.path())).unwrap();
        assert_ne!(dir.path(), work.path());
        assert!(dir.path().starts_with(work.path()));
        assert!(dir.page_files("poppler-page", "png").is_empty());

        touch(dir.path(), "poppler-page-1.png");
        assert_eq!(names(&dir.page_files("poppler-page", "png")), ["poppler-page-1.png"]);

        assert_eq!(dir.cleanup(), 1);
        assert!(work.path().join("poppler-page-01.png").is_file());
        assert!(work.path().join("eaadhaar.pdf").is_file());
    }

    #[test]
    fn cleanup_removes_directory_and_is_idempotent() {
        let work = tempfile::tempdir().unwrap();
        let mut dir = ArtifactDir::create(Some(work.path())).unwrap();
        touch(dir.path(), "a.png");
        touch(dir.path(), "decrypted.pdf");
        assert_eq!(dir.cleanup(), 2);
        assert_eq!(dir.cleanup(), 0);
        assert!(!dir.path().exists());
        // The caller's directory itself survives, empty.
        assert!(work.path().is_dir());
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[test]
    fn drop_cleans_up() {
        let work = tempfile::tempdir().unwrap();
        {
            let dir = ArtifactDir::create(Some(work.path())).unwrap();
            touch(dir.path(), "page-1.png");
        }
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[test]
    fn default_temp_dir_is_removed() {
        let path = {
            let dir = ArtifactDir::create(None).unwrap();
            touch(dir.path(), "page-1.png");
            dir.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn create_makes_missing_work_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b");
        let dir = ArtifactDir::create(Some(&nested)).unwrap();
        assert!(dir.path().is_dir());
        assert_eq!(dir.path().parent(), Some(nested.as_path()));
        assert_eq!(dir.file("x.png"), dir.path().join("x.png"));
    }

    #[test]
    fn each_request_gets_its_own_directory() {
        let work = tempfile::tempdir().unwrap();
        let a = ArtifactDir::create(Some(work.path())).unwrap();
        let b = ArtifactDir::create(Some(work.path())).unwrap();
        assert_ne!(a.path(), b.path());
    }
}
