/*!
Local filesystem archive store.
*/

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::ArchiveStore;
use crate::{Result, SnapvaultError};

/// Local filesystem archive store
///
/// Each write goes to a temporary file in the target directory, is flushed to
/// disk, and is then renamed over the destination. The rename is atomic on
/// the same filesystem, so readers never observe a partial archive. The
/// directory (and any missing parents) is created on first write.
///
/// # Example
/// ```rust,no_run
/// use snapvault_core::{ArchiveStore, LocalArchiveStore};
///
/// let store = LocalArchiveStore::new("/var/backups/snapvault");
/// store.write_atomic("backup-latest.json", b"{}")?;
/// # Ok::<(), snapvault_core::SnapvaultError>(())
/// ```
#[derive(Debug, Clone)]
pub struct LocalArchiveStore {
    dir: PathBuf,
}

impl LocalArchiveStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Ensure the archive directory exists, creating it if necessary
    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            SnapvaultError::write(&self.dir, format!("failed to create directory: {e}"))
        })
    }

    /// Flush the directory entry so the rename survives a crash
    #[cfg(unix)]
    fn sync_dir(&self) {
        if let Err(e) = fs::File::open(&self.dir).and_then(|dir| dir.sync_all()) {
            debug!(dir = %self.dir.display(), error = %e, "Directory sync failed");
        }
    }

    #[cfg(not(unix))]
    fn sync_dir(&self) {}
}

impl ArchiveStore for LocalArchiveStore {
    fn write_atomic(&self, name: &str, data: &[u8]) -> Result<PathBuf> {
        let target = self.dir.join(name);
        self.ensure_dir()?;

        let mut temp = NamedTempFile::new_in(&self.dir).map_err(|e| {
            SnapvaultError::write(&target, format!("failed to create temporary file: {e}"))
        })?;

        temp.write_all(data)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| SnapvaultError::write(&target, e.to_string()))?;

        // On failure the temporary file is dropped and removed.
        temp.persist(&target).map_err(|e| {
            SnapvaultError::write(&target, format!("failed to move archive into place: {}", e.error))
        })?;
        self.sync_dir();

        debug!(path = %target.display(), bytes = data.len(), "Wrote archive file");
        Ok(target)
    }

    fn location(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_nested_directories() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("backups/nested/deeper");
        let store = LocalArchiveStore::new(&dir);

        let path = store.write_atomic("backup-2024-01-05.json", b"{}").unwrap();

        assert_eq!(path, dir.join("backup-2024-01-05.json"));
        assert_eq!(fs::read(&path).unwrap(), b"{}");
        assert_eq!(store.location(), dir.as_path());
    }

    #[test]
    fn test_existing_directory_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalArchiveStore::new(temp_dir.path());

        store.write_atomic("a.json", b"1").unwrap();
        store.write_atomic("b.json", b"2").unwrap();
    }

    #[test]
    fn test_overwrite_replaces_content_in_full() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalArchiveStore::new(temp_dir.path());

        store
            .write_atomic("backup-latest.json", b"a much longer previous archive body")
            .unwrap();
        let path = store.write_atomic("backup-latest.json", b"short").unwrap();

        assert_eq!(fs::read(path).unwrap(), b"short");
    }

    #[test]
    fn test_no_temporary_files_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalArchiveStore::new(temp_dir.path());

        store.write_atomic("backup-latest.json", b"{}").unwrap();

        let names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["backup-latest.json"]);
    }

    #[test]
    fn test_directory_path_occupied_by_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("backups");
        fs::write(&blocker, b"not a directory").unwrap();

        let store = LocalArchiveStore::new(&blocker);
        let result = store.write_atomic("backup-latest.json", b"{}");

        assert!(matches!(result, Err(SnapvaultError::Write { .. })));
    }
}
