/*!
Archive publication.

The publisher writes sealed snapshot bytes to a dated archive and then to the
latest alias through an [`ArchiveStore`], which must replace each file
atomically: a reader sees either the previous content or the new content,
never a truncated file.
*/

pub mod local;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::metadata::compute_hash;
use crate::snapshot::LATEST_FILE_NAME;
use crate::Result;

pub use local::LocalArchiveStore;

/// Atomic file storage for archives
pub trait ArchiveStore: Send + Sync {
    /// Replace the named file with `data` in a single atomic step
    ///
    /// # Arguments
    /// * `name` - File name relative to the store's directory
    /// * `data` - Complete file contents
    ///
    /// # Returns
    /// The full path of the written file
    fn write_atomic(&self, name: &str, data: &[u8]) -> Result<PathBuf>;

    /// Directory that archives are written into
    fn location(&self) -> &Path;
}

/// Outcome of a successful publication
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// Path of the dated archive
    pub path: PathBuf,
    /// Path of the latest alias
    pub latest_path: PathBuf,
    /// Size of the published bytes
    pub size_bytes: usize,
    /// Whether the published bytes are an encrypted envelope
    pub encrypted: bool,
    /// Hex SHA-256 of the published bytes
    pub sha256: String,
}

/// Writes the dated archive and its latest alias
pub struct ArchivePublisher<'a, W: ArchiveStore> {
    store: &'a W,
}

impl<'a, W: ArchiveStore> ArchivePublisher<'a, W> {
    pub fn new(store: &'a W) -> Self {
        Self { store }
    }

    /// Publish sealed archive bytes
    ///
    /// The dated file is written first, then the latest alias. Either write
    /// failing fails the publication, so a stale alias is never reported as
    /// current.
    ///
    /// # Arguments
    /// * `sealed` - Bytes produced by the sealing stage
    /// * `dated_name` - File name of the dated archive, e.g. `backup-2024-01-05.json`
    /// * `encrypted` - Whether `sealed` is an encrypted envelope
    pub fn publish(&self, sealed: &[u8], dated_name: &str, encrypted: bool) -> Result<PublishReport> {
        let path = self.store.write_atomic(dated_name, sealed)?;
        let latest_path = self.store.write_atomic(LATEST_FILE_NAME, sealed)?;

        let report = PublishReport {
            path,
            latest_path,
            size_bytes: sealed.len(),
            encrypted,
            sha256: compute_hash(sealed),
        };

        info!(
            path = %report.path.display(),
            size_bytes = report.size_bytes,
            encrypted = report.encrypted,
            sha256 = %report.sha256,
            "Archive published"
        );
        Ok(report)
    }
}

/// Memory-based archive store for testing
///
/// Writes to names listed in `failing` return a write error.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    files: std::sync::Mutex<std::collections::HashMap<String, Vec<u8>>>,
    failing: std::collections::HashSet<String>,
    location: PathBuf,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self {
            location: PathBuf::from("memory"),
            ..Self::default()
        }
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

#[cfg(test)]
impl ArchiveStore for MemoryStore {
    fn write_atomic(&self, name: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.location.join(name);
        if self.failing.contains(name) {
            return Err(crate::SnapvaultError::write(path, "simulated disk failure"));
        }
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), data.to_vec());
        Ok(path)
    }

    fn location(&self) -> &Path {
        &self.location
    }
}
