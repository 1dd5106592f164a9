/*!
Snapshot summary metadata and archive digests.
*/

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Format version tag written into every snapshot document
pub const SNAPSHOT_FORMAT_VERSION: &str = "1.0";

/// Summary block carried by every snapshot document
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    /// Sum of the record counts of every collection in the document
    pub total_records: usize,

    /// Whether the persisted archive is wrapped in an encrypted envelope
    pub encrypted: bool,
}

impl SnapshotMetadata {
    pub fn new(total_records: usize, encrypted: bool) -> Self {
        Self {
            total_records,
            encrypted,
        }
    }
}

/// Compute the SHA-256 digest of published archive bytes
///
/// # Returns
/// Hexadecimal string representation of the SHA-256 hash
pub fn compute_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
