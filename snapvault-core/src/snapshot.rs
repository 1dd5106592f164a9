/*!
The snapshot document: every configured collection plus summary metadata.
*/

use crate::collection::Record;
use crate::metadata::{SnapshotMetadata, SNAPSHOT_FORMAT_VERSION};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// File name prefix shared by dated archives and the latest alias
pub const ARCHIVE_PREFIX: &str = "backup-";

/// File name of the alias that mirrors the most recent archive
pub const LATEST_FILE_NAME: &str = "backup-latest.json";

/// Aggregate of all fetched collections for one run
///
/// A document can only be built through [`SnapshotDocument::new`], which
/// derives the record total from the tables, so `metadata.total_records`
/// always equals the sum of the per-collection lengths.
///
/// # Example
/// ```rust
/// use snapvault_core::SnapshotDocument;
/// use std::collections::BTreeMap;
///
/// let mut tables = BTreeMap::new();
/// tables.insert("weeks".to_string(), vec![serde_json::Map::new(); 3]);
///
/// let document = SnapshotDocument::new(chrono::Utc::now(), tables, false);
/// assert_eq!(document.metadata().total_records, 3);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SnapshotDocument {
    timestamp: DateTime<Utc>,
    version: String,
    tables: BTreeMap<String, Vec<Record>>,
    metadata: SnapshotMetadata,
}

impl SnapshotDocument {
    /// Build a document from fetched tables
    ///
    /// # Arguments
    /// * `timestamp` - Capture time of the run start
    /// * `tables` - Collection name to its complete record sequence
    /// * `encrypted` - Whether the archive for this document will be sealed
    pub fn new(
        timestamp: DateTime<Utc>,
        tables: BTreeMap<String, Vec<Record>>,
        encrypted: bool,
    ) -> Self {
        let total_records = tables.values().map(Vec::len).sum();
        Self {
            timestamp,
            version: SNAPSHOT_FORMAT_VERSION.to_string(),
            tables,
            metadata: SnapshotMetadata::new(total_records, encrypted),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn tables(&self) -> &BTreeMap<String, Vec<Record>> {
        &self.tables
    }

    pub fn metadata(&self) -> &SnapshotMetadata {
        &self.metadata
    }

    /// Records captured for one collection, if it is part of the snapshot
    pub fn records(&self, collection: &str) -> Option<&[Record]> {
        self.tables.get(collection).map(Vec::as_slice)
    }

    /// Check that the stored total matches the tables
    ///
    /// Always true for assembled documents; useful for documents read back
    /// from disk.
    pub fn is_consistent(&self) -> bool {
        self.metadata.total_records == self.tables.values().map(Vec::len).sum::<usize>()
    }

    /// Serialize to the archive's plaintext form (pretty-printed JSON)
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Name of the dated archive file for this snapshot's UTC calendar day
    ///
    /// Format: backup-{YYYY-MM-DD}.json
    pub fn dated_file_name(&self) -> String {
        format!(
            "{ARCHIVE_PREFIX}{}.json",
            self.timestamp.format("%Y-%m-%d")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn sample_tables() -> BTreeMap<String, Vec<Record>> {
        let mut tables = BTreeMap::new();
        tables.insert(
            "weeks".to_string(),
            vec![
                record(json!({"id": 1, "label": "W1"})),
                record(json!({"id": 2, "label": "W2"})),
                record(json!({"id": 3, "label": "W3", "notes": {"mood": "good"}})),
            ],
        );
        tables.insert(
            "user_settings".to_string(),
            vec![record(json!({"theme": "dark"}))],
        );
        tables.insert("week_reviews".to_string(), Vec::new());
        tables
    }

    #[test]
    fn test_total_records_is_sum_of_tables() {
        let document = SnapshotDocument::new(Utc::now(), sample_tables(), false);

        assert_eq!(document.metadata().total_records, 4);
        assert!(!document.metadata().encrypted);
        assert_eq!(document.version(), "1.0");
        assert_eq!(document.tables().len(), 3);
        assert_eq!(document.records("week_reviews").unwrap().len(), 0);
        assert!(document.records("missing").is_none());
        assert!(document.is_consistent());
    }

    #[test]
    fn test_plaintext_wire_shape() {
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 1).unwrap();
        let document = SnapshotDocument::new(timestamp, sample_tables(), true);

        let value: serde_json::Value =
            serde_json::from_slice(&document.to_json_bytes().unwrap()).unwrap();

        assert_eq!(value["version"], "1.0");
        assert_eq!(value["timestamp"], "2024-03-09T23:59:01Z");
        assert_eq!(value["tables"]["weeks"].as_array().unwrap().len(), 3);
        assert_eq!(value["tables"]["weeks"][2]["notes"]["mood"], "good");
        assert_eq!(value["metadata"]["totalRecords"], 4);
        assert_eq!(value["metadata"]["encrypted"], true);
    }

    #[test]
    fn test_serialization_is_semantically_stable() {
        let document = SnapshotDocument::new(Utc::now(), sample_tables(), false);

        let first: SnapshotDocument =
            serde_json::from_slice(&document.to_json_bytes().unwrap()).unwrap();
        let second: SnapshotDocument =
            serde_json::from_slice(&document.to_json_bytes().unwrap()).unwrap();

        assert_eq!(first, document);
        assert_eq!(first, second);
    }

    #[test]
    fn test_inconsistent_document_detected() {
        let raw = json!({
            "timestamp": "2024-03-09T00:00:00Z",
            "version": "1.0",
            "tables": {"weeks": [{"id": 1}]},
            "metadata": {"totalRecords": 5, "encrypted": false}
        });
        let document: SnapshotDocument = serde_json::from_value(raw).unwrap();
        assert!(!document.is_consistent());
    }

    #[test]
    fn test_dated_file_name_uses_utc_day() {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 5, 0, 30, 0).unwrap();
        let document = SnapshotDocument::new(timestamp, BTreeMap::new(), false);

        assert_eq!(document.dated_file_name(), "backup-2024-01-05.json");
        assert_eq!(document.metadata().total_records, 0);
    }
}
