/*!
Collection sources for snapshot data.

This module defines the fetch abstraction (port) and the REST adapter that
reads whole collections from the remote store. The assembler only sees the
port, so tests can substitute in-memory or mocked sources.
*/

pub mod rest;

use crate::collection::Record;
use crate::Result;
use async_trait::async_trait;

pub use rest::RestCollectionSource;

/// Read access to remote collections
///
/// Implementations issue a single "select all rows" request per call. They do
/// not paginate, filter or retry, and never return a partial result: any
/// failure surfaces as [`crate::SnapvaultError::Fetch`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// Fetch every record of the named collection
    ///
    /// # Arguments
    /// * `collection` - Name of a known remote collection
    ///
    /// # Returns
    /// The records in the order the store returned them
    async fn fetch(&self, collection: &str) -> Result<Vec<Record>>;
}

/// In-memory collection source for testing
///
/// Collections listed in `failing` return a fetch error instead of data.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySource {
    tables: std::collections::HashMap<String, Vec<Record>>,
    failing: std::collections::HashSet<String>,
}

#[cfg(test)]
impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collection holding `count` generated records
    pub fn with_rows(mut self, collection: &str, count: usize) -> Self {
        let rows = (0..count)
            .map(|i| {
                let mut record = Record::new();
                record.insert("id".to_string(), serde_json::json!(i));
                record.insert("collection".to_string(), serde_json::json!(collection));
                record
            })
            .collect();
        self.tables.insert(collection.to_string(), rows);
        self
    }

    /// Make fetches of this collection fail
    pub fn failing(mut self, collection: &str) -> Self {
        self.failing.insert(collection.to_string());
        self
    }
}

#[cfg(test)]
#[async_trait]
impl CollectionSource for MemorySource {
    async fn fetch(&self, collection: &str) -> Result<Vec<Record>> {
        if self.failing.contains(collection) {
            return Err(crate::SnapvaultError::fetch(
                collection,
                "simulated remote error",
            ));
        }
        self.tables.get(collection).cloned().ok_or_else(|| {
            crate::SnapvaultError::fetch(collection, "relation does not exist")
        })
    }
}
