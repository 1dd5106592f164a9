/*!
Snapshot assembly: concurrent fetches aggregated into one document.
*/

use std::collections::BTreeMap;

use chrono::Utc;
use futures::future::try_join_all;
use tracing::{error, info};

use crate::collection::{ensure_unique, CollectionDescriptor, Record};
use crate::fetch::CollectionSource;
use crate::{Result, SnapshotDocument};

#[cfg(feature = "metrics")]
use crate::observability::{FetchTimer, SnapvaultMetrics};

/// Fetches every configured collection and builds the snapshot document
///
/// Assembly is all-or-nothing: if any single fetch fails, the first failure
/// is returned and no document is produced.
pub struct SnapshotAssembler<'a, S: CollectionSource> {
    source: &'a S,
}

impl<'a, S: CollectionSource> SnapshotAssembler<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Fetch all collections concurrently and aggregate them
    ///
    /// # Arguments
    /// * `descriptors` - The collections to capture; must be unique
    /// * `encrypted` - Whether the published archive will be encrypted
    ///
    /// # Errors
    /// * `SnapvaultError::Configuration` - If a collection is listed twice
    /// * `SnapvaultError::Fetch` - The first fetch failure observed
    pub async fn assemble(
        &self,
        descriptors: &[CollectionDescriptor],
        encrypted: bool,
    ) -> Result<SnapshotDocument> {
        ensure_unique(descriptors)?;

        // Capture time of the run, not of any individual collection
        let timestamp = Utc::now();

        let fetched = try_join_all(descriptors.iter().map(|d| self.fetch_one(d))).await?;

        let tables: BTreeMap<String, Vec<Record>> = fetched.into_iter().collect();
        let document = SnapshotDocument::new(timestamp, tables, encrypted);

        #[cfg(feature = "metrics")]
        SnapvaultMetrics::global().record_records(document.metadata().total_records);

        info!(
            collections = document.tables().len(),
            total_records = document.metadata().total_records,
            "Snapshot assembled"
        );
        Ok(document)
    }

    async fn fetch_one(&self, descriptor: &CollectionDescriptor) -> Result<(String, Vec<Record>)> {
        #[cfg(feature = "metrics")]
        let timer = FetchTimer::start();

        match self.source.fetch(descriptor.name()).await {
            Ok(records) => {
                #[cfg(feature = "metrics")]
                timer.finish();

                info!(collection = %descriptor, records = records.len(), "Fetched collection");
                Ok((descriptor.name().to_string(), records))
            }
            Err(e) => {
                #[cfg(feature = "metrics")]
                timer.finish_with_error();

                error!(collection = %descriptor, error = %e, "Collection fetch failed");
                Err(e)
            }
        }
    }
}
