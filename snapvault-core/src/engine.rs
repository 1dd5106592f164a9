/*!
Main backup engine that orchestrates one snapshot run.

A run assembles every configured collection, serializes the document, seals
it, and publishes the dated archive plus the latest alias. Any failure aborts
the run before the next stage starts, so a failed fetch or a bad key never
touches the backup directory.
*/

use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::assembler::SnapshotAssembler;
use crate::collection::CollectionDescriptor;
use crate::config::BackupConfig;
use crate::crypto::SealAdapter;
use crate::fetch::{CollectionSource, RestCollectionSource};
use crate::publish::{ArchivePublisher, ArchiveStore, LocalArchiveStore, PublishReport};
use crate::Result;

#[cfg(feature = "metrics")]
use crate::observability::SnapvaultMetrics;

/// Engine for backup runs
///
/// Generic over the three ports so tests can swap in memory-backed sources
/// and stores.
///
/// # Example
/// ```rust,no_run
/// use snapvault_core::{create_engine_from_config, BackupConfig};
///
/// # async fn run() -> snapvault_core::Result<()> {
/// let config = BackupConfig::new("https://store.example.co", "service-key")
///     .with_backup_dir("/var/backups/snapvault");
/// let engine = create_engine_from_config(&config)?;
///
/// let report = engine.run().await?;
/// println!("wrote {} bytes to {}", report.size_bytes, report.path.display());
/// # Ok(())
/// # }
/// ```
pub struct BackupEngine<S, C, W>
where
    S: CollectionSource,
    C: SealAdapter,
    W: ArchiveStore,
{
    source: S,
    sealer: C,
    store: W,
    collections: Vec<CollectionDescriptor>,
}

impl<S, C, W> BackupEngine<S, C, W>
where
    S: CollectionSource,
    C: SealAdapter,
    W: ArchiveStore,
{
    /// Create a new engine
    ///
    /// # Arguments
    /// * `source` - Where collections are fetched from
    /// * `sealer` - How the serialized snapshot is sealed
    /// * `store` - Where archives are written
    /// * `collections` - The collections every run captures
    pub fn new(source: S, sealer: C, store: W, collections: Vec<CollectionDescriptor>) -> Self {
        Self {
            source,
            sealer,
            store,
            collections,
        }
    }

    pub fn collections(&self) -> &[CollectionDescriptor] {
        &self.collections
    }

    pub fn is_encrypted(&self) -> bool {
        self.sealer.is_encrypted()
    }

    /// Execute one complete backup run
    ///
    /// # Errors
    /// * `SnapvaultError::Fetch` - If any collection fetch fails
    /// * `SnapvaultError::Json` - If the document cannot be serialized
    /// * `SnapvaultError::Cipher` - If sealing fails
    /// * `SnapvaultError::Write` - If either archive file cannot be written
    pub async fn run(&self) -> Result<PublishReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("backup_run", run_id = %run_id);

        async {
            let encrypted = self.sealer.is_encrypted();
            if !encrypted {
                warn!("No encryption key configured; the archive will be written unencrypted");
            }
            info!(
                collections = self.collections.len(),
                destination = %self.store.location().display(),
                algorithm = self.sealer.algorithm_name(),
                "Starting backup run"
            );

            let document = SnapshotAssembler::new(&self.source)
                .assemble(&self.collections, encrypted)
                .await?;

            let plaintext = document.to_json_bytes()?;
            let sealed = self.sealer.seal(&plaintext)?;
            drop(plaintext);

            let report = ArchivePublisher::new(&self.store).publish(
                &sealed,
                &document.dated_file_name(),
                encrypted,
            )?;

            #[cfg(feature = "metrics")]
            SnapvaultMetrics::global().record_archive_size(report.size_bytes);

            info!(
                total_records = document.metadata().total_records,
                size_bytes = report.size_bytes,
                "Backup run complete"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }
}

/// Production engine type built from configuration
pub type DefaultEngine = BackupEngine<RestCollectionSource, Box<dyn SealAdapter>, LocalArchiveStore>;

/// Create the production engine from configuration
///
/// Configuration and the encryption key are fully validated here, before any
/// remote request or file write can happen.
///
/// # Errors
/// * `SnapvaultError::Configuration` - Missing endpoint, credential or collections
/// * `SnapvaultError::EncryptionConfig` - Malformed encryption key
pub fn create_engine_from_config(config: &BackupConfig) -> Result<DefaultEngine> {
    config.validate()?;
    let encryption = config.encryption()?;

    let source = RestCollectionSource::new(
        &config.store_url,
        &config.service_key,
        config.request_timeout,
    )?;

    Ok(BackupEngine::new(
        source,
        encryption.sealer(),
        LocalArchiveStore::new(&config.backup_dir),
        config.collections.clone(),
    ))
}
