/*!
# Snapvault Core Engine

Point-in-time snapshots of remote data collections, written as durable and
optionally encrypted archive files.

A run:

- fetches every configured collection concurrently, failing the whole run if
  any single fetch fails
- aggregates the rows into a versioned snapshot document with record totals
- seals the serialized document with AES-256-GCM when a key is configured
- writes `backup-<YYYY-MM-DD>.json` and `backup-latest.json` atomically

## Architecture

Fetching, sealing and archive storage are ports ([`CollectionSource`],
[`SealAdapter`], [`ArchiveStore`]) with production adapters for a REST store,
AES-GCM and the local filesystem. [`BackupEngine`] wires them together.

## Usage

```rust,no_run
use snapvault_core::{create_engine_from_config, BackupConfig};

# async fn run() -> snapvault_core::Result<()> {
let config = BackupConfig::new("https://store.example.co", "service-key")
    .with_encryption_key("00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff");

let report = create_engine_from_config(&config)?.run().await?;
assert!(report.encrypted);
# Ok(())
# }
```
*/

pub mod assembler;
pub mod collection;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod metadata;
pub mod observability;
pub mod publish;
pub mod snapshot;


pub use assembler::SnapshotAssembler;
pub use collection::{CollectionDescriptor, Record, DEFAULT_COLLECTIONS};
pub use config::BackupConfig;
pub use crypto::{AesGcmSealer, ArchiveEnvelope, EncryptionConfig, PlaintextSealer, SealAdapter};
pub use engine::{create_engine_from_config, BackupEngine, DefaultEngine};
pub use error::{Result, SnapvaultError};
pub use fetch::{CollectionSource, RestCollectionSource};
pub use metadata::{SnapshotMetadata, SNAPSHOT_FORMAT_VERSION};
pub use publish::{ArchivePublisher, ArchiveStore, LocalArchiveStore, PublishReport};
pub use snapshot::{SnapshotDocument, LATEST_FILE_NAME};
