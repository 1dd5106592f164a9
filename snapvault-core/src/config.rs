//! Configuration for a backup run
//!
//! A [`BackupConfig`] is built once at process start from flags or the
//! environment, validated, and then used to construct the engine. It is the
//! single source for the encryption decision: both the document's
//! `encrypted` flag and the sealing step derive from it.

use std::path::PathBuf;
use std::time::Duration;

use crate::collection::{ensure_unique, CollectionDescriptor};
use crate::crypto::EncryptionConfig;
use crate::{Result, SnapvaultError};

/// Default directory archives are written to
pub const DEFAULT_BACKUP_DIR: &str = "./backups";

/// Settings for one backup run
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Base URL of the remote store
    pub store_url: String,
    /// Elevated service credential for the remote store
    pub service_key: String,
    /// Optional hex-encoded AES-256 key
    pub encryption_key: Option<String>,
    /// Directory that receives the dated archive and latest alias
    pub backup_dir: PathBuf,
    /// Collections to snapshot
    pub collections: Vec<CollectionDescriptor>,
    /// Refuse to run without an encryption key
    pub require_encryption: bool,
    /// Per-request timeout for remote fetches
    pub request_timeout: Option<Duration>,
}

impl BackupConfig {
    /// Create a configuration with default collections and directory
    pub fn new<U: Into<String>, K: Into<String>>(store_url: U, service_key: K) -> Self {
        Self {
            store_url: store_url.into(),
            service_key: service_key.into(),
            encryption_key: None,
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            collections: CollectionDescriptor::defaults(),
            require_encryption: false,
            request_timeout: None,
        }
    }

    pub fn with_encryption_key<S: Into<String>>(mut self, key: S) -> Self {
        self.encryption_key = Some(key.into());
        self
    }

    pub fn with_backup_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.backup_dir = dir.into();
        self
    }

    pub fn with_collections(mut self, collections: Vec<CollectionDescriptor>) -> Self {
        self.collections = collections;
        self
    }

    /// Validate required settings
    ///
    /// Does not decode the encryption key; see [`BackupConfig::encryption`].
    pub fn validate(&self) -> Result<()> {
        if self.store_url.trim().is_empty() {
            return Err(SnapvaultError::configuration("store URL is required"));
        }
        if self.service_key.trim().is_empty() {
            return Err(SnapvaultError::configuration(
                "store service key is required",
            ));
        }
        if self.collections.is_empty() {
            return Err(SnapvaultError::configuration(
                "at least one collection must be configured",
            ));
        }
        ensure_unique(&self.collections)?;
        if self.backup_dir.as_os_str().is_empty() {
            return Err(SnapvaultError::configuration(
                "backup directory cannot be empty",
            ));
        }
        Ok(())
    }

    /// Resolve the encryption settings
    ///
    /// # Errors
    /// * `SnapvaultError::EncryptionConfig` - If the key is malformed
    /// * `SnapvaultError::Configuration` - If encryption is required but no key is set
    pub fn encryption(&self) -> Result<EncryptionConfig> {
        let encryption = EncryptionConfig::from_optional_hex(self.encryption_key.as_deref())?;
        if self.require_encryption && !encryption.is_enabled() {
            return Err(SnapvaultError::configuration(
                "encryption is required but no encryption key is configured",
            ));
        }
        Ok(encryption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> BackupConfig {
        BackupConfig::new("https://store.example.co", "service-key")
    }

    #[test]
    fn test_defaults() {
        let config = valid_config();
        assert_eq!(config.backup_dir, PathBuf::from("./backups"));
        assert_eq!(config.collections.len(), 3);
        assert!(config.encryption_key.is_none());
        assert!(!config.require_encryption);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_endpoint_or_credential() {
        let mut config = valid_config();
        config.store_url = String::new();
        assert!(matches!(
            config.validate(),
            Err(SnapvaultError::Configuration(_))
        ));

        let mut config = valid_config();
        config.service_key = "   ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_or_duplicate_collections() {
        let config = valid_config().with_collections(Vec::new());
        assert!(config.validate().is_err());

        let weeks = CollectionDescriptor::new("weeks").unwrap();
        let config = valid_config().with_collections(vec![weeks.clone(), weeks]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_key_is_plaintext() {
        let encryption = valid_config().encryption().unwrap();
        assert!(!encryption.is_enabled());
    }

    #[test]
    fn test_malformed_key_is_encryption_config_error() {
        let config = valid_config().with_encryption_key("abc");
        assert!(matches!(
            config.encryption(),
            Err(SnapvaultError::EncryptionConfig(_))
        ));
    }

    #[test]
    fn test_require_encryption() {
        let mut config = valid_config();
        config.require_encryption = true;
        assert!(matches!(
            config.encryption(),
            Err(SnapvaultError::Configuration(_))
        ));

        let config = BackupConfig {
            require_encryption: true,
            ..valid_config().with_encryption_key("42".repeat(32))
        };
        assert!(config.encryption().unwrap().is_enabled());
    }
}
