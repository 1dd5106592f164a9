/*!
Sealing adapters for archive payloads.

With a key configured, payloads are encrypted with AES-256-GCM and wrapped in
an [`ArchiveEnvelope`] that keeps the nonce and authentication tag next to the
ciphertext. Without a key, payloads pass through untouched.
*/

use crate::{Result, SnapvaultError};
use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key size (256 bits for AES-256)
pub const KEY_SIZE: usize = 32;

/// Nonce size (96 bits for AES-GCM)
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size appended by AES-GCM
pub const TAG_SIZE: usize = 16;

/// Sealing abstraction applied to the serialized snapshot
///
/// The same instance answers both "how are bytes sealed" and "is the archive
/// encrypted", so the document's `encrypted` flag cannot drift from what is
/// actually written.
pub trait SealAdapter: Send + Sync {
    /// Seal the serialized snapshot
    ///
    /// # Arguments
    /// * `plaintext` - The serialized snapshot document
    ///
    /// # Returns
    /// The bytes to write to disk or an error
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Whether sealed output is encrypted
    fn is_encrypted(&self) -> bool;

    /// Get the name of the sealing algorithm
    fn algorithm_name(&self) -> &str;
}

impl SealAdapter for Box<dyn SealAdapter> {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        (**self).seal(plaintext)
    }

    fn is_encrypted(&self) -> bool {
        (**self).is_encrypted()
    }

    fn algorithm_name(&self) -> &str {
        (**self).algorithm_name()
    }
}

/// On-disk wrapper for encrypted archives
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEnvelope {
    /// Always `true`
    pub encrypted: bool,
    /// Hex-encoded nonce used for this encryption
    pub iv: String,
    /// Hex-encoded authentication tag
    pub auth_tag: String,
    /// Hex-encoded ciphertext of the plaintext document
    pub data: String,
}

/// Encryption settings resolved from the optional hex key
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionConfig {
    key: Option<[u8; KEY_SIZE]>,
}

impl fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("key", &self.key.map(|_| "[REDACTED]"))
            .finish()
    }
}

impl EncryptionConfig {
    /// Plaintext mode
    pub fn disabled() -> Self {
        Self { key: None }
    }

    /// Resolve an optional hex-encoded key
    ///
    /// A missing or blank key is valid and selects plaintext mode. A key that
    /// is not hex or does not decode to exactly 32 bytes is rejected.
    ///
    /// # Example
    /// ```rust
    /// use snapvault_core::EncryptionConfig;
    ///
    /// assert!(!EncryptionConfig::from_optional_hex(None)?.is_enabled());
    /// assert!(EncryptionConfig::from_optional_hex(Some(&"ab".repeat(32)))?.is_enabled());
    /// assert!(EncryptionConfig::from_optional_hex(Some("abcd")).is_err());
    /// # Ok::<(), snapvault_core::SnapvaultError>(())
    /// ```
    pub fn from_optional_hex(hex_key: Option<&str>) -> Result<Self> {
        match hex_key.map(str::trim) {
            None | Some("") => Ok(Self::disabled()),
            Some(hex_key) => Self::from_hex(hex_key),
        }
    }

    /// Create config from a hex-encoded key
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|e| SnapvaultError::encryption_config(format!("key is not valid hex: {e}")))?;

        let key: [u8; KEY_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            SnapvaultError::encryption_config(format!(
                "key must be {KEY_SIZE} bytes ({} hex characters), got {} bytes",
                KEY_SIZE * 2,
                bytes.len()
            ))
        })?;

        Ok(Self { key: Some(key) })
    }

    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Build the sealer matching this configuration
    pub fn sealer(&self) -> Box<dyn SealAdapter> {
        match self.key {
            Some(key) => Box::new(AesGcmSealer::new(key)),
            None => Box::new(PlaintextSealer),
        }
    }
}

/// AES-256-GCM sealer producing a JSON [`ArchiveEnvelope`]
#[derive(Clone)]
pub struct AesGcmSealer {
    key: [u8; KEY_SIZE],
}

impl fmt::Debug for AesGcmSealer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesGcmSealer")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl AesGcmSealer {
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Encrypt with a fresh random nonce and split the tag from the ciphertext
    fn encrypt(&self, plaintext: &[u8]) -> Result<ArchiveEnvelope> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| SnapvaultError::cipher(format!("cipher init failed: {e}")))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| SnapvaultError::cipher(format!("encryption failed: {e}")))?;

        if ciphertext.len() < TAG_SIZE {
            return Err(SnapvaultError::cipher("cipher output shorter than its tag"));
        }
        let auth_tag = ciphertext.split_off(ciphertext.len() - TAG_SIZE);

        Ok(ArchiveEnvelope {
            encrypted: true,
            iv: hex::encode(nonce_bytes),
            auth_tag: hex::encode(auth_tag),
            data: hex::encode(ciphertext),
        })
    }
}

impl SealAdapter for AesGcmSealer {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let envelope = self.encrypt(plaintext)?;
        Ok(serde_json::to_vec_pretty(&envelope)?)
    }

    fn is_encrypted(&self) -> bool {
        true
    }

    fn algorithm_name(&self) -> &str {
        "aes-256-gcm"
    }
}

/// Pass-through sealer used when no key is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextSealer;

impl SealAdapter for PlaintextSealer {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(plaintext.to_vec())
    }

    fn is_encrypted(&self) -> bool {
        false
    }

    fn algorithm_name(&self) -> &str {
        "none"
    }
}
