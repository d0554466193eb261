// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token vault lifecycle: open, store, retrieve, list, and delete platform
//! credentials.
//!
//! Tokens live in one encrypted file. The whole entry map is sealed as a
//! single AES-256-GCM blob with a fresh nonce on every save, so the file on
//! disk never reveals how many tokens exist or how long they are
//! individually. The encryption key comes from the `CROSSPOST_ENCRYPTION_KEY`
//! environment variable (base64, 32 bytes) and is never read from
//! configuration files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use crosspost_config::model::VaultConfig;
use crosspost_core::CrosspostError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crypto;

/// Environment variable holding the base64-encoded 32-byte vault key.
pub const KEY_ENV_VAR: &str = "CROSSPOST_ENCRYPTION_KEY";

/// On-disk representation of the sealed vault.
#[derive(Serialize, Deserialize)]
struct SealedFile {
    nonce: String,
    ciphertext: String,
}

/// The opened vault, holding the key in memory.
///
/// Debug output intentionally omits the key.
pub struct TokenVault {
    key: [u8; 32],
    path: PathBuf,
}

impl std::fmt::Debug for TokenVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVault")
            .field("key", &"[REDACTED]")
            .field("path", &self.path)
            .finish()
    }
}

impl TokenVault {
    /// Open the vault at the configured path, keyed from the environment.
    ///
    /// The backing file does not have to exist yet; it is created on the
    /// first store.
    pub fn open(config: &VaultConfig) -> Result<Self, CrosspostError> {
        let key = key_from_env()?;
        Ok(Self {
            key,
            path: PathBuf::from(&config.file_path),
        })
    }

    /// Open the vault at an explicit path with an explicit key.
    pub fn with_key(path: &Path, key: [u8; 32]) -> Self {
        Self {
            key,
            path: path.to_path_buf(),
        }
    }

    /// Store a token, replacing any existing value under the same name.
    pub async fn set_token(&self, name: &str, value: &str) -> Result<(), CrosspostError> {
        let mut entries = self.load_entries().await?;
        entries.insert(name.to_string(), value.to_string());
        self.save_entries(&entries).await?;
        debug!(name, "token stored in vault");
        Ok(())
    }

    /// Retrieve a token by name.
    pub async fn get_token(&self, name: &str) -> Result<Option<String>, CrosspostError> {
        let entries = self.load_entries().await?;
        Ok(entries.get(name).cloned())
    }

    /// Delete a token. Returns whether it existed.
    pub async fn delete_token(&self, name: &str) -> Result<bool, CrosspostError> {
        let mut entries = self.load_entries().await?;
        let existed = entries.remove(name).is_some();
        if existed {
            self.save_entries(&entries).await?;
            debug!(name, "token deleted from vault");
        }
        Ok(existed)
    }

    /// List all tokens with masked previews, sorted by name.
    pub async fn list_tokens(&self) -> Result<Vec<(String, String)>, CrosspostError> {
        let entries = self.load_entries().await?;
        Ok(entries
            .into_iter()
            .map(|(name, value)| (name, mask_secret(&value)))
            .collect())
    }

    async fn load_entries(&self) -> Result<BTreeMap<String, String>, CrosspostError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(e) => {
                return Err(CrosspostError::Vault(format!("failed to read vault file: {e}")));
            }
        };

        let sealed: SealedFile = serde_json::from_slice(&raw)
            .map_err(|e| CrosspostError::Vault(format!("corrupted vault file: {e}")))?;
        let nonce_vec = BASE64
            .decode(&sealed.nonce)
            .map_err(|e| CrosspostError::Vault(format!("corrupted vault nonce: {e}")))?;
        let nonce: [u8; crypto::NONCE_LEN] = nonce_vec
            .try_into()
            .map_err(|_| CrosspostError::Vault("corrupted nonce (expected 12 bytes)".to_string()))?;
        let ciphertext = BASE64
            .decode(&sealed.ciphertext)
            .map_err(|e| CrosspostError::Vault(format!("corrupted vault ciphertext: {e}")))?;

        let plaintext =
            crypto::open_payload(&self.key, &crypto::SealedBlob { nonce, ciphertext })?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| CrosspostError::Vault(format!("corrupted vault contents: {e}")))
    }

    async fn save_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), CrosspostError> {
        let plaintext = serde_json::to_vec(entries)
            .map_err(|e| CrosspostError::Vault(format!("vault serialization failed: {e}")))?;
        let blob = crypto::seal_payload(&self.key, &plaintext)?;

        let sealed = SealedFile {
            nonce: BASE64.encode(blob.nonce),
            ciphertext: BASE64.encode(blob.ciphertext),
        };
        let raw = serde_json::to_vec(&sealed)
            .map_err(|e| CrosspostError::Vault(format!("vault serialization failed: {e}")))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CrosspostError::Vault(format!("failed to create vault dir: {e}")))?;
        }

        // Write-then-rename so a crash mid-save never truncates the vault.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &raw)
            .await
            .map_err(|e| CrosspostError::Vault(format!("failed to write vault file: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| CrosspostError::Vault(format!("failed to replace vault file: {e}")))?;
        Ok(())
    }
}

/// Read and decode the vault key from [`KEY_ENV_VAR`].
pub fn key_from_env() -> Result<[u8; 32], CrosspostError> {
    let encoded = std::env::var(KEY_ENV_VAR).map_err(|_| {
        CrosspostError::Vault(format!("{KEY_ENV_VAR} environment variable is not set"))
    })?;
    let decoded = BASE64
        .decode(encoded.trim())
        .map_err(|e| CrosspostError::Vault(format!("{KEY_ENV_VAR} is not valid base64: {e}")))?;
    decoded
        .try_into()
        .map_err(|_| CrosspostError::Vault(format!("{KEY_ENV_VAR} must decode to 32 bytes")))
}

/// Mask a token value for display: shows up to 4 leading and 4 trailing
/// characters. Short values (< 10 chars) are fully masked.
pub fn mask_secret(value: &str) -> String {
    if value.len() < 10 {
        return "****".to_string();
    }
    let prefix = &value[..4.min(value.len())];
    let suffix = &value[value.len().saturating_sub(4)..];
    format!("{prefix}...{suffix}")
}
