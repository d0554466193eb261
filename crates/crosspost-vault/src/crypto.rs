// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM sealing for the vault file.
//!
//! The vault encrypts its whole entry map as one payload per save. Each
//! [`seal_payload`] call draws a fresh 96-bit nonce from the system CSPRNG
//! and returns it bundled with the ciphertext as a [`SealedBlob`]; the
//! nonce is never cached or derived, since GCM security collapses under
//! nonce reuse.

use crosspost_core::CrosspostError;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};

pub const NONCE_LEN: usize = 12;

/// One sealed vault payload: the ciphertext and the nonce it was sealed
/// under. The trailing 16 bytes of `ciphertext` are the GCM tag.
pub struct SealedBlob {
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

fn payload_key(key: &[u8; 32]) -> Result<LessSafeKey, CrosspostError> {
    UnboundKey::new(&AES_256_GCM, key)
        .map(LessSafeKey::new)
        .map_err(|_| CrosspostError::Vault("vault key rejected by AES-256-GCM".to_string()))
}

/// Seal the serialized entry map under the vault key.
pub fn seal_payload(key: &[u8; 32], plaintext: &[u8]) -> Result<SealedBlob, CrosspostError> {
    let sealing = payload_key(key)?;
    let mut nonce = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| CrosspostError::Vault("system CSPRNG unavailable for nonce".to_string()))?;

    let mut buf = plaintext.to_vec();
    sealing
        .seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut buf)
        .map_err(|_| CrosspostError::Vault("vault payload encryption failed".to_string()))?;
    Ok(SealedBlob {
        nonce,
        ciphertext: buf,
    })
}

/// Open a sealed payload. Fails on a wrong key or any tampering, a swapped
/// nonce included.
pub fn open_payload(key: &[u8; 32], blob: &SealedBlob) -> Result<Vec<u8>, CrosspostError> {
    let opening = payload_key(key)?;
    let mut buf = blob.ciphertext.clone();
    let plaintext = opening
        .open_in_place(Nonce::assume_unique_for_key(blob.nonce), Aad::empty(), &mut buf)
        .map_err(|_| {
            CrosspostError::Vault(
                "vault payload failed authentication (wrong key or corrupted file)".to_string(),
            )
        })?;
    Ok(plaintext.to_vec())
}

/// Fresh random 32-byte vault key.
pub fn generate_key() -> Result<[u8; 32], CrosspostError> {
    let mut key = [0u8; 32];
    SystemRandom::new()
        .fill(&mut key)
        .map_err(|_| CrosspostError::Vault("system CSPRNG unavailable for key".to_string()))?;
    Ok(key)
}
