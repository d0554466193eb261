// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content hashing and the publish idempotency key.

use sha2::{Digest, Sha256};

use crate::types::Platform;

/// SHA-256 hex digest of the exact post content bytes.
///
/// Frozen into `approved_content_hash` at the approval edge and never
/// recomputed afterwards.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Deterministic idempotency key for a (campaign, platform, content) triple.
///
/// The same approved content for the same campaign and platform always maps
/// to the same key, across retries and process restarts.
pub fn idempotency_key(campaign_id: &str, platform: Platform, approved_content_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(campaign_id.as_bytes());
    hasher.update(b":");
    hasher.update(platform.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(approved_content_hash.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_byte_stable() {
        let a = content_hash("Title\n\nBody text here.");
        let b = content_hash("Title\n\nBody text here.");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn content_hash_changes_on_any_edit() {
        assert_ne!(content_hash("hello"), content_hash("hello "));
    }

    #[test]
    fn idempotency_key_is_deterministic() {
        let h = content_hash("post body");
        let k1 = idempotency_key("camp_1", Platform::X, &h);
        let k2 = idempotency_key("camp_1", Platform::X, &h);
        assert_eq!(k1, k2);
    }

    #[test]
    fn idempotency_key_separates_platforms_and_campaigns() {
        let h = content_hash("post body");
        let x = idempotency_key("camp_1", Platform::X, &h);
        let li = idempotency_key("camp_1", Platform::Linkedin, &h);
        let other = idempotency_key("camp_2", Platform::X, &h);
        assert_ne!(x, li);
        assert_ne!(x, other);
    }
}
