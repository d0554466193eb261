// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record ID generation: `prefix_<8 hex chars>`.

use chrono::Utc;
use sha1::{Digest, Sha1};

/// Generate a new record ID with the given prefix, e.g. `post_a1b2c3d4`.
pub fn new_id(prefix: &str) -> String {
    let raw = format!(
        "{prefix}:{}:{}",
        Utc::now().to_rfc3339(),
        uuid::Uuid::new_v4().simple()
    );
    let mut hasher = Sha1::new();
    hasher.update(raw.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{prefix}_{}", &digest[..8])
}
