// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM encrypted platform token vault for Crosspost.
//!
//! Holds LinkedIn and X credentials in a single sealed file, keyed from the
//! `CROSSPOST_ENCRYPTION_KEY` environment variable. Tokens never appear in
//! configuration files or the database.

pub mod crypto;
pub mod vault;

pub use vault::{KEY_ENV_VAR, TokenVault, key_from_env, mask_secret};
