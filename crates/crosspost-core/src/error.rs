// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Crosspost publishing system.

use thiserror::Error;

use crate::types::PostState;

/// The primary error type used across all Crosspost crates.
#[derive(Debug, Error)]
pub enum CrosspostError {
    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Ledger/storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Optimistic-concurrency conflict: the record changed under the writer.
    /// The caller must re-read and retry; nothing was overwritten.
    #[error("version conflict updating record {id}")]
    Conflict { id: String },

    /// A referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// An edge not present in the lifecycle transition table was requested.
    /// The record is never mutated on rejection.
    #[error("illegal state transition: {from} -> {to}")]
    IllegalTransition { from: PostState, to: PostState },

    /// Preflight or command validation failure, with every reason collected.
    #[error("validation failed: {}", reasons.join("; "))]
    Validation { reasons: Vec<String> },

    /// Chat transport errors (Telegram unreachable, send failure).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Platform connector errors outside the classified publish outcomes.
    #[error("connector error: {message}")]
    Connector {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Credential vault errors (missing key, decryption failure).
    #[error("vault error: {0}")]
    Vault(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CrosspostError {
    /// Convenience constructor for single-reason validation failures.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reasons: vec![reason.into()],
        }
    }
}
