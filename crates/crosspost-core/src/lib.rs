// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Crosspost publishing system.
//!
//! This crate holds the pure domain layer: entity types, the post
//! lifecycle state machine, preflight validation, hashing, the
//! reliability policy, the timing-recommendation engine, and the trait
//! seams to platform connectors and the chat transport. Nothing in this
//! crate performs I/O.

pub mod error;
pub mod hashing;
pub mod ids;
pub mod preflight;
pub mod redact;
pub mod retry;
pub mod state_machine;
pub mod timing;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CrosspostError;
pub use types::controls;
pub use retry::{NextAction, PublishOutcome};
pub use traits::{ChatMessageId, ChatTransport, PlatformConnector};
pub use types::{
    Attempt, AttemptOutcome, Campaign, ConfirmationToken, DecisionAudit, DecisionKind,
    DecisionRequest, DecisionStatus, Event, HealthCheckStatus, OverrideAudit, Platform, Post,
    PostState, RateLimitEvent, RolloutStage, SystemControl, TokenAction,
};
