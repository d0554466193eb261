// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reliability policy: a pure function from attempt history and outcome to
//! the worker's next action.
//!
//! Backoff is expressed as "next eligible time", not as a sleeping loop, so
//! the stateless polling worker picks retries up naturally and holds no
//! per-post timers.

use chrono::{DateTime, Duration, Utc};

/// Closed set of publish results a connector may report. Classification
/// judgment lives here, not in ad hoc string inspection at call sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Success { external_id: String },
    Transient { error: String },
    Permanent { error: String },
    /// The call ended indeterminately (e.g. timeout after the request was
    /// sent). Must be reconciled by verification, never blindly retried.
    Ambiguous { error: String },
}

/// What the worker should do after an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAction {
    /// Confirmed success: finalize the post as posted.
    Finalize { external_id: String },
    /// Transient failure with retries remaining: re-enter `scheduled` with
    /// this eligibility time.
    RetryAt(DateTime<Utc>),
    /// Permanent failure, or the retry ladder is exhausted.
    GiveUp { error: String },
    /// Ambiguous: query the platform by idempotency key before deciding.
    VerifyFirst { error: String },
}

/// A transient failure on this attempt number is terminal.
pub const MAX_ATTEMPTS: i64 = 4;

/// Fixed backoff ladder: 5m, 15m, 45m after attempts 1, 2, 3.
/// `None` means no further retry is granted.
pub fn retry_delay(attempt_number: i64) -> Option<Duration> {
    match attempt_number {
        1 => Some(Duration::minutes(5)),
        2 => Some(Duration::minutes(15)),
        3 => Some(Duration::minutes(45)),
        _ => None,
    }
}

/// Decide the next action for the outcome of attempt `attempt_number`.
pub fn next_action(outcome: &PublishOutcome, attempt_number: i64, now: DateTime<Utc>) -> NextAction {
    match outcome {
        PublishOutcome::Success { external_id } => NextAction::Finalize {
            external_id: external_id.clone(),
        },
        PublishOutcome::Permanent { error } => NextAction::GiveUp {
            error: error.clone(),
        },
        PublishOutcome::Transient { error } => match retry_delay(attempt_number) {
            Some(delay) => NextAction::RetryAt(now + delay),
            None => NextAction::GiveUp {
                error: error.clone(),
            },
        },
        PublishOutcome::Ambiguous { error } => NextAction::VerifyFirst {
            error: error.clone(),
        },
    }
}

/// Heuristic transient/permanent classification for untyped error text.
/// Connectors map HTTP statuses directly; this covers transport errors.
pub fn is_transient_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    const PERMANENT_MARKERS: [&str; 6] = [
        "unauthorized",
        "forbidden",
        "invalid token",
        "permission",
        "bad request",
        "validation",
    ];
    !PERMANENT_MARKERS.iter().any(|marker| lower.contains(marker))
}
