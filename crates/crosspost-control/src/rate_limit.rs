// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user command rate limiting over a rolling window.
//!
//! Every evaluation is persisted, so the limit holds across restarts and
//! the rejection history is auditable.

use chrono::{DateTime, Duration, Utc};
use crosspost_core::CrosspostError;
use crosspost_core::ids::new_id;
use crosspost_core::types::RateLimitEvent;
use crosspost_storage::Database;
use crosspost_storage::queries::audit;

/// Commands allowed per user per rolling window.
pub const MAX_COMMANDS_PER_WINDOW: i64 = 20;

/// Rolling window length in seconds.
pub const WINDOW_SECONDS: i64 = 60;

/// Evaluate and record one command against the limiter. Returns whether
/// the command may proceed.
pub async fn check(
    db: &Database,
    user_id: &str,
    command: &str,
    now: DateTime<Utc>,
) -> Result<bool, CrosspostError> {
    let window_start = now - Duration::seconds(WINDOW_SECONDS);
    let used = audit::count_allowed_commands_since(db, user_id, window_start).await?;
    let allowed = used < MAX_COMMANDS_PER_WINDOW;

    audit::insert_rate_limit_event(
        db,
        &RateLimitEvent {
            id: new_id("rl"),
            user_id: user_id.to_string(),
            command: command.to_string(),
            window_start_utc: window_start,
            window_end_utc: now,
            action_taken: if allowed { "allowed" } else { "rejected" }.to_string(),
            created_at: now,
        },
    )
    .await?;
    Ok(allowed)
}
