// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Confirmation tokens for critical control-plane actions.

use chrono::{DateTime, Duration, Utc};
use crosspost_core::ids::new_id;
use crosspost_core::{ConfirmationToken, CrosspostError, TokenAction};
use crosspost_storage::Database;
use crosspost_storage::queries::tokens;

/// Minutes a confirmation token stays redeemable. Matches the decision
/// request lifetime so a token never dies before its parent ask.
pub const TOKEN_EXPIRY_MINUTES: i64 = 30;

/// Issue a single-use token bound to one action and target.
pub async fn issue(
    db: &Database,
    action: TokenAction,
    target_id: &str,
    now: DateTime<Utc>,
) -> Result<ConfirmationToken, CrosspostError> {
    let token = ConfirmationToken {
        id: new_id("tok"),
        action,
        target_id: target_id.to_string(),
        created_at: now,
        expires_at: now + Duration::minutes(TOKEN_EXPIRY_MINUTES),
        used_at: None,
        used_by: None,
    };
    tokens::insert_token(db, &token).await?;
    Ok(token)
}

/// Redeem a token for a user. `None` means missing, used, or expired.
pub async fn redeem(
    db: &Database,
    token_id: &str,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<ConfirmationToken>, CrosspostError> {
    tokens::redeem_token(db, token_id, user_id, now).await
}
