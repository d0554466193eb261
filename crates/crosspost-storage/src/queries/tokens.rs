// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-use confirmation tokens for critical actions.
//!
//! Redemption is one guarded UPDATE, so two racing redemptions of the same
//! token can never both succeed.

use chrono::{DateTime, Utc};
use crosspost_core::{ConfirmationToken, CrosspostError};
use rusqlite::params;

use crate::database::{Database, parse_enum};

const TOKEN_COLUMNS: &str = "id, action, target_id, created_at, expires_at, used_at, used_by";

fn token_from_row(row: &rusqlite::Row<'_>) -> Result<ConfirmationToken, rusqlite::Error> {
    Ok(ConfirmationToken {
        id: row.get(0)?,
        action: parse_enum(1, row.get::<_, String>(1)?)?,
        target_id: row.get(2)?,
        created_at: row.get(3)?,
        expires_at: row.get(4)?,
        used_at: row.get(5)?,
        used_by: row.get(6)?,
    })
}

/// Issue a new confirmation token.
pub async fn insert_token(db: &Database, token: &ConfirmationToken) -> Result<(), CrosspostError> {
    let token = token.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO confirmation_tokens (id, action, target_id, created_at,
                     expires_at, used_at, used_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    token.id,
                    token.action.to_string(),
                    token.target_id,
                    token.created_at,
                    token.expires_at,
                    token.used_at,
                    token.used_by,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a token by ID.
pub async fn get_token(
    db: &Database,
    id: &str,
) -> Result<Option<ConfirmationToken>, CrosspostError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TOKEN_COLUMNS} FROM confirmation_tokens WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], token_from_row);
            match result {
                Ok(token) => Ok(Some(token)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Atomically redeem a token: succeeds only while it is unused and
/// unexpired. Returns the redeemed token, or `None` if it was missing,
/// already used, or past its expiry.
pub async fn redeem_token(
    db: &Database,
    id: &str,
    used_by: &str,
    now: DateTime<Utc>,
) -> Result<Option<ConfirmationToken>, CrosspostError> {
    let id = id.to_string();
    let used_by = used_by.to_string();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE confirmation_tokens SET used_at = ?1, used_by = ?2
                 WHERE id = ?3 AND used_at IS NULL AND expires_at > ?1",
                params![now, used_by, id],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            let mut stmt = conn.prepare(&format!(
                "SELECT {TOKEN_COLUMNS} FROM confirmation_tokens WHERE id = ?1"
            ))?;
            let token = stmt.query_row(params![id], token_from_row)?;
            Ok(Some(token))
        })
        .await
        .map_err(crate::database::map_tr_err)
}
