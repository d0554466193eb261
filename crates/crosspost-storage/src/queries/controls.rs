// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System control key/value store.
//!
//! Controls are read fresh on every worker cycle; nothing caches them.
//! Well-known keys live in [`crosspost_core::controls`].

use chrono::{DateTime, Utc};
use crosspost_core::{CrosspostError, SystemControl};
use rusqlite::params;

use crate::database::Database;

/// Set (or overwrite) a control value.
pub async fn set_control(
    db: &Database,
    key: &str,
    value: &str,
    now: DateTime<Utc>,
) -> Result<(), CrosspostError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO system_controls (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key, value, now],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a control by key.
pub async fn get_control(
    db: &Database,
    key: &str,
) -> Result<Option<SystemControl>, CrosspostError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT key, value, updated_at FROM system_controls WHERE key = ?1",
                params![key],
                |row| {
                    Ok(SystemControl {
                        key: row.get(0)?,
                        value: row.get(1)?,
                        updated_at: row.get(2)?,
                    })
                },
            );
            match result {
                Ok(control) => Ok(Some(control)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a control. Returns whether a row existed.
/// One-shot controls (e.g. a single health-gate override) are consumed
/// through this.
pub async fn delete_control(db: &Database, key: &str) -> Result<bool, CrosspostError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM system_controls WHERE key = ?1",
                params![key],
            )?;
            Ok(deleted > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
