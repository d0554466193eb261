// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only operational event log.

use chrono::{DateTime, Utc};
use crosspost_core::{CrosspostError, Event};
use rusqlite::params;

use crate::database::Database;

fn event_from_row(row: &rusqlite::Row<'_>) -> Result<Event, rusqlite::Error> {
    let details_json: String = row.get(4)?;
    let details = serde_json::from_str(&details_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Event {
        id: row.get(0)?,
        event_type: row.get(1)?,
        campaign_id: row.get(2)?,
        post_id: row.get(3)?,
        details,
        created_at: row.get(5)?,
    })
}

/// Append an event.
pub async fn insert_event(db: &Database, event: &Event) -> Result<(), CrosspostError> {
    let event = event.clone();
    let details_json = serde_json::to_string(&event.details).map_err(|e| {
        CrosspostError::Internal(format!("event details serialization: {e}"))
    })?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO events (id, event_type, campaign_id, post_id, details_json,
                     created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    event.id,
                    event.event_type,
                    event.campaign_id,
                    event.post_id,
                    details_json,
                    event.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Events created at or after `since`, oldest first. Feeds the digests.
pub async fn list_events_since(
    db: &Database,
    since: DateTime<Utc>,
) -> Result<Vec<Event>, CrosspostError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, event_type, campaign_id, post_id, details_json, created_at
                 FROM events WHERE created_at >= ?1 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(params![since], event_from_row)?;
            let mut events = Vec::new();
            for row in rows {
                events.push(row?);
            }
            Ok(events)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count events of one type at or after `since`.
pub async fn count_events_since(
    db: &Database,
    event_type: &str,
    since: DateTime<Utc>,
) -> Result<i64, CrosspostError> {
    let event_type = event_type.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM events WHERE event_type = ?1 AND created_at >= ?2",
                params![event_type, since],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
