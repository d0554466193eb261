// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decision request persistence.
//!
//! A request moves `open -> resolved` on an operator action, or
//! `open -> pending_manual` exactly once when its expiry passes. Expiry is
//! a single guarded UPDATE, so concurrent worker cycles cannot flip the
//! same request twice.

use chrono::{DateTime, Utc};
use crosspost_core::{CrosspostError, DecisionKind, DecisionRequest, DecisionStatus};
use rusqlite::params;

use crate::database::{Database, parse_enum};

const DECISION_COLUMNS: &str = "id, campaign_id, post_id, kind, message, critical, status,
     created_at, expires_at, last_reminder_at, reminder_count, resolved_at, resolution_action,
     resolved_by, resolving_message_id";

fn decision_from_row(row: &rusqlite::Row<'_>) -> Result<DecisionRequest, rusqlite::Error> {
    Ok(DecisionRequest {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        post_id: row.get(2)?,
        kind: parse_enum(3, row.get::<_, String>(3)?)?,
        message: row.get(4)?,
        critical: row.get(5)?,
        status: parse_enum(6, row.get::<_, String>(6)?)?,
        created_at: row.get(7)?,
        expires_at: row.get(8)?,
        last_reminder_at: row.get(9)?,
        reminder_count: row.get(10)?,
        resolved_at: row.get(11)?,
        resolution_action: row.get(12)?,
        resolved_by: row.get(13)?,
        resolving_message_id: row.get(14)?,
    })
}

/// Create a new decision request.
pub async fn insert_decision_request(
    db: &Database,
    request: &DecisionRequest,
) -> Result<(), CrosspostError> {
    let request = request.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO decision_requests (id, campaign_id, post_id, kind, message,
                     critical, status, created_at, expires_at, last_reminder_at,
                     reminder_count, resolved_at, resolution_action, resolved_by,
                     resolving_message_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    request.id,
                    request.campaign_id,
                    request.post_id,
                    request.kind.to_string(),
                    request.message,
                    request.critical,
                    request.status.to_string(),
                    request.created_at,
                    request.expires_at,
                    request.last_reminder_at,
                    request.reminder_count,
                    request.resolved_at,
                    request.resolution_action,
                    request.resolved_by,
                    request.resolving_message_id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a decision request by ID.
pub async fn get_decision_request(
    db: &Database,
    id: &str,
) -> Result<Option<DecisionRequest>, CrosspostError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DECISION_COLUMNS} FROM decision_requests WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], decision_from_row);
            match result {
                Ok(request) => Ok(Some(request)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All requests currently in the given status, oldest first.
pub async fn list_requests_in_status(
    db: &Database,
    status: DecisionStatus,
) -> Result<Vec<DecisionRequest>, CrosspostError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DECISION_COLUMNS} FROM decision_requests
                 WHERE status = ?1 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map(params![status], decision_from_row)?;
            let mut requests = Vec::new();
            for row in rows {
                requests.push(row?);
            }
            Ok(requests)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Is there an unresolved request of this kind for this post?
/// Used to deduplicate before raising a new one.
pub async fn unresolved_request_exists(
    db: &Database,
    post_id: &str,
    kind: DecisionKind,
) -> Result<bool, CrosspostError> {
    let post_id = post_id.to_string();
    let kind = kind.to_string();
    db.connection()
        .call(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM decision_requests
                  WHERE post_id = ?1 AND kind = ?2 AND status != 'resolved')",
                params![post_id, kind],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Flip every open request past its expiry to `pending_manual` and return
/// the flipped rows. The status guard in the UPDATE makes this idempotent.
pub async fn expire_open_requests(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<Vec<DecisionRequest>, CrosspostError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let expired: Vec<String> = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM decision_requests
                     WHERE status = 'open' AND expires_at <= ?1",
                )?;
                let rows = stmt.query_map(params![now], |row| row.get(0))?;
                let mut ids = Vec::new();
                for row in rows {
                    ids.push(row?);
                }
                ids
            };
            let mut flipped = Vec::new();
            for id in &expired {
                let updated = tx.execute(
                    "UPDATE decision_requests SET status = 'pending_manual'
                     WHERE id = ?1 AND status = 'open'",
                    params![id],
                )?;
                if updated > 0 {
                    let mut stmt = tx.prepare(&format!(
                        "SELECT {DECISION_COLUMNS} FROM decision_requests WHERE id = ?1"
                    ))?;
                    flipped.push(stmt.query_row(params![id], decision_from_row)?);
                }
            }
            tx.commit()?;
            Ok(flipped)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Resolve a request. Fails with [`CrosspostError::Conflict`] if it was
/// already resolved, and [`CrosspostError::NotFound`] if it never existed.
pub async fn resolve_request(
    db: &Database,
    id: &str,
    action: &str,
    resolved_by: &str,
    message_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), CrosspostError> {
    let id_owned = id.to_string();
    let action = action.to_string();
    let resolved_by = resolved_by.to_string();
    let message_id = message_id.map(|s| s.to_string());
    let id_for_err = id.to_string();
    let (updated, exists) = db
        .connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE decision_requests
                 SET status = 'resolved', resolved_at = ?1, resolution_action = ?2,
                     resolved_by = ?3, resolving_message_id = ?4
                 WHERE id = ?5 AND status != 'resolved'",
                params![now, action, resolved_by, message_id, id_owned],
            )?;
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM decision_requests WHERE id = ?1)",
                params![id_owned],
                |row| row.get(0),
            )?;
            Ok((updated, exists))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match (updated, exists) {
        (0, false) => Err(CrosspostError::NotFound {
            kind: "decision_request",
            id: id_for_err,
        }),
        (0, true) => Err(CrosspostError::Conflict { id: id_for_err }),
        _ => Ok(()),
    }
}

/// Record that a reminder was just sent for an open request.
pub async fn mark_reminded(
    db: &Database,
    id: &str,
    now: DateTime<Utc>,
) -> Result<(), CrosspostError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE decision_requests
                 SET last_reminder_at = ?1, reminder_count = reminder_count + 1
                 WHERE id = ?2 AND status = 'open'",
                params![now, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Reopen a `pending_manual` request with a fresh expiry window.
pub async fn reopen_request(
    db: &Database,
    id: &str,
    new_expires_at: DateTime<Utc>,
) -> Result<bool, CrosspostError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE decision_requests
                 SET status = 'open', expires_at = ?1, last_reminder_at = NULL,
                     reminder_count = 0
                 WHERE id = ?2 AND status = 'pending_manual'",
                params![new_expires_at, id],
            )?;
            Ok(updated > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_request(id: &str, expires_in_minutes: i64) -> DecisionRequest {
        let now = Utc::now();
        DecisionRequest {
            id: id.to_string(),
            campaign_id: Some("camp_1".to_string()),
            post_id: Some("post_1".to_string()),
            kind: DecisionKind::Approval,
            message: "Approve launch post?".to_string(),
            critical: false,
            status: DecisionStatus::Open,
            created_at: now,
            expires_at: now + Duration::minutes(expires_in_minutes),
            last_reminder_at: None,
            reminder_count: 0,
            resolved_at: None,
            resolution_action: None,
            resolved_by: None,
            resolving_message_id: None,
        }
    }

    #[tokio::test]
    async fn expiry_flips_open_to_pending_manual_exactly_once() {
        let (db, _dir) = setup_db().await;
        insert_decision_request(&db, &make_request("dec_old", -5))
            .await
            .unwrap();
        insert_decision_request(&db, &make_request("dec_new", 30))
            .await
            .unwrap();

        let flipped = expire_open_requests(&db, Utc::now()).await.unwrap();
        assert_eq!(flipped.len(), 1);
        assert_eq!(flipped[0].id, "dec_old");
        assert_eq!(flipped[0].status, DecisionStatus::PendingManual);

        // Second pass is a no-op.
        let again = expire_open_requests(&db, Utc::now()).await.unwrap();
        assert!(again.is_empty());

        let fresh = get_decision_request(&db, "dec_new").await.unwrap().unwrap();
        assert_eq!(fresh.status, DecisionStatus::Open);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn resolve_is_single_shot() {
        let (db, _dir) = setup_db().await;
        insert_decision_request(&db, &make_request("dec_1", 30))
            .await
            .unwrap();

        resolve_request(&db, "dec_1", "approve", "42", Some("msg_9"), Utc::now())
            .await
            .unwrap();

        let stored = get_decision_request(&db, "dec_1").await.unwrap().unwrap();
        assert_eq!(stored.status, DecisionStatus::Resolved);
        assert_eq!(stored.resolution_action.as_deref(), Some("approve"));
        assert_eq!(stored.resolved_by.as_deref(), Some("42"));

        let err = resolve_request(&db, "dec_1", "reject", "42", None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CrosspostError::Conflict { .. }));

        let missing = resolve_request(&db, "dec_x", "approve", "42", None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(missing, CrosspostError::NotFound { .. }));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn dedup_sees_open_and_pending_manual() {
        let (db, _dir) = setup_db().await;
        insert_decision_request(&db, &make_request("dec_1", -5))
            .await
            .unwrap();

        assert!(
            unresolved_request_exists(&db, "post_1", DecisionKind::Approval)
                .await
                .unwrap()
        );
        assert!(
            !unresolved_request_exists(&db, "post_1", DecisionKind::Confirmation)
                .await
                .unwrap()
        );

        expire_open_requests(&db, Utc::now()).await.unwrap();
        assert!(
            unresolved_request_exists(&db, "post_1", DecisionKind::Approval)
                .await
                .unwrap()
        );

        resolve_request(&db, "dec_1", "approve", "42", None, Utc::now())
            .await
            .unwrap();
        assert!(
            !unresolved_request_exists(&db, "post_1", DecisionKind::Approval)
                .await
                .unwrap()
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reminders_and_reopen() {
        let (db, _dir) = setup_db().await;
        insert_decision_request(&db, &make_request("dec_1", -5))
            .await
            .unwrap();

        mark_reminded(&db, "dec_1", Utc::now()).await.unwrap();
        let stored = get_decision_request(&db, "dec_1").await.unwrap().unwrap();
        assert_eq!(stored.reminder_count, 1);
        assert!(stored.last_reminder_at.is_some());

        expire_open_requests(&db, Utc::now()).await.unwrap();
        // pending_manual requests do not accumulate reminders.
        mark_reminded(&db, "dec_1", Utc::now()).await.unwrap();
        let stored = get_decision_request(&db, "dec_1").await.unwrap().unwrap();
        assert_eq!(stored.reminder_count, 1);

        let reopened = reopen_request(&db, "dec_1", Utc::now() + Duration::minutes(30))
            .await
            .unwrap();
        assert!(reopened);
        let stored = get_decision_request(&db, "dec_1").await.unwrap().unwrap();
        assert_eq!(stored.status, DecisionStatus::Open);
        assert_eq!(stored.reminder_count, 0);

        db.close().await.unwrap();
    }
}
