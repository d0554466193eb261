// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Write-once audit trails: decisions, overrides, and rate-limiter events.

use chrono::{DateTime, Utc};
use crosspost_core::{CrosspostError, DecisionAudit, OverrideAudit, RateLimitEvent};
use rusqlite::params;

use crate::database::Database;

/// Record an inbound decision or control-plane action.
pub async fn insert_decision_audit(
    db: &Database,
    audit: &DecisionAudit,
) -> Result<(), CrosspostError> {
    let audit = audit.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO decision_audit (id, campaign_id, post_id, user_id, action,
                     token_id, message_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    audit.id,
                    audit.campaign_id,
                    audit.post_id,
                    audit.user_id,
                    audit.action,
                    audit.token_id,
                    audit.message_id,
                    audit.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Decision audit rows created at or after `since`, oldest first.
pub async fn list_decision_audit_since(
    db: &Database,
    since: DateTime<Utc>,
) -> Result<Vec<DecisionAudit>, CrosspostError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, campaign_id, post_id, user_id, action, token_id, message_id,
                        created_at
                 FROM decision_audit WHERE created_at >= ?1 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(params![since], |row| {
                Ok(DecisionAudit {
                    id: row.get(0)?,
                    campaign_id: row.get(1)?,
                    post_id: row.get(2)?,
                    user_id: row.get(3)?,
                    action: row.get(4)?,
                    token_id: row.get(5)?,
                    message_id: row.get(6)?,
                    created_at: row.get(7)?,
                })
            })?;
            let mut audits = Vec::new();
            for row in rows {
                audits.push(row?);
            }
            Ok(audits)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a token-gated manual override.
pub async fn insert_override_audit(
    db: &Database,
    audit: &OverrideAudit,
) -> Result<(), CrosspostError> {
    let audit = audit.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO override_audit (id, campaign_id, post_id, user_id, reason,
                     confirmation_token_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    audit.id,
                    audit.campaign_id,
                    audit.post_id,
                    audit.user_id,
                    audit.reason,
                    audit.confirmation_token_id,
                    audit.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record one rate-limiter evaluation.
pub async fn insert_rate_limit_event(
    db: &Database,
    event: &RateLimitEvent,
) -> Result<(), CrosspostError> {
    let event = event.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO rate_limit_events (id, user_id, command, window_start_utc,
                     window_end_utc, action_taken, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    event.id,
                    event.user_id,
                    event.command,
                    event.window_start_utc,
                    event.window_end_utc,
                    event.action_taken,
                    event.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Commands this user got through the limiter at or after `since`.
pub async fn count_allowed_commands_since(
    db: &Database,
    user_id: &str,
    since: DateTime<Utc>,
) -> Result<i64, CrosspostError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM rate_limit_events
                 WHERE user_id = ?1 AND action_taken = 'allowed' AND created_at >= ?2",
                params![user_id, since],
                |row| row.get(0),
            )?;
            Ok(count)
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

    fn make_rate_event(id: &str, action: &str) -> RateLimitEvent {
        let now = Utc::now();
        RateLimitEvent {
            id: id.to_string(),
            user_id: "42".to_string(),
            command: "/approve".to_string(),
            window_start_utc: now - Duration::seconds(60),
            window_end_utc: now,
            action_taken: action.to_string(),
            created_at: now,
        }
    }

    #[tokio::test]
    async fn rate_window_counts_only_allowed() {
        let (db, _dir) = setup_db().await;
        insert_rate_limit_event(&db, &make_rate_event("rl_1", "allowed")).await.unwrap();
        insert_rate_limit_event(&db, &make_rate_event("rl_2", "allowed")).await.unwrap();
        insert_rate_limit_event(&db, &make_rate_event("rl_3", "rejected")).await.unwrap();

        let since = Utc::now() - Duration::seconds(60);
        assert_eq!(count_allowed_commands_since(&db, "42", since).await.unwrap(), 2);
        assert_eq!(count_allowed_commands_since(&db, "99", since).await.unwrap(), 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn decision_audit_window() {
        let (db, _dir) = setup_db().await;
        let audit = DecisionAudit {
            id: "aud_1".to_string(),
            campaign_id: None,
            post_id: Some("post_1".to_string()),
            user_id: "42".to_string(),
            action: "approve".to_string(),
            token_id: None,
            message_id: Some("msg_1".to_string()),
            created_at: Utc::now(),
        };
        insert_decision_audit(&db, &audit).await.unwrap();

        let recent = list_decision_audit_since(&db, Utc::now() - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].action, "approve");

        let none = list_decision_audit_since(&db, Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        assert!(none.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn override_audit_inserts() {
        let (db, _dir) = setup_db().await;
        let audit = OverrideAudit {
            id: "ovr_1".to_string(),
            campaign_id: Some("camp_1".to_string()),
            post_id: "post_1".to_string(),
            user_id: "42".to_string(),
            reason: "publish now, demo starts".to_string(),
            confirmation_token_id: "tok_1".to_string(),
            created_at: Utc::now(),
        };
        insert_override_audit(&db, &audit).await.unwrap();
        db.close().await.unwrap();
    }
}
