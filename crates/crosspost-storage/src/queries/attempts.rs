// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only publish attempt history.
//!
//! Attempts are never updated or deleted. The success-by-idempotency-key
//! lookup is what gives the worker its at-most-once guarantee: before any
//! publish, history is consulted for a prior success under the same key.

use chrono::{DateTime, Utc};
use crosspost_core::{Attempt, AttemptOutcome, CrosspostError};
use rusqlite::params;

use crate::database::{Database, parse_enum};

const ATTEMPT_COLUMNS: &str = "id, post_id, attempt_number, started_at, finished_at, outcome,
     error_redacted, idempotency_key, external_post_id";

fn attempt_from_row(row: &rusqlite::Row<'_>) -> Result<Attempt, rusqlite::Error> {
    Ok(Attempt {
        id: row.get(0)?,
        post_id: row.get(1)?,
        attempt_number: row.get(2)?,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        outcome: parse_enum(5, row.get::<_, String>(5)?)?,
        error_redacted: row.get(6)?,
        idempotency_key: row.get(7)?,
        external_post_id: row.get(8)?,
    })
}

/// Record a finished attempt.
pub async fn insert_attempt(db: &Database, attempt: &Attempt) -> Result<(), CrosspostError> {
    let attempt = attempt.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO attempts (id, post_id, attempt_number, started_at, finished_at,
                     outcome, error_redacted, idempotency_key, external_post_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    attempt.id,
                    attempt.post_id,
                    attempt.attempt_number,
                    attempt.started_at,
                    attempt.finished_at,
                    attempt.outcome.to_string(),
                    attempt.error_redacted,
                    attempt.idempotency_key,
                    attempt.external_post_id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Full attempt history for a post, in attempt order.
pub async fn list_attempts_for_post(
    db: &Database,
    post_id: &str,
) -> Result<Vec<Attempt>, CrosspostError> {
    let post_id = post_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ATTEMPT_COLUMNS} FROM attempts
                 WHERE post_id = ?1 ORDER BY attempt_number ASC"
            ))?;
            let rows = stmt.query_map(params![post_id], attempt_from_row)?;
            let mut attempts = Vec::new();
            for row in rows {
                attempts.push(row?);
            }
            Ok(attempts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The attempt number the next try of this post should carry (1-based).
pub async fn next_attempt_number(db: &Database, post_id: &str) -> Result<i64, CrosspostError> {
    let post_id = post_id.to_string();
    db.connection()
        .call(move |conn| {
            let max: Option<i64> = conn.query_row(
                "SELECT MAX(attempt_number) FROM attempts WHERE post_id = ?1",
                params![post_id],
                |row| row.get(0),
            )?;
            Ok(max.unwrap_or(0) + 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Find a prior successful attempt under this idempotency key, if any.
pub async fn find_success_for_key(
    db: &Database,
    idempotency_key: &str,
) -> Result<Option<Attempt>, CrosspostError> {
    let key = idempotency_key.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ATTEMPT_COLUMNS} FROM attempts
                 WHERE idempotency_key = ?1 AND outcome = 'success'
                 ORDER BY finished_at DESC LIMIT 1"
            ))?;
            let result = stmt.query_row(params![key], attempt_from_row);
            match result {
                Ok(attempt) => Ok(Some(attempt)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count attempts with the given outcome finished at or after `since`.
/// Feeds the daily health gate's critical-failure check.
pub async fn count_outcomes_since(
    db: &Database,
    outcome: AttemptOutcome,
    since: DateTime<Utc>,
) -> Result<i64, CrosspostError> {
    let outcome = outcome.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM attempts WHERE outcome = ?1 AND finished_at >= ?2",
                params![outcome, since],
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
    use crosspost_core::{Campaign, Platform, Post, PostState};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let now = Utc::now();
        crate::queries::campaigns::insert_campaign(
            &db,
            &Campaign {
                id: "camp_1".to_string(),
                source_path: "drafts/a.md".to_string(),
                audience_utc_offset_minutes: 0,
                campaign_time_utc: None,
                created_at: now,
                updated_at: now,
                version: 1,
            },
        )
        .await
        .unwrap();
        crate::queries::posts::insert_post(
            &db,
            &Post {
                id: "post_1".to_string(),
                campaign_id: "camp_1".to_string(),
                platform: Platform::Linkedin,
                content: "hello world content".to_string(),
                state: PostState::Scheduled,
                approved_content_hash: None,
                approved_at: None,
                edited_at: None,
                scheduled_for_utc: None,
                recommended_for_utc: None,
                recommended_confidence: None,
                recommended_reasoning: None,
                recommendation_fallback_used: false,
                needs_verification: false,
                external_post_id: None,
                posted_at: None,
                last_error: None,
                created_at: now,
                updated_at: now,
                version: 1,
            },
        )
        .await
        .unwrap();
        (db, dir)
    }

    fn make_attempt(id: &str, number: i64, outcome: AttemptOutcome) -> Attempt {
        let now = Utc::now();
        Attempt {
            id: id.to_string(),
            post_id: "post_1".to_string(),
            attempt_number: number,
            started_at: now,
            finished_at: now,
            outcome,
            error_redacted: None,
            idempotency_key: "key-abc".to_string(),
            external_post_id: None,
        }
    }

    #[tokio::test]
    async fn attempt_numbers_are_sequential() {
        let (db, _dir) = setup_db().await;
        assert_eq!(next_attempt_number(&db, "post_1").await.unwrap(), 1);

        insert_attempt(&db, &make_attempt("att_1", 1, AttemptOutcome::TransientFailure))
            .await
            .unwrap();
        assert_eq!(next_attempt_number(&db, "post_1").await.unwrap(), 2);

        insert_attempt(&db, &make_attempt("att_2", 2, AttemptOutcome::Success))
            .await
            .unwrap();
        assert_eq!(next_attempt_number(&db, "post_1").await.unwrap(), 3);

        let history = list_attempts_for_post(&db, "post_1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].attempt_number, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn success_lookup_ignores_failures() {
        let (db, _dir) = setup_db().await;
        insert_attempt(&db, &make_attempt("att_1", 1, AttemptOutcome::TransientFailure))
            .await
            .unwrap();
        assert!(find_success_for_key(&db, "key-abc").await.unwrap().is_none());

        let mut ok = make_attempt("att_2", 2, AttemptOutcome::Success);
        ok.external_post_id = Some("li_123".to_string());
        insert_attempt(&db, &ok).await.unwrap();

        let found = find_success_for_key(&db, "key-abc").await.unwrap().unwrap();
        assert_eq!(found.external_post_id.as_deref(), Some("li_123"));
        assert!(find_success_for_key(&db, "other-key").await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn outcome_counts_respect_window() {
        let (db, _dir) = setup_db().await;
        insert_attempt(&db, &make_attempt("att_1", 1, AttemptOutcome::PermanentFailure))
            .await
            .unwrap();

        let recent = count_outcomes_since(
            &db,
            AttemptOutcome::PermanentFailure,
            Utc::now() - Duration::hours(1),
        )
        .await
        .unwrap();
        assert_eq!(recent, 1);

        let future = count_outcomes_since(
            &db,
            AttemptOutcome::PermanentFailure,
            Utc::now() + Duration::hours(1),
        )
        .await
        .unwrap();
        assert_eq!(future, 0);

        db.close().await.unwrap();
    }
}
