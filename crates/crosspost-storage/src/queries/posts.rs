// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post persistence: CRUD, due-post scan, and version-guarded updates.

use chrono::{DateTime, Utc};
use crosspost_core::{CrosspostError, Post, PostState};
use rusqlite::params;

use crate::database::{Database, parse_enum};

const POST_COLUMNS: &str = "id, campaign_id, platform, content, state, approved_content_hash,
     approved_at, edited_at, scheduled_for_utc, recommended_for_utc, recommended_confidence,
     recommended_reasoning, recommendation_fallback_used, needs_verification, external_post_id,
     posted_at, last_error, created_at, updated_at, version";

fn post_from_row(row: &rusqlite::Row<'_>) -> Result<Post, rusqlite::Error> {
    Ok(Post {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        platform: parse_enum(2, row.get::<_, String>(2)?)?,
        content: row.get(3)?,
        state: parse_enum(4, row.get::<_, String>(4)?)?,
        approved_content_hash: row.get(5)?,
        approved_at: row.get(6)?,
        edited_at: row.get(7)?,
        scheduled_for_utc: row.get(8)?,
        recommended_for_utc: row.get(9)?,
        recommended_confidence: row.get(10)?,
        recommended_reasoning: row.get(11)?,
        recommendation_fallback_used: row.get(12)?,
        needs_verification: row.get(13)?,
        external_post_id: row.get(14)?,
        posted_at: row.get(15)?,
        last_error: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
        version: row.get(19)?,
    })
}

/// Create a new post.
pub async fn insert_post(db: &Database, post: &Post) -> Result<(), CrosspostError> {
    let post = post.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO posts (id, campaign_id, platform, content, state,
                     approved_content_hash, approved_at, edited_at, scheduled_for_utc,
                     recommended_for_utc, recommended_confidence, recommended_reasoning,
                     recommendation_fallback_used, needs_verification, external_post_id,
                     posted_at, last_error, created_at, updated_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                         ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
                params![
                    post.id,
                    post.campaign_id,
                    post.platform.to_string(),
                    post.content,
                    post.state.to_string(),
                    post.approved_content_hash,
                    post.approved_at,
                    post.edited_at,
                    post.scheduled_for_utc,
                    post.recommended_for_utc,
                    post.recommended_confidence,
                    post.recommended_reasoning,
                    post.recommendation_fallback_used,
                    post.needs_verification,
                    post.external_post_id,
                    post.posted_at,
                    post.last_error,
                    post.created_at,
                    post.updated_at,
                    post.version,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a post by ID.
pub async fn get_post(db: &Database, id: &str) -> Result<Option<Post>, CrosspostError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"))?;
            let result = stmt.query_row(params![id], post_from_row);
            match result {
                Ok(post) => Ok(Some(post)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List the posts of a campaign in platform order.
pub async fn list_posts_for_campaign(
    db: &Database,
    campaign_id: &str,
) -> Result<Vec<Post>, CrosspostError> {
    let campaign_id = campaign_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POST_COLUMNS} FROM posts WHERE campaign_id = ?1 ORDER BY platform"
            ))?;
            let rows = stmt.query_map(params![campaign_id], post_from_row)?;
            let mut posts = Vec::new();
            for row in rows {
                posts.push(row?);
            }
            Ok(posts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all posts in the given state, oldest scheduled time first.
pub async fn list_posts_in_state(
    db: &Database,
    state: PostState,
) -> Result<Vec<Post>, CrosspostError> {
    let state = state.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POST_COLUMNS} FROM posts WHERE state = ?1
                 ORDER BY scheduled_for_utc ASC, created_at ASC"
            ))?;
            let rows = stmt.query_map(params![state], post_from_row)?;
            let mut posts = Vec::new();
            for row in rows {
                posts.push(row?);
            }
            Ok(posts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Scheduled posts whose publish time has arrived, oldest first.
pub async fn due_posts(db: &Database, now: DateTime<Utc>) -> Result<Vec<Post>, CrosspostError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {POST_COLUMNS} FROM posts
                 WHERE state = 'scheduled' AND scheduled_for_utc IS NOT NULL
                   AND scheduled_for_utc <= ?1
                 ORDER BY scheduled_for_utc ASC"
            ))?;
            let rows = stmt.query_map(params![now], post_from_row)?;
            let mut posts = Vec::new();
            for row in rows {
                posts.push(row?);
            }
            Ok(posts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update a post, guarded by its optimistic-concurrency version.
///
/// `post.version` must match the stored row; the write bumps it by one.
/// A stale version surfaces as [`CrosspostError::Conflict`] so that two
/// racing actors can never both win the same transition.
pub async fn update_post(db: &Database, post: &Post) -> Result<(), CrosspostError> {
    let p = post.clone();
    let id = post.id.clone();
    let (updated, exists) = db
        .connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE posts
                 SET content = ?1, state = ?2, approved_content_hash = ?3, approved_at = ?4,
                     edited_at = ?5, scheduled_for_utc = ?6, recommended_for_utc = ?7,
                     recommended_confidence = ?8, recommended_reasoning = ?9,
                     recommendation_fallback_used = ?10, needs_verification = ?11,
                     external_post_id = ?12, posted_at = ?13, last_error = ?14,
                     updated_at = ?15, version = version + 1
                 WHERE id = ?16 AND version = ?17",
                params![
                    p.content,
                    p.state.to_string(),
                    p.approved_content_hash,
                    p.approved_at,
                    p.edited_at,
                    p.scheduled_for_utc,
                    p.recommended_for_utc,
                    p.recommended_confidence,
                    p.recommended_reasoning,
                    p.recommendation_fallback_used,
                    p.needs_verification,
                    p.external_post_id,
                    p.posted_at,
                    p.last_error,
                    p.updated_at,
                    p.id,
                    p.version,
                ],
            )?;
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
                params![p.id],
                |row| row.get(0),
            )?;
            Ok((updated, exists))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match (updated, exists) {
        (0, false) => Err(CrosspostError::NotFound { kind: "post", id }),
        (0, true) => Err(CrosspostError::Conflict { id }),
        _ => Ok(()),
    }
}
