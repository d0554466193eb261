// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign CRUD operations.

use crosspost_core::{Campaign, CrosspostError};
use rusqlite::params;

use crate::database::Database;

fn campaign_from_row(row: &rusqlite::Row<'_>) -> Result<Campaign, rusqlite::Error> {
    Ok(Campaign {
        id: row.get(0)?,
        source_path: row.get(1)?,
        audience_utc_offset_minutes: row.get(2)?,
        campaign_time_utc: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        version: row.get(6)?,
    })
}

const CAMPAIGN_COLUMNS: &str = "id, source_path, audience_utc_offset_minutes, campaign_time_utc,
     created_at, updated_at, version";

/// Create a new campaign.
pub async fn insert_campaign(db: &Database, campaign: &Campaign) -> Result<(), CrosspostError> {
    let campaign = campaign.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO campaigns (id, source_path, audience_utc_offset_minutes,
                     campaign_time_utc, created_at, updated_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    campaign.id,
                    campaign.source_path,
                    campaign.audience_utc_offset_minutes,
                    campaign.campaign_time_utc,
                    campaign.created_at,
                    campaign.updated_at,
                    campaign.version,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a campaign by ID.
pub async fn get_campaign(db: &Database, id: &str) -> Result<Option<Campaign>, CrosspostError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], campaign_from_row);
            match result {
                Ok(campaign) => Ok(Some(campaign)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all campaigns, newest first.
pub async fn list_campaigns(db: &Database) -> Result<Vec<Campaign>, CrosspostError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY created_at DESC"
            ))?;
            let rows = stmt.query_map([], campaign_from_row)?;
            let mut campaigns = Vec::new();
            for row in rows {
                campaigns.push(row?);
            }
            Ok(campaigns)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update a campaign, guarded by its optimistic-concurrency version.
///
/// The row is only written when the stored version still matches
/// `campaign.version`; the write bumps the version by one. A stale version
/// surfaces as [`CrosspostError::Conflict`].
pub async fn update_campaign(db: &Database, campaign: &Campaign) -> Result<(), CrosspostError> {
    let c = campaign.clone();
    let id = campaign.id.clone();
    let (updated, exists) = db
        .connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE campaigns
                 SET source_path = ?1, audience_utc_offset_minutes = ?2,
                     campaign_time_utc = ?3, updated_at = ?4, version = version + 1
                 WHERE id = ?5 AND version = ?6",
                params![
                    c.source_path,
                    c.audience_utc_offset_minutes,
                    c.campaign_time_utc,
                    c.updated_at,
                    c.id,
                    c.version,
                ],
            )?;
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM campaigns WHERE id = ?1)",
                params![c.id],
                |row| row.get(0),
            )?;
            Ok((updated, exists))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match (updated, exists) {
        (0, false) => Err(CrosspostError::NotFound {
            kind: "campaign",
            id,
        }),
        (0, true) => Err(CrosspostError::Conflict { id }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_campaign(id: &str) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: id.to_string(),
            source_path: "drafts/launch.md".to_string(),
            audience_utc_offset_minutes: -300,
            campaign_time_utc: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    #[tokio::test]
    async fn insert_and_get_roundtrips() {
        let (db, _dir) = setup_db().await;
        let campaign = make_campaign("camp_1");

        insert_campaign(&db, &campaign).await.unwrap();
        let retrieved = get_campaign(&db, "camp_1").await.unwrap().unwrap();
        assert_eq!(retrieved.source_path, "drafts/launch.md");
        assert_eq!(retrieved.audience_utc_offset_minutes, -300);
        assert_eq!(retrieved.version, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_nonexistent_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_campaign(&db, "no-such").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn stale_version_conflicts() {
        let (db, _dir) = setup_db().await;
        let campaign = make_campaign("camp_v");
        insert_campaign(&db, &campaign).await.unwrap();

        let mut fresh = campaign.clone();
        fresh.campaign_time_utc = Some(Utc::now());
        update_campaign(&db, &fresh).await.unwrap();

        // Second write with the original version must be rejected.
        let err = update_campaign(&db, &campaign).await.unwrap_err();
        assert!(matches!(err, CrosspostError::Conflict { .. }));

        let stored = get_campaign(&db, "camp_v").await.unwrap().unwrap();
        assert_eq!(stored.version, 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_missing_campaign_is_not_found() {
        let (db, _dir) = setup_db().await;
        let err = update_campaign(&db, &make_campaign("ghost")).await.unwrap_err();
        assert!(matches!(err, CrosspostError::NotFound { .. }));
        db.close().await.unwrap();
    }
}
