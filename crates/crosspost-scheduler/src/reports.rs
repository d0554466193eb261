// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Digest reports pushed over the control-plane chat.
//!
//! The worker calls [`due_digest`] each cycle; send-once-per-day is
//! enforced through control-table markers rather than wall-clock math,
//! so a worker restart never double-sends.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Timelike, Utc, Weekday};
use crosspost_core::types::DecisionStatus;
use crosspost_core::{CrosspostError, PostState};
use crosspost_storage::Database;
use crosspost_storage::queries::{controls as control_queries, decisions, events, posts};

const MORNING_DIGEST_HOUR: u32 = 8;
const MORNING_DIGEST_MINUTE: u32 = 30;
const EVENING_DIGEST_HOUR: u32 = 19;
const WEEKLY_DIGEST_HOUR: u32 = 20;

const MORNING_SENT_KEY: &str = "digest_morning_sent_date";
const EVENING_SENT_KEY: &str = "digest_evening_sent_date";
const WEEKLY_SENT_KEY: &str = "digest_weekly_sent_date";

/// A digest that is due right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    Morning,
    Evening,
    Weekly,
}

fn local(now: DateTime<Utc>, audience_offset_minutes: i32) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(audience_offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
    now.with_timezone(&offset)
}

/// Which digest, if any, should be sent this cycle?
pub async fn due_digest(
    db: &Database,
    now: DateTime<Utc>,
    audience_offset_minutes: i32,
) -> Result<Option<DigestKind>, CrosspostError> {
    let local_now = local(now, audience_offset_minutes);
    let today = local_now.format("%Y-%m-%d").to_string();
    let past = |hour: u32, minute: u32| {
        local_now.hour() > hour || (local_now.hour() == hour && local_now.minute() >= minute)
    };
    let sent = |control: Option<crosspost_core::types::SystemControl>| {
        control.is_some_and(|c| c.value == today)
    };

    if local_now.weekday() == Weekday::Mon
        && past(WEEKLY_DIGEST_HOUR, 0)
        && !sent(control_queries::get_control(db, WEEKLY_SENT_KEY).await?)
    {
        return Ok(Some(DigestKind::Weekly));
    }
    if past(EVENING_DIGEST_HOUR, 0)
        && !sent(control_queries::get_control(db, EVENING_SENT_KEY).await?)
    {
        return Ok(Some(DigestKind::Evening));
    }
    if past(MORNING_DIGEST_HOUR, MORNING_DIGEST_MINUTE)
        && !sent(control_queries::get_control(db, MORNING_SENT_KEY).await?)
    {
        return Ok(Some(DigestKind::Morning));
    }
    Ok(None)
}

/// Latch a digest as sent for the local day.
pub async fn mark_digest_sent(
    db: &Database,
    kind: DigestKind,
    now: DateTime<Utc>,
    audience_offset_minutes: i32,
) -> Result<(), CrosspostError> {
    let today = local(now, audience_offset_minutes).format("%Y-%m-%d").to_string();
    let key = match kind {
        DigestKind::Morning => MORNING_SENT_KEY,
        DigestKind::Evening => EVENING_SENT_KEY,
        DigestKind::Weekly => WEEKLY_SENT_KEY,
    };
    control_queries::set_control(db, key, &today, now).await
}

/// Build the digest text for a lookback window.
pub async fn build_digest(
    db: &Database,
    kind: DigestKind,
    now: DateTime<Utc>,
) -> Result<String, CrosspostError> {
    let (heading, since) = match kind {
        DigestKind::Morning => ("Morning digest", now - Duration::hours(12)),
        DigestKind::Evening => ("Evening digest", now - Duration::hours(12)),
        DigestKind::Weekly => ("Weekly digest", now - Duration::days(7)),
    };

    let published = events::count_events_since(db, "post_published", since).await?;
    let failed = events::count_events_since(db, "post_failed", since).await?;
    let missed = events::count_events_since(db, "post_missed_window", since).await?;
    let scheduled = posts::list_posts_in_state(db, PostState::Scheduled).await?;
    let parked = posts::list_posts_in_state(db, PostState::PendingManual).await?;
    let open = decisions::list_requests_in_status(db, DecisionStatus::Open).await?;

    let mut lines = vec![
        heading.to_string(),
        format!("Published: {published}  Failed: {failed}  Missed window: {missed}"),
        format!("Scheduled posts: {}", scheduled.len()),
    ];
    for post in scheduled.iter().take(5) {
        lines.push(format!(
            "  {} {} at {}",
            post.platform,
            post.id,
            post.scheduled_for_utc
                .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| "unset".to_string()),
        ));
    }
    if !parked.is_empty() {
        lines.push(format!("Awaiting manual decision: {}", parked.len()));
        for post in parked.iter().take(5) {
            lines.push(format!("  {} {}", post.platform, post.id));
        }
    }
    if !open.is_empty() {
        lines.push(format!("Open decision requests: {}", open.len()));
        for request in open.iter().take(5) {
            lines.push(format!("  [{}] {}", request.kind, request.id));
        }
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn digests_fire_once_per_day() {
        let (db, _dir) = setup_db().await;
        // Tuesday 14:00 UTC at UTC-5 is 09:00 local, past the morning slot.
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 14, 0, 0).unwrap();

        assert_eq!(due_digest(&db, now, -300).await.unwrap(), Some(DigestKind::Morning));
        mark_digest_sent(&db, DigestKind::Morning, now, -300).await.unwrap();
        assert_eq!(due_digest(&db, now, -300).await.unwrap(), None);

        // Past 19:00 local the evening digest becomes due.
        let evening = Utc.with_ymd_and_hms(2026, 3, 11, 0, 30, 0).unwrap();
        assert_eq!(
            due_digest(&db, evening, -300).await.unwrap(),
            Some(DigestKind::Evening)
        );
    }

    #[tokio::test]
    async fn weekly_digest_only_on_monday_evening() {
        let (db, _dir) = setup_db().await;
        // Monday 2026-03-09, 20:30 local (01:30 UTC Tuesday).
        let monday_evening = Utc.with_ymd_and_hms(2026, 3, 10, 1, 30, 0).unwrap();
        assert_eq!(
            due_digest(&db, monday_evening, -300).await.unwrap(),
            Some(DigestKind::Weekly)
        );
        mark_digest_sent(&db, DigestKind::Weekly, monday_evening, -300)
            .await
            .unwrap();
        assert_eq!(
            due_digest(&db, monday_evening, -300).await.unwrap(),
            Some(DigestKind::Evening)
        );
    }

    #[tokio::test]
    async fn digest_text_summarizes_counts() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();
        crate::events::record_event(&db, "post_published", None, None, serde_json::json!({}), now)
            .await
            .unwrap();
        let text = build_digest(&db, DigestKind::Evening, now).await.unwrap();
        assert!(text.starts_with("Evening digest"));
        assert!(text.contains("Published: 1"));
        assert!(text.contains("Scheduled posts: 0"));
    }
}
