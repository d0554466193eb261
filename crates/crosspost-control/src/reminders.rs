// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decision-request expiry, reminders, and quiet-hour suppression.

use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};
use crosspost_core::types::DECISION_EXPIRY_MINUTES;
use crosspost_core::{CrosspostError, DecisionRequest};
use crosspost_storage::Database;
use crosspost_storage::queries::decisions;

/// Minutes between reminders for an open request.
pub const REMINDER_INTERVAL_MINUTES: i64 = 10;

/// Reminders sent per request before it is left to expire.
pub const MAX_REMINDERS: i64 = 2;

const QUIET_START_HOUR: u32 = 23;
const QUIET_END_HOUR: u32 = 6;

/// Is the audience-local clock inside quiet hours (23:00-06:00)?
pub fn in_quiet_hours(now: DateTime<Utc>, audience_offset_minutes: i32) -> bool {
    let offset = FixedOffset::east_opt(audience_offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
    let hour = now.with_timezone(&offset).hour();
    hour >= QUIET_START_HOUR || hour < QUIET_END_HOUR
}

/// One maintenance sweep over open decision requests.
#[derive(Debug, Default)]
pub struct MaintenanceReport {
    /// Requests that expired this sweep and parked as pending_manual.
    pub expired: Vec<DecisionRequest>,
    /// Open requests due a reminder this sweep (already marked reminded).
    pub reminders: Vec<DecisionRequest>,
}

/// Expire overdue requests, then pick reminders for the still-open ones.
///
/// Non-critical reminders are suppressed during quiet hours; expiry is
/// never suppressed, since parking is silent.
pub async fn sweep(
    db: &Database,
    now: DateTime<Utc>,
    audience_offset_minutes: i32,
) -> Result<MaintenanceReport, CrosspostError> {
    let expired = decisions::expire_open_requests(db, now).await?;

    let quiet = in_quiet_hours(now, audience_offset_minutes);
    let mut reminders = Vec::new();
    for request in
        decisions::list_requests_in_status(db, crosspost_core::DecisionStatus::Open).await?
    {
        if request.reminder_count >= MAX_REMINDERS {
            continue;
        }
        if quiet && !request.critical {
            continue;
        }
        let last = request.last_reminder_at.unwrap_or(request.created_at);
        if now - last < Duration::minutes(REMINDER_INTERVAL_MINUTES) {
            continue;
        }
        decisions::mark_reminded(db, &request.id, now).await?;
        reminders.push(request);
    }
    Ok(MaintenanceReport { expired, reminders })
}

/// Reopen a parked request with a fresh 30-minute window. Returns false
/// when the request is not in `pending_manual`.
pub async fn refresh_expired_request(
    db: &Database,
    request_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, CrosspostError> {
    decisions::reopen_request(db, request_id, now + Duration::minutes(DECISION_EXPIRY_MINUTES))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crosspost_core::DecisionStatus;
    use crosspost_core::types::DecisionKind;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        (db, dir)
    }

    fn open_request(message: &str, critical: bool, now: DateTime<Utc>) -> DecisionRequest {
        DecisionRequest::open(
            DecisionKind::Confirmation,
            None,
            Some("post_1".into()),
            message.into(),
            critical,
            now,
        )
    }

    #[test]
    fn quiet_hours_wrap_midnight() {
        // 04:30 UTC at UTC-5 is 23:30 local.
        let late = Utc.with_ymd_and_hms(2026, 3, 10, 4, 30, 0).unwrap();
        assert!(in_quiet_hours(late, -300));
        // 10:30 UTC is 05:30 local.
        let early = Utc.with_ymd_and_hms(2026, 3, 10, 10, 30, 0).unwrap();
        assert!(in_quiet_hours(early, -300));
        // 15:00 UTC is 10:00 local.
        let midday = Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap();
        assert!(!in_quiet_hours(midday, -300));
    }

    #[tokio::test]
    async fn sweep_reminds_then_expires() {
        let (db, _dir) = setup_db().await;
        // Midday local so quiet hours do not interfere.
        let t0 = Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap();
        let request = open_request("Reconfirm?", false, t0);
        decisions::insert_decision_request(&db, &request).await.unwrap();

        // Too soon for a reminder.
        let report = sweep(&db, t0 + Duration::minutes(5), -300).await.unwrap();
        assert!(report.reminders.is_empty());

        // First and second reminders at the 10-minute cadence.
        let report = sweep(&db, t0 + Duration::minutes(11), -300).await.unwrap();
        assert_eq!(report.reminders.len(), 1);
        let report = sweep(&db, t0 + Duration::minutes(22), -300).await.unwrap();
        assert_eq!(report.reminders.len(), 1);

        // Past expiry: parked, no third reminder.
        let report = sweep(&db, t0 + Duration::minutes(31), -300).await.unwrap();
        assert_eq!(report.expired.len(), 1);
        assert!(report.reminders.is_empty());
        let stored = decisions::get_decision_request(&db, &request.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, DecisionStatus::PendingManual);
    }

    #[tokio::test]
    async fn quiet_hours_suppress_only_non_critical() {
        let (db, _dir) = setup_db().await;
        // 04:30 UTC at UTC-5 is 23:30 local.
        let quiet_now = Utc.with_ymd_and_hms(2026, 3, 10, 4, 30, 0).unwrap();
        let t0 = quiet_now - Duration::minutes(15);
        decisions::insert_decision_request(&db, &open_request("routine", false, t0))
            .await
            .unwrap();
        decisions::insert_decision_request(&db, &open_request("urgent", true, t0))
            .await
            .unwrap();

        let report = sweep(&db, quiet_now, -300).await.unwrap();
        assert_eq!(report.reminders.len(), 1);
        assert!(report.reminders[0].critical);
    }

    #[tokio::test]
    async fn refresh_reopens_only_parked_requests() {
        let (db, _dir) = setup_db().await;
        let t0 = Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap();
        let request = open_request("Reconfirm?", false, t0);
        decisions::insert_decision_request(&db, &request).await.unwrap();

        assert!(!refresh_expired_request(&db, &request.id, t0).await.unwrap());
        sweep(&db, t0 + Duration::minutes(31), -300).await.unwrap();
        assert!(
            refresh_expired_request(&db, &request.id, t0 + Duration::minutes(32))
                .await
                .unwrap()
        );
        let stored = decisions::get_decision_request(&db, &request.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, DecisionStatus::Open);
        assert_eq!(stored.reminder_count, 0);
    }
}
