// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Safety interlocks: the global kill switch, staged rollout gating, the
//! worker heartbeat, and the daily health gate.
//!
//! Controls live in the `system_controls` table and are read fresh on
//! every worker cycle, never cached across cycles.

use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};
use crosspost_core::ids::new_id;
use crosspost_core::types::{DecisionKind, HealthCheckStatus, controls};
use crosspost_core::{
    AttemptOutcome, CrosspostError, DecisionRequest, Platform, PostState, RolloutStage,
};
use crosspost_storage::Database;
use crosspost_storage::queries::{attempts, controls as control_queries, decisions, health, posts};
use serde_json::json;
use std::str::FromStr;
use tracing::{info, warn};

use crate::events::record_event;

/// A worker heartbeat older than this counts as a stalled worker.
pub const HEARTBEAT_STALE_MINUTES: i64 = 5;

/// Permanent failures inside this window fail the critical-failure check.
pub const CRITICAL_FAILURE_WINDOW_HOURS: i64 = 24;

/// The gate cycle rolls over at this local hour, so an 05:00 check still
/// belongs to the previous day's publishing window.
const GATE_ROLLOVER_HOUR: u32 = 6;

/// Is the global kill switch engaged?
pub async fn kill_switch_on(db: &Database) -> Result<bool, CrosspostError> {
    Ok(control_queries::get_control(db, controls::GLOBAL_PUBLISH_PAUSED)
        .await?
        .is_some_and(|c| c.value == "true"))
}

/// Engage or release the kill switch.
///
/// Releasing never resumes silently: every post whose scheduled time
/// passed while paused is parked for explicit reconfirmation, and the
/// opened requests are returned so the control plane can page them out.
pub async fn set_kill_switch(
    db: &Database,
    on: bool,
    now: DateTime<Utc>,
) -> Result<Vec<DecisionRequest>, CrosspostError> {
    control_queries::set_control(
        db,
        controls::GLOBAL_PUBLISH_PAUSED,
        if on { "true" } else { "false" },
        now,
    )
    .await?;
    record_event(
        db,
        if on { "kill_switch_on" } else { "kill_switch_off" },
        None,
        None,
        json!({}),
        now,
    )
    .await?;

    if on {
        warn!("kill switch engaged, all publishing paused");
        return Ok(Vec::new());
    }
    control_queries::delete_control(db, controls::KILL_SWITCH_ALERTED).await?;

    let mut opened = Vec::new();
    for mut post in posts::due_posts(db, now).await? {
        crosspost_core::state_machine::ensure_transition(post.state, PostState::PendingManual)?;
        post.state = PostState::PendingManual;
        post.updated_at = now;
        posts::update_post(db, &post).await?;

        if decisions::unresolved_request_exists(db, &post.id, DecisionKind::Confirmation).await? {
            continue;
        }
        let request = DecisionRequest::open(
            DecisionKind::Confirmation,
            Some(post.campaign_id.clone()),
            Some(post.id.clone()),
            format!(
                "{} post {} came due while the kill switch was engaged. Reconfirm to publish.",
                post.platform, post.id,
            ),
            false,
            now,
        );
        decisions::insert_decision_request(db, &request).await?;
        opened.push(request);
    }
    info!(reconfirmations = opened.len(), "kill switch released");
    Ok(opened)
}

/// Current rollout stage; absent or unparsable means the safest stage.
pub async fn rollout_stage(db: &Database) -> Result<RolloutStage, CrosspostError> {
    Ok(control_queries::get_control(db, controls::ROLLOUT_STAGE)
        .await?
        .and_then(|c| RolloutStage::from_str(&c.value).ok())
        .unwrap_or(RolloutStage::DryRunOnly))
}

pub async fn set_rollout_stage(
    db: &Database,
    stage: RolloutStage,
    now: DateTime<Utc>,
) -> Result<(), CrosspostError> {
    control_queries::set_control(db, controls::ROLLOUT_STAGE, &stage.to_string(), now).await?;
    record_event(
        db,
        "rollout_stage_changed",
        None,
        None,
        json!({ "stage": stage.to_string() }),
        now,
    )
    .await
}

/// May this platform publish live under the given stage?
pub fn live_allowed(stage: RolloutStage, platform: Platform) -> bool {
    match stage {
        RolloutStage::DryRunOnly => false,
        RolloutStage::LinkedinLive => platform == Platform::Linkedin,
        RolloutStage::AllLive => true,
    }
}

/// The gate cycle date (YYYY-MM-DD, audience-local) that `now` belongs
/// to. Hours before the rollover belong to the previous day.
pub fn gate_cycle_date(now: DateTime<Utc>, audience_offset_minutes: i32) -> String {
    let offset = FixedOffset::east_opt(audience_offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
    let local = now.with_timezone(&offset);
    let day = if local.hour() < GATE_ROLLOVER_HOUR {
        local - Duration::days(1)
    } else {
        local
    };
    day.format("%Y-%m-%d").to_string()
}

pub async fn record_heartbeat(db: &Database, now: DateTime<Utc>) -> Result<(), CrosspostError> {
    control_queries::set_control(db, controls::WORKER_LAST_HEARTBEAT_UTC, &now.to_rfc3339(), now)
        .await
}

/// Has the worker heartbeat been refreshed recently?
pub async fn heartbeat_fresh(db: &Database, now: DateTime<Utc>) -> Result<bool, CrosspostError> {
    let Some(control) =
        control_queries::get_control(db, controls::WORKER_LAST_HEARTBEAT_UTC).await?
    else {
        return Ok(false);
    };
    let Ok(at) = DateTime::parse_from_rfc3339(&control.value) else {
        return Ok(false);
    };
    Ok(now - at.with_timezone(&Utc) <= Duration::minutes(HEARTBEAT_STALE_MINUTES))
}

/// Run the daily health gate and record the result.
///
/// Four checks: platform tokens present, worker heartbeat fresh, kill
/// switch released, and no permanent publish failures inside the
/// lookback window. On pass the gate date is latched so later cycles on
/// the same day skip re-evaluation.
pub async fn run_health_check(
    db: &Database,
    tokens_present: bool,
    now: DateTime<Utc>,
    cycle_date: &str,
) -> Result<HealthCheckStatus, CrosspostError> {
    let token_status = if tokens_present { "pass" } else { "fail" };
    let worker_status = if heartbeat_fresh(db, now).await? {
        "pass"
    } else {
        "fail"
    };
    let kill_switch_status = if kill_switch_on(db).await? { "fail" } else { "pass" };
    let recent_permanent = attempts::count_outcomes_since(
        db,
        AttemptOutcome::PermanentFailure,
        now - Duration::hours(CRITICAL_FAILURE_WINDOW_HOURS),
    )
    .await?;
    let critical_failure_status = if recent_permanent == 0 { "pass" } else { "fail" };

    let overall = [token_status, worker_status, kill_switch_status, critical_failure_status]
        .iter()
        .all(|s| *s == "pass");
    let status = HealthCheckStatus {
        id: new_id("hc"),
        date_local: cycle_date.to_string(),
        checked_at: now,
        overall_status: if overall { "pass" } else { "fail" }.to_string(),
        token_status: token_status.to_string(),
        worker_status: worker_status.to_string(),
        kill_switch_status: kill_switch_status.to_string(),
        critical_failure_status: critical_failure_status.to_string(),
    };
    health::insert_health_check(db, &status).await?;

    if overall {
        control_queries::set_control(db, controls::HEALTH_GATE_LAST_PASS_DATE, cycle_date, now)
            .await?;
    } else {
        warn!(
            cycle_date,
            token_status,
            worker_status,
            kill_switch_status,
            critical_failure_status,
            "daily health gate failed"
        );
    }
    Ok(status)
}

/// Has the gate already passed for this cycle date?
pub async fn health_gate_passed(
    db: &Database,
    cycle_date: &str,
) -> Result<bool, CrosspostError> {
    Ok(
        control_queries::get_control(db, controls::HEALTH_GATE_LAST_PASS_DATE)
            .await?
            .is_some_and(|c| c.value == cycle_date),
    )
}

/// Minutes between recurring credential-failure alerts.
pub const TOKEN_ALERT_INTERVAL_MINUTES: i64 = 30;

/// Should a credential-failure alert go out now? Latches the alert
/// timestamp when it returns true, giving the 30-minute recurrence.
pub async fn token_failure_alert_due(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<bool, CrosspostError> {
    if let Some(control) =
        control_queries::get_control(db, controls::TOKEN_FAILURE_LAST_ALERT_UTC).await?
        && let Ok(at) = DateTime::parse_from_rfc3339(&control.value)
        && now - at.with_timezone(&Utc) < Duration::minutes(TOKEN_ALERT_INTERVAL_MINUTES)
    {
        return Ok(false);
    }
    control_queries::set_control(
        db,
        controls::TOKEN_FAILURE_LAST_ALERT_UTC,
        &now.to_rfc3339(),
        now,
    )
    .await?;
    Ok(true)
}

/// Arm a single-use bypass of a failing health gate.
pub async fn arm_health_override(db: &Database, now: DateTime<Utc>) -> Result<(), CrosspostError> {
    control_queries::set_control(db, controls::HEALTH_GATE_OVERRIDE_ONCE, "armed", now).await?;
    record_event(db, "health_gate_override_armed", None, None, json!({}), now).await
}

/// Consume the one-shot override if armed. Returns whether it fired.
pub async fn consume_health_override(db: &Database) -> Result<bool, CrosspostError> {
    control_queries::delete_control(db, controls::HEALTH_GATE_OVERRIDE_ONCE).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crosspost_core::{Campaign, Post};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        (db, dir)
    }

    async fn seed_scheduled_post(db: &Database, due_at: DateTime<Utc>) -> Post {
        let now = Utc::now();
        let campaign = Campaign {
            id: new_id("camp"),
            source_path: "drafts/a.md".into(),
            audience_utc_offset_minutes: -300,
            campaign_time_utc: Some(due_at),
            created_at: now,
            updated_at: now,
            version: 1,
        };
        crosspost_storage::queries::campaigns::insert_campaign(db, &campaign)
            .await
            .unwrap();
        let post = Post {
            id: new_id("post"),
            campaign_id: campaign.id,
            platform: Platform::Linkedin,
            content: "body".into(),
            state: PostState::Scheduled,
            approved_content_hash: Some("h".into()),
            approved_at: Some(now),
            edited_at: Some(now),
            scheduled_for_utc: Some(due_at),
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
        };
        posts::insert_post(db, &post).await.unwrap();
        post
    }

    #[tokio::test]
    async fn kill_switch_round_trip() {
        let (db, _dir) = setup_db().await;
        assert!(!kill_switch_on(&db).await.unwrap());
        set_kill_switch(&db, true, Utc::now()).await.unwrap();
        assert!(kill_switch_on(&db).await.unwrap());
        set_kill_switch(&db, false, Utc::now()).await.unwrap();
        assert!(!kill_switch_on(&db).await.unwrap());
    }

    #[tokio::test]
    async fn releasing_kill_switch_parks_missed_posts() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();
        let post = seed_scheduled_post(&db, now - Duration::minutes(10)).await;

        set_kill_switch(&db, true, now).await.unwrap();
        let opened = set_kill_switch(&db, false, now).await.unwrap();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].post_id.as_deref(), Some(post.id.as_str()));

        let stored = posts::get_post(&db, &post.id).await.unwrap().unwrap();
        assert_eq!(stored.state, PostState::PendingManual);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn rollout_stage_defaults_to_dry_run() {
        let (db, _dir) = setup_db().await;
        assert_eq!(rollout_stage(&db).await.unwrap(), RolloutStage::DryRunOnly);
        set_rollout_stage(&db, RolloutStage::LinkedinLive, Utc::now())
            .await
            .unwrap();
        assert_eq!(rollout_stage(&db).await.unwrap(), RolloutStage::LinkedinLive);
    }

    #[test]
    fn live_allowed_follows_the_stage() {
        assert!(!live_allowed(RolloutStage::DryRunOnly, Platform::Linkedin));
        assert!(live_allowed(RolloutStage::LinkedinLive, Platform::Linkedin));
        assert!(!live_allowed(RolloutStage::LinkedinLive, Platform::X));
        assert!(live_allowed(RolloutStage::AllLive, Platform::X));
    }

    #[test]
    fn gate_cycle_date_rolls_over_at_six_local() {
        // 09:00 UTC at UTC-5 is 04:00 local, before rollover.
        let early = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        assert_eq!(gate_cycle_date(early, -300), "2026-03-09");
        // 12:00 UTC at UTC-5 is 07:00 local.
        let later = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(gate_cycle_date(later, -300), "2026-03-10");
    }

    #[tokio::test]
    async fn heartbeat_staleness() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();
        assert!(!heartbeat_fresh(&db, now).await.unwrap());
        record_heartbeat(&db, now - Duration::minutes(3)).await.unwrap();
        assert!(heartbeat_fresh(&db, now).await.unwrap());
        record_heartbeat(&db, now - Duration::minutes(10)).await.unwrap();
        assert!(!heartbeat_fresh(&db, now).await.unwrap());
    }

    #[tokio::test]
    async fn health_gate_latches_pass_date() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();
        let cycle = gate_cycle_date(now, -300);

        // Stalled worker fails the gate.
        let status = run_health_check(&db, true, now, &cycle).await.unwrap();
        assert!(!status.passed());
        assert!(!health_gate_passed(&db, &cycle).await.unwrap());

        record_heartbeat(&db, now).await.unwrap();
        let status = run_health_check(&db, true, now, &cycle).await.unwrap();
        assert!(status.passed());
        assert!(health_gate_passed(&db, &cycle).await.unwrap());
        assert!(!health_gate_passed(&db, "1999-01-01").await.unwrap());
    }

    #[tokio::test]
    async fn token_failure_alerts_recur_every_thirty_minutes() {
        let (db, _dir) = setup_db().await;
        let t0 = Utc::now();
        assert!(token_failure_alert_due(&db, t0).await.unwrap());
        assert!(!token_failure_alert_due(&db, t0 + Duration::minutes(10)).await.unwrap());
        assert!(token_failure_alert_due(&db, t0 + Duration::minutes(31)).await.unwrap());
    }

    #[tokio::test]
    async fn health_override_is_single_use() {
        let (db, _dir) = setup_db().await;
        assert!(!consume_health_override(&db).await.unwrap());
        arm_health_override(&db, Utc::now()).await.unwrap();
        assert!(consume_health_override(&db).await.unwrap());
        assert!(!consume_health_override(&db).await.unwrap());
    }
}
