// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign and post operations.
//!
//! Every state transition is validated against the lifecycle table after
//! re-reading the row from storage, and every write goes through the
//! version-guarded update, so a racing worker and operator can never both
//! win the same edge.

use chrono::{DateTime, Duration, Utc};
use crosspost_core::ids::new_id;
use crosspost_core::preflight::{PreflightStage, validate_post};
use crosspost_core::state_machine::ensure_transition;
use crosspost_core::timing::{
    CONFIDENCE_THRESHOLD, HistorySignal, MAX_HORIZON_DAYS, Recommendation, recommend_post_time,
};
use crosspost_core::types::DecisionKind;
use crosspost_core::{
    Campaign, CrosspostError, DecisionRequest, Platform, Post, PostState, hashing,
};
use crosspost_storage::Database;
use crosspost_storage::queries::{campaigns, decisions, posts};
use serde_json::json;
use tracing::{info, warn};

use crate::drafting;
use crate::events::record_event;

/// A scheduled post whose window was missed by more than this is never
/// auto-published; it parks for reconfirmation instead.
pub const MISSED_WINDOW_HOURS: i64 = 2;

/// The scheduling service.
#[derive(Clone)]
pub struct Scheduler {
    db: Database,
    default_audience_offset_minutes: i32,
}

impl Scheduler {
    pub fn new(db: Database, default_audience_offset_minutes: i32) -> Self {
        Self {
            db,
            default_audience_offset_minutes,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Create a campaign from a markdown source document, drafting one
    /// post per platform.
    pub async fn create_campaign(
        &self,
        source_path: &str,
        audience_offset_minutes: Option<i32>,
    ) -> Result<(Campaign, Vec<Post>), CrosspostError> {
        let source = tokio::fs::read_to_string(source_path)
            .await
            .map_err(|e| CrosspostError::validation(format!("cannot read {source_path}: {e}")))?;
        if source.trim().is_empty() {
            return Err(CrosspostError::validation(format!("{source_path} is empty")));
        }

        let now = Utc::now();
        let campaign = Campaign {
            id: new_id("camp"),
            source_path: source_path.to_string(),
            audience_utc_offset_minutes: audience_offset_minutes
                .unwrap_or(self.default_audience_offset_minutes),
            campaign_time_utc: None,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        campaigns::insert_campaign(&self.db, &campaign).await?;

        let mut drafted = Vec::with_capacity(Platform::ALL.len());
        for platform in Platform::ALL {
            let content = match platform {
                Platform::Linkedin => drafting::draft_linkedin(&source, source_path),
                Platform::X => drafting::draft_x(&source, source_path),
            };
            let post = Post {
                id: new_id("post"),
                campaign_id: campaign.id.clone(),
                platform,
                content,
                state: PostState::Draft,
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
            };
            posts::insert_post(&self.db, &post).await?;
            drafted.push(post);
        }

        record_event(
            &self.db,
            "campaign_created",
            Some(&campaign.id),
            None,
            json!({ "source_path": source_path }),
            now,
        )
        .await?;
        info!(campaign_id = %campaign.id, source_path, "campaign created");
        Ok((campaign, drafted))
    }

    /// Replace a post's content. Draft posts auto-advance to
    /// ready_for_approval; the edit timestamp is what later satisfies the
    /// human-edit approval requirement.
    pub async fn edit_post(&self, post_id: &str, content: &str) -> Result<Post, CrosspostError> {
        let mut post = self.require_post(post_id).await?;
        if post.state.is_terminal() {
            return Err(CrosspostError::validation(format!(
                "post {post_id} is {} and can no longer be edited",
                post.state
            )));
        }
        let now = Utc::now();
        post.content = content.to_string();
        post.edited_at = Some(now);
        if post.state == PostState::Draft {
            ensure_transition(post.state, PostState::ReadyForApproval)?;
            post.state = PostState::ReadyForApproval;
        }
        post.updated_at = now;
        posts::update_post(&self.db, &post).await?;
        post.version += 1;
        Ok(post)
    }

    /// Run the timing engine for a campaign and stamp the recommendation
    /// on its non-terminal posts.
    pub async fn analyze_optimal_time(
        &self,
        campaign_id: &str,
        history: Option<&HistorySignal>,
        now: DateTime<Utc>,
    ) -> Result<Recommendation, CrosspostError> {
        let campaign = self.require_campaign(campaign_id).await?;
        let rec = recommend_post_time(now, campaign.audience_utc_offset_minutes, history);

        for mut post in posts::list_posts_for_campaign(&self.db, campaign_id).await? {
            if post.state.is_terminal() {
                continue;
            }
            post.recommended_for_utc = Some(rec.recommended_time_utc);
            post.recommended_confidence = Some(rec.confidence);
            post.recommended_reasoning = Some(rec.reasoning_summary.clone());
            post.recommendation_fallback_used = rec.fallback_used;
            post.updated_at = now;
            posts::update_post(&self.db, &post).await?;
        }
        Ok(rec)
    }

    /// Approve a campaign: verify the two platform posts were human-edited
    /// and pass preflight, freeze their content hashes, then either
    /// auto-schedule at the recommended time or, below the confidence
    /// threshold, hold at approved behind a confirmation request.
    pub async fn approve_campaign(
        &self,
        campaign_id: &str,
        history: Option<&HistorySignal>,
        now: DateTime<Utc>,
    ) -> Result<ApprovalOutcome, CrosspostError> {
        let campaign = self.require_campaign(campaign_id).await?;
        let campaign_posts = posts::list_posts_for_campaign(&self.db, campaign_id).await?;
        if campaign_posts.len() != Platform::ALL.len() {
            return Err(CrosspostError::validation(format!(
                "campaign {campaign_id} has {} posts, expected one per platform",
                campaign_posts.len()
            )));
        }

        let mut reasons = Vec::new();
        for post in &campaign_posts {
            if post.edited_at.is_none() {
                reasons.push(format!(
                    "{} post {} was never human-edited",
                    post.platform, post.id
                ));
            }
            let result = validate_post(post, PreflightStage::PreApproval);
            reasons.extend(
                result
                    .errors
                    .into_iter()
                    .map(|e| format!("{} post: {e}", post.platform)),
            );
            if let Err(e) = ensure_transition(post.state, PostState::Approved) {
                reasons.push(e.to_string());
            }
        }
        if !reasons.is_empty() {
            return Err(CrosspostError::Validation { reasons });
        }

        let mut approved = Vec::with_capacity(campaign_posts.len());
        for mut post in campaign_posts {
            post.state = PostState::Approved;
            post.approved_at = Some(now);
            // Frozen once; never recomputed even if content were edited
            // again through an illegal path.
            if post.approved_content_hash.is_none() {
                post.approved_content_hash = Some(hashing::content_hash(&post.content));
            }
            post.updated_at = now;
            posts::update_post(&self.db, &post).await?;
            post.version += 1;
            approved.push(post);
        }
        record_event(
            &self.db,
            "campaign_approved",
            Some(campaign_id),
            None,
            json!({}),
            now,
        )
        .await?;

        let rec = recommend_post_time(now, campaign.audience_utc_offset_minutes, history);
        for post in &mut approved {
            post.recommended_for_utc = Some(rec.recommended_time_utc);
            post.recommended_confidence = Some(rec.confidence);
            post.recommended_reasoning = Some(rec.reasoning_summary.clone());
            post.recommendation_fallback_used = rec.fallback_used;
            post.updated_at = now;
            posts::update_post(&self.db, post).await?;
            post.version += 1;
        }

        if rec.confidence < CONFIDENCE_THRESHOLD {
            // Blocked approved -> scheduled edge: hold for an explicit
            // operator confirmation.
            let request = DecisionRequest::open(
                DecisionKind::LowConfidenceConfirm,
                Some(campaign_id.to_string()),
                None,
                format!(
                    "Timing confidence {:.2} is below {CONFIDENCE_THRESHOLD}. {} Confirm \
                     scheduling for {}?",
                    rec.confidence,
                    rec.reasoning_summary,
                    rec.recommended_time_utc.format("%Y-%m-%d %H:%M UTC"),
                ),
                false,
                now,
            );
            decisions::insert_decision_request(&self.db, &request).await?;
            warn!(
                campaign_id,
                confidence = rec.confidence,
                "low-confidence recommendation, holding for confirmation"
            );
            return Ok(ApprovalOutcome::HeldForConfirmation {
                recommendation: rec,
                request,
            });
        }

        self.schedule_campaign(campaign_id, rec.recommended_time_utc, now)
            .await?;
        Ok(ApprovalOutcome::Scheduled { recommendation: rec })
    }

    /// Schedule every post of a campaign at one shared time. Future-only,
    /// at most 30 days out.
    pub async fn schedule_campaign(
        &self,
        campaign_id: &str,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), CrosspostError> {
        if at <= now {
            return Err(CrosspostError::validation(format!(
                "scheduled time {at} is not in the future"
            )));
        }
        if at > now + Duration::days(MAX_HORIZON_DAYS) {
            return Err(CrosspostError::validation(format!(
                "scheduled time {at} is more than {MAX_HORIZON_DAYS} days out"
            )));
        }

        let mut campaign = self.require_campaign(campaign_id).await?;
        let campaign_posts = posts::list_posts_for_campaign(&self.db, campaign_id).await?;

        let mut reasons = Vec::new();
        for post in &campaign_posts {
            let result = validate_post(post, PreflightStage::PreSchedule);
            reasons.extend(
                result
                    .errors
                    .into_iter()
                    .map(|e| format!("{} post: {e}", post.platform)),
            );
            if let Err(e) = ensure_transition(post.state, PostState::Scheduled) {
                reasons.push(e.to_string());
            }
        }
        if !reasons.is_empty() {
            return Err(CrosspostError::Validation { reasons });
        }

        for mut post in campaign_posts {
            post.state = PostState::Scheduled;
            post.scheduled_for_utc = Some(at);
            post.updated_at = now;
            posts::update_post(&self.db, &post).await?;
        }
        campaign.campaign_time_utc = Some(at);
        campaign.updated_at = now;
        campaigns::update_campaign(&self.db, &campaign).await?;

        record_event(
            &self.db,
            "campaign_scheduled",
            Some(campaign_id),
            None,
            json!({ "scheduled_for_utc": at.to_rfc3339() }),
            now,
        )
        .await?;
        info!(campaign_id, %at, "campaign scheduled");
        Ok(())
    }

    /// Cancel a post.
    pub async fn cancel_post(&self, post_id: &str) -> Result<Post, CrosspostError> {
        let mut post = self.require_post(post_id).await?;
        ensure_transition(post.state, PostState::Canceled)?;
        let now = Utc::now();
        post.state = PostState::Canceled;
        post.updated_at = now;
        posts::update_post(&self.db, &post).await?;
        post.version += 1;
        record_event(
            &self.db,
            "post_canceled",
            Some(&post.campaign_id),
            Some(post_id),
            json!({}),
            now,
        )
        .await?;
        Ok(post)
    }

    /// Re-queue a failed post for immediate execution.
    pub async fn retry_failed_post(
        &self,
        post_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Post, CrosspostError> {
        let mut post = self.require_post(post_id).await?;
        ensure_transition(post.state, PostState::Scheduled)?;
        if post.state != PostState::Failed {
            return Err(CrosspostError::validation(format!(
                "post {post_id} is {}, only failed posts can be retried",
                post.state
            )));
        }
        post.state = PostState::Scheduled;
        post.scheduled_for_utc = Some(now);
        post.updated_at = now;
        posts::update_post(&self.db, &post).await?;
        post.version += 1;
        record_event(
            &self.db,
            "post_retry_requested",
            Some(&post.campaign_id),
            Some(post_id),
            json!({}),
            now,
        )
        .await?;
        Ok(post)
    }

    /// Reschedule a parked or failed post to now. Token verification and
    /// audit are the control plane's responsibility; this only performs
    /// the ledger move.
    pub async fn override_publish_now(
        &self,
        post_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Post, CrosspostError> {
        let mut post = self.require_post(post_id).await?;
        if post.state != PostState::Scheduled {
            ensure_transition(post.state, PostState::Scheduled)?;
            post.state = PostState::Scheduled;
        }
        post.scheduled_for_utc = Some(now);
        post.needs_verification = false;
        post.updated_at = now;
        posts::update_post(&self.db, &post).await?;
        post.version += 1;
        record_event(
            &self.db,
            "manual_override_publish",
            Some(&post.campaign_id),
            Some(post_id),
            json!({}),
            now,
        )
        .await?;
        Ok(post)
    }

    /// Is this due post still inside its 2-hour publish window?
    pub fn within_publish_window(post: &Post, now: DateTime<Utc>) -> bool {
        match post.scheduled_for_utc {
            Some(at) => now - at <= Duration::hours(MISSED_WINDOW_HOURS),
            None => false,
        }
    }

    /// Park a post whose window was missed: pending_manual plus a
    /// reconfirmation request (deduplicated against an unresolved one).
    pub async fn park_missed_post(
        &self,
        post: &Post,
        now: DateTime<Utc>,
    ) -> Result<Option<DecisionRequest>, CrosspostError> {
        let mut post = self.require_post(&post.id).await?;
        ensure_transition(post.state, PostState::PendingManual)?;
        post.state = PostState::PendingManual;
        post.updated_at = now;
        posts::update_post(&self.db, &post).await?;
        record_event(
            &self.db,
            "post_missed_window",
            Some(&post.campaign_id),
            Some(&post.id),
            json!({ "scheduled_for_utc": post.scheduled_for_utc.map(|t| t.to_rfc3339()) }),
            now,
        )
        .await?;

        if decisions::unresolved_request_exists(&self.db, &post.id, DecisionKind::Confirmation)
            .await?
        {
            return Ok(None);
        }
        let request = DecisionRequest::open(
            DecisionKind::Confirmation,
            Some(post.campaign_id.clone()),
            Some(post.id.clone()),
            format!(
                "{} post {} missed its window ({}). Publish now, reschedule, or cancel?",
                post.platform,
                post.id,
                post.scheduled_for_utc
                    .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
            false,
            now,
        );
        decisions::insert_decision_request(&self.db, &request).await?;
        Ok(Some(request))
    }

    pub async fn require_post(&self, post_id: &str) -> Result<Post, CrosspostError> {
        posts::get_post(&self.db, post_id)
            .await?
            .ok_or_else(|| CrosspostError::NotFound {
                kind: "post",
                id: post_id.to_string(),
            })
    }

    pub async fn require_campaign(&self, campaign_id: &str) -> Result<Campaign, CrosspostError> {
        campaigns::get_campaign(&self.db, campaign_id)
            .await?
            .ok_or_else(|| CrosspostError::NotFound {
                kind: "campaign",
                id: campaign_id.to_string(),
            })
    }
}

/// Result of [`Scheduler::approve_campaign`].
#[derive(Debug, Clone)]
pub enum ApprovalOutcome {
    /// Confidence cleared the threshold; the campaign is scheduled at the
    /// recommended time.
    Scheduled { recommendation: Recommendation },
    /// Confidence was below threshold; posts stay approved behind an open
    /// confirmation request.
    HeldForConfirmation {
        recommendation: Recommendation,
        request: DecisionRequest,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosspost_core::DecisionStatus;
    use std::io::Write as _;
    use tempfile::tempdir;

    const SOURCE: &str = "# The launch post\n\n\
        First paragraph with more than enough words to satisfy the body \
        validation requirements of every platform preflight check easily \
        and then some extra for margin.\n\n\
        Second paragraph with additional detail about the launch and why \
        anyone should care about it at all.\n";

    async fn setup() -> (Scheduler, tempfile::TempDir, String) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        let source_path = dir.path().join("launch.md");
        let mut f = std::fs::File::create(&source_path).unwrap();
        f.write_all(SOURCE.as_bytes()).unwrap();
        let scheduler = Scheduler::new(db, -300);
        (scheduler, dir, source_path.to_str().unwrap().to_string())
    }

    fn flat_history() -> HistorySignal {
        HistorySignal {
            weekday_scores: [0.8; 7],
        }
    }

    /// Edit both posts so approval's human-edit requirement is satisfied.
    async fn edit_all(scheduler: &Scheduler, campaign_id: &str) {
        let all = posts::list_posts_for_campaign(scheduler.database(), campaign_id)
            .await
            .unwrap();
        for post in all {
            let edited = format!("{}\n\nHand-tuned closing line for this platform.", post.content);
            scheduler.edit_post(&post.id, &edited).await.unwrap();
        }
    }

    #[tokio::test]
    async fn create_campaign_drafts_one_post_per_platform() {
        let (scheduler, _dir, source_path) = setup().await;
        let (campaign, drafted) = scheduler.create_campaign(&source_path, None).await.unwrap();

        assert_eq!(campaign.audience_utc_offset_minutes, -300);
        assert_eq!(drafted.len(), 2);
        assert_eq!(drafted[0].platform, Platform::Linkedin);
        assert_eq!(drafted[1].platform, Platform::X);
        assert!(drafted.iter().all(|p| p.state == PostState::Draft));
        assert!(drafted[0].content.contains("The launch post"));
    }

    #[tokio::test]
    async fn edit_advances_draft_and_rejects_terminal() {
        let (scheduler, _dir, source_path) = setup().await;
        let (_, drafted) = scheduler.create_campaign(&source_path, None).await.unwrap();

        let edited = scheduler
            .edit_post(&drafted[0].id, "New content\n\nwith enough body text to matter here.")
            .await
            .unwrap();
        assert_eq!(edited.state, PostState::ReadyForApproval);
        assert!(edited.edited_at.is_some());

        let canceled = scheduler.cancel_post(&drafted[1].id).await.unwrap();
        assert_eq!(canceled.state, PostState::Canceled);
        let err = scheduler.edit_post(&canceled.id, "anything").await.unwrap_err();
        assert!(matches!(err, CrosspostError::Validation { .. }));
    }

    #[tokio::test]
    async fn approval_requires_human_edit() {
        let (scheduler, _dir, source_path) = setup().await;
        let (campaign, _) = scheduler.create_campaign(&source_path, None).await.unwrap();

        let err = scheduler
            .approve_campaign(&campaign.id, Some(&flat_history()), Utc::now())
            .await
            .unwrap_err();
        let CrosspostError::Validation { reasons } = err else {
            panic!("expected validation error");
        };
        assert!(reasons.iter().any(|r| r.contains("never human-edited")));
    }

    #[tokio::test]
    async fn approval_freezes_hash_and_schedules_at_recommendation() {
        let (scheduler, _dir, source_path) = setup().await;
        let (campaign, _) = scheduler.create_campaign(&source_path, None).await.unwrap();
        edit_all(&scheduler, &campaign.id).await;

        let now = Utc::now();
        let outcome = scheduler
            .approve_campaign(&campaign.id, Some(&flat_history()), now)
            .await
            .unwrap();
        let ApprovalOutcome::Scheduled { recommendation } = outcome else {
            panic!("flat history should clear the threshold");
        };

        let stored = posts::list_posts_for_campaign(scheduler.database(), &campaign.id)
            .await
            .unwrap();
        for post in &stored {
            assert_eq!(post.state, PostState::Scheduled);
            assert_eq!(post.scheduled_for_utc, Some(recommendation.recommended_time_utc));
            assert_eq!(
                post.approved_content_hash.as_deref(),
                Some(hashing::content_hash(&post.content).as_str())
            );
        }
        let stored_campaign = scheduler.require_campaign(&campaign.id).await.unwrap();
        assert_eq!(
            stored_campaign.campaign_time_utc,
            Some(recommendation.recommended_time_utc)
        );
    }

    #[tokio::test]
    async fn low_confidence_holds_at_approved_with_open_request() {
        let (scheduler, _dir, source_path) = setup().await;
        let (campaign, _) = scheduler.create_campaign(&source_path, None).await.unwrap();
        edit_all(&scheduler, &campaign.id).await;

        // No history forces the low-confidence fallback.
        let outcome = scheduler
            .approve_campaign(&campaign.id, None, Utc::now())
            .await
            .unwrap();
        let ApprovalOutcome::HeldForConfirmation { recommendation, request } = outcome else {
            panic!("fallback must hold for confirmation");
        };
        assert!(recommendation.fallback_used);
        assert!(recommendation.confidence < CONFIDENCE_THRESHOLD);
        assert_eq!(request.kind, DecisionKind::LowConfidenceConfirm);
        assert_eq!(request.status, DecisionStatus::Open);

        let stored = posts::list_posts_for_campaign(scheduler.database(), &campaign.id)
            .await
            .unwrap();
        assert!(stored.iter().all(|p| p.state == PostState::Approved));
        assert!(stored.iter().all(|p| p.approved_content_hash.is_some()));
    }

    #[tokio::test]
    async fn schedule_rejects_past_and_far_future() {
        let (scheduler, _dir, source_path) = setup().await;
        let (campaign, _) = scheduler.create_campaign(&source_path, None).await.unwrap();
        let now = Utc::now();

        let err = scheduler
            .schedule_campaign(&campaign.id, now - Duration::minutes(1), now)
            .await
            .unwrap_err();
        assert!(matches!(err, CrosspostError::Validation { .. }));

        let err = scheduler
            .schedule_campaign(&campaign.id, now + Duration::days(31), now)
            .await
            .unwrap_err();
        assert!(matches!(err, CrosspostError::Validation { .. }));
    }

    #[tokio::test]
    async fn failed_post_retry_goes_through_scheduled() {
        let (scheduler, _dir, source_path) = setup().await;
        let (campaign, drafted) = scheduler.create_campaign(&source_path, None).await.unwrap();

        // Drive one post to failed directly through storage.
        let mut post = scheduler.require_post(&drafted[0].id).await.unwrap();
        post.state = PostState::Failed;
        posts::update_post(scheduler.database(), &post).await.unwrap();

        let now = Utc::now();
        let retried = scheduler.retry_failed_post(&post.id, now).await.unwrap();
        assert_eq!(retried.state, PostState::Scheduled);
        assert_eq!(retried.scheduled_for_utc, Some(now));

        // A draft post cannot be retried.
        let err = scheduler.retry_failed_post(&drafted[1].id, now).await.unwrap_err();
        assert!(matches!(err, CrosspostError::IllegalTransition { .. }));
        let _ = campaign;
    }

    #[tokio::test]
    async fn missed_window_parks_with_deduplicated_request() {
        let (scheduler, _dir, source_path) = setup().await;
        let (_, drafted) = scheduler.create_campaign(&source_path, None).await.unwrap();
        let now = Utc::now();

        let mut post = scheduler.require_post(&drafted[0].id).await.unwrap();
        post.state = PostState::Scheduled;
        post.scheduled_for_utc = Some(now - Duration::hours(3));
        posts::update_post(scheduler.database(), &post).await.unwrap();
        let post = scheduler.require_post(&post.id).await.unwrap();

        assert!(!Scheduler::within_publish_window(&post, now));
        let request = scheduler.park_missed_post(&post, now).await.unwrap();
        assert!(request.is_some());
        assert_eq!(
            scheduler.require_post(&post.id).await.unwrap().state,
            PostState::PendingManual
        );

        // Park again (e.g. next cycle raced): no duplicate request.
        let mut again = scheduler.require_post(&post.id).await.unwrap();
        again.state = PostState::Scheduled;
        posts::update_post(scheduler.database(), &again).await.unwrap();
        let again = scheduler.require_post(&again.id).await.unwrap();
        let dup = scheduler.park_missed_post(&again, now).await.unwrap();
        assert!(dup.is_none());
    }

    #[test]
    fn publish_window_boundary() {
        let now = Utc::now();
        let mut post = Post {
            id: "post_1".into(),
            campaign_id: "camp_1".into(),
            platform: Platform::X,
            content: String::new(),
            state: PostState::Scheduled,
            approved_content_hash: None,
            approved_at: None,
            edited_at: None,
            scheduled_for_utc: Some(now - Duration::minutes(119)),
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
        assert!(Scheduler::within_publish_window(&post, now));
        post.scheduled_for_utc = Some(now - Duration::minutes(121));
        assert!(!Scheduler::within_publish_window(&post, now));
    }
}
