// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The polling publish worker.
//!
//! Each cycle is stateless: every safety control, due post, and retry
//! eligibility is re-read from storage, so a crashed or restarted worker
//! resumes mid-flight work with nothing held in memory. Posts are
//! processed independently; one post's failure never blocks the rest of
//! the cycle.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use crosspost_control::reminders;
use crosspost_core::ids::new_id;
use crosspost_core::retry::{self, NextAction, PublishOutcome};
use crosspost_core::types::{Attempt, AttemptOutcome, DecisionKind, RolloutStage};
use crosspost_core::{
    ChatTransport, CrosspostError, DecisionRequest, Platform, PlatformConnector, Post, PostState,
    hashing, redact,
};
use crosspost_scheduler::{Scheduler, interlocks, reports};
use crosspost_storage::Database;
use crosspost_storage::queries::{attempts, controls, decisions, posts};
use serde_json::json;
use tracing::{error, info, warn};

use crosspost_scheduler::events::record_event;

/// One polling worker instance.
pub struct Runner {
    scheduler: Scheduler,
    connectors: HashMap<Platform, Arc<dyn PlatformConnector>>,
    transport: Arc<dyn ChatTransport>,
    audience_offset_minutes: i32,
    /// Global dry-run flag from configuration; the rollout stage can only
    /// restrict further, never widen past this.
    dry_run: bool,
    connector_timeout: std::time::Duration,
    /// Whether platform credentials were present at startup. Feeds the
    /// daily health gate's token check.
    tokens_present: bool,
}

impl Runner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scheduler: Scheduler,
        connectors: HashMap<Platform, Arc<dyn PlatformConnector>>,
        transport: Arc<dyn ChatTransport>,
        audience_offset_minutes: i32,
        dry_run: bool,
        connector_timeout: std::time::Duration,
        tokens_present: bool,
    ) -> Self {
        Self {
            scheduler,
            connectors,
            transport,
            audience_offset_minutes,
            dry_run,
            connector_timeout,
            tokens_present,
        }
    }

    fn db(&self) -> &Database {
        self.scheduler.database()
    }

    /// Run cycles forever at the configured poll interval.
    pub async fn run_forever(&self, poll_interval: std::time::Duration) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once(Utc::now()).await {
                error!(error = %e, "worker cycle failed");
            }
        }
    }

    /// One full worker cycle.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<(), CrosspostError> {
        interlocks::record_heartbeat(self.db(), now).await?;

        self.maintain_decisions(now).await?;
        self.decision_outage_failsafe(now).await?;
        self.send_due_digest(now).await?;

        if interlocks::kill_switch_on(self.db()).await? {
            info!("kill switch engaged, skipping publish work");
            // Alert once per engagement, not every cycle.
            let marker = crosspost_core::types::controls::KILL_SWITCH_ALERTED;
            if controls::get_control(self.db(), marker).await?.is_none() {
                self.alert("Kill switch is engaged; all publishing is paused.", true)
                    .await;
                controls::set_control(self.db(), marker, "true", now).await?;
            }
            return Ok(());
        }

        // The gate is evaluated once per cycle, before the due queue is
        // even consulted, so a persistent credential failure keeps
        // alerting while no posts are due.
        let stage = interlocks::rollout_stage(self.db()).await?;
        let gate_clear = if !self.dry_run && stage != RolloutStage::DryRunOnly {
            self.health_gate_clear(now).await?
        } else {
            true
        };

        for post in posts::due_posts(self.db(), now).await? {
            let post_id = post.id.clone();
            if let Err(e) = self.process_due_post(post, stage, gate_clear, now).await {
                error!(post_id, error = %e, "post processing failed, continuing cycle");
            }
        }
        Ok(())
    }

    /// Expire and remind open decision requests, pushing reminder cards
    /// and parking notices through the transport.
    async fn maintain_decisions(&self, now: DateTime<Utc>) -> Result<(), CrosspostError> {
        let report = reminders::sweep(self.db(), now, self.audience_offset_minutes).await?;
        for request in &report.expired {
            self.alert(
                &format!(
                    "Decision request {} expired without an answer and is parked. \
                     Use /refresh {} to reopen it.",
                    request.id, request.id,
                ),
                request.critical,
            )
            .await;
        }
        for request in &report.reminders {
            if let Err(e) = self
                .transport
                .send_decision_card(&request.id, &format!("Reminder: {}", request.message))
                .await
            {
                warn!(request_id = request.id, error = %e, "reminder delivery failed");
            }
        }
        Ok(())
    }

    /// Fail safe: when the operator channel is down while decisions are
    /// open, nobody can answer asks, so publishing pauses itself.
    async fn decision_outage_failsafe(&self, now: DateTime<Utc>) -> Result<(), CrosspostError> {
        let open =
            decisions::list_requests_in_status(self.db(), crosspost_core::DecisionStatus::Open)
                .await?;
        if open.is_empty()
            || interlocks::kill_switch_on(self.db()).await?
            || self.transport.healthy().await
        {
            return Ok(());
        }
        warn!(
            open_requests = open.len(),
            "operator channel unreachable with open decisions, engaging kill switch"
        );
        interlocks::set_kill_switch(self.db(), true, now).await?;
        record_event(
            self.db(),
            "telegram_decision_outage_paused",
            None,
            None,
            json!({ "open_requests": open.len() }),
            now,
        )
        .await
    }

    async fn send_due_digest(&self, now: DateTime<Utc>) -> Result<(), CrosspostError> {
        let Some(kind) =
            reports::due_digest(self.db(), now, self.audience_offset_minutes).await?
        else {
            return Ok(());
        };
        let text = reports::build_digest(self.db(), kind, now).await?;
        if self.transport.send_alert(&text, false).await.is_ok() {
            reports::mark_digest_sent(self.db(), kind, now, self.audience_offset_minutes).await?;
        }
        Ok(())
    }

    async fn process_due_post(
        &self,
        post: Post,
        stage: RolloutStage,
        gate_clear: bool,
        now: DateTime<Utc>,
    ) -> Result<(), CrosspostError> {
        if post.needs_verification {
            warn!(post_id = post.id, "skipping post awaiting verification");
            return Ok(());
        }
        if !Scheduler::within_publish_window(&post, now) {
            if let Some(request) = self.scheduler.park_missed_post(&post, now).await? {
                self.send_card(&request).await;
            }
            return Ok(());
        }

        let connector = self.connectors.get(&post.platform).ok_or_else(|| {
            CrosspostError::Internal(format!("no connector registered for {}", post.platform))
        })?;
        let live = !self.dry_run && interlocks::live_allowed(stage, post.platform);

        if live && !gate_clear {
            warn!(post_id = post.id, "daily health gate not passed, deferring live publish");
            return Ok(());
        }

        let hash = post.approved_content_hash.as_deref().ok_or_else(|| {
            CrosspostError::Internal(format!("scheduled post {} has no frozen hash", post.id))
        })?;
        let key = hashing::idempotency_key(&post.campaign_id, post.platform, hash);

        // A confirmed success for this key means the work already
        // happened, whatever the post row says. Reconcile, never re-send.
        if let Some(prior) = attempts::find_success_for_key(self.db(), &key).await? {
            info!(post_id = post.id, "prior success found for idempotency key, reconciling");
            return self
                .finalize(post, prior.external_post_id.unwrap_or_default(), now)
                .await;
        }

        let attempt_number = attempts::next_attempt_number(self.db(), &post.id).await?;
        let started_at = now;
        let outcome = match tokio::time::timeout(
            self.connector_timeout,
            connector.publish(&post.content, &key, !live),
        )
        .await
        {
            Ok(outcome) => outcome,
            // The request may have reached the platform before the clock
            // ran out.
            Err(_) => PublishOutcome::Ambiguous {
                error: format!(
                    "publish timed out after {}s",
                    self.connector_timeout.as_secs()
                ),
            },
        };

        let mut action = retry::next_action(&outcome, attempt_number, Utc::now());
        let mut external_post_id = None;
        if let NextAction::VerifyFirst { error } = &action {
            action = self
                .reconcile_ambiguous(connector.as_ref(), &key, attempt_number, error)
                .await;
        }
        if let NextAction::Finalize { external_id } = &action {
            external_post_id = Some(external_id.clone());
        }

        attempts::insert_attempt(
            self.db(),
            &Attempt {
                id: new_id("att"),
                post_id: post.id.clone(),
                attempt_number,
                started_at,
                finished_at: Utc::now(),
                outcome: attempt_outcome(&outcome),
                error_redacted: outcome_error(&outcome).map(redact::redact_secrets),
                idempotency_key: key,
                external_post_id,
            },
        )
        .await?;

        self.apply_action(post, action, attempt_number, now).await
    }

    /// Resolve an ambiguous outcome by asking the platform whether the
    /// post exists. Unresolvable ambiguity with ladder room retries;
    /// without it, the post parks for human verification.
    async fn reconcile_ambiguous(
        &self,
        connector: &dyn PlatformConnector,
        key: &str,
        attempt_number: i64,
        error: &str,
    ) -> NextAction {
        match connector.lookup(key).await {
            Ok(Some(external_id)) => NextAction::Finalize { external_id },
            Ok(None) => match retry::retry_delay(attempt_number) {
                Some(delay) => NextAction::RetryAt(Utc::now() + delay),
                // Out of ladder with no proof either way: a human has to
                // look at the platform.
                None => NextAction::VerifyFirst {
                    error: format!("ambiguous after final attempt: {error}"),
                },
            },
            Err(e) => {
                warn!(error = %e, "verification lookup failed, parking post");
                NextAction::VerifyFirst {
                    error: format!("unverifiable: {error} (lookup failed: {e})"),
                }
            }
        }
    }

    async fn apply_action(
        &self,
        post: Post,
        action: NextAction,
        attempt_number: i64,
        now: DateTime<Utc>,
    ) -> Result<(), CrosspostError> {
        match action {
            NextAction::Finalize { external_id } => self.finalize(post, external_id, now).await,
            NextAction::RetryAt(at) => {
                let mut post = post;
                post.scheduled_for_utc = Some(at);
                post.last_error = Some(format!("attempt {attempt_number} failed, retrying"));
                post.updated_at = now;
                posts::update_post(self.db(), &post).await?;
                record_event(
                    self.db(),
                    "post_retry_scheduled",
                    Some(&post.campaign_id),
                    Some(&post.id),
                    json!({ "attempt": attempt_number, "retry_at": at.to_rfc3339() }),
                    now,
                )
                .await?;
                info!(post_id = post.id, %at, "retry scheduled");
                Ok(())
            }
            NextAction::GiveUp { error } => self.give_up(post, error, attempt_number, now).await,
            NextAction::VerifyFirst { error } => {
                // Reconciliation could not settle it; hold the post until
                // a human verifies the platform state.
                self.park_unverified(post, error, now).await
            }
        }
    }

    async fn finalize(
        &self,
        mut post: Post,
        external_id: String,
        now: DateTime<Utc>,
    ) -> Result<(), CrosspostError> {
        crosspost_core::state_machine::ensure_transition(post.state, PostState::Posted)?;
        post.state = PostState::Posted;
        post.external_post_id = Some(external_id.clone());
        post.posted_at = Some(now);
        post.needs_verification = false;
        post.last_error = None;
        post.updated_at = now;
        posts::update_post(self.db(), &post).await?;
        record_event(
            self.db(),
            "post_published",
            Some(&post.campaign_id),
            Some(&post.id),
            json!({ "external_post_id": external_id }),
            now,
        )
        .await?;
        info!(post_id = post.id, platform = %post.platform, "post published");
        self.alert(
            &format!("{} post {} published ({external_id}).", post.platform, post.id),
            false,
        )
        .await;
        Ok(())
    }

    async fn give_up(
        &self,
        mut post: Post,
        error: String,
        attempt_number: i64,
        now: DateTime<Utc>,
    ) -> Result<(), CrosspostError> {
        crosspost_core::state_machine::ensure_transition(post.state, PostState::Failed)?;
        post.state = PostState::Failed;
        post.last_error = Some(redact::redact_secrets(&error));
        post.updated_at = now;
        posts::update_post(self.db(), &post).await?;
        record_event(
            self.db(),
            "post_failed",
            Some(&post.campaign_id),
            Some(&post.id),
            json!({ "attempt": attempt_number }),
            now,
        )
        .await?;
        warn!(post_id = post.id, error, "post failed permanently");

        if !decisions::unresolved_request_exists(self.db(), &post.id, DecisionKind::RetryDecision)
            .await?
        {
            let request = DecisionRequest::open(
                DecisionKind::RetryDecision,
                Some(post.campaign_id.clone()),
                Some(post.id.clone()),
                format!(
                    "{} post {} failed after attempt {attempt_number}: {}. Retry or cancel?",
                    post.platform,
                    post.id,
                    post.last_error.as_deref().unwrap_or("unknown error"),
                ),
                true,
                now,
            );
            decisions::insert_decision_request(self.db(), &request).await?;
            self.send_card(&request).await;
        }
        Ok(())
    }

    async fn park_unverified(
        &self,
        mut post: Post,
        error: String,
        now: DateTime<Utc>,
    ) -> Result<(), CrosspostError> {
        crosspost_core::state_machine::ensure_transition(post.state, PostState::PendingManual)?;
        post.state = PostState::PendingManual;
        post.needs_verification = true;
        post.last_error = Some(redact::redact_secrets(&error));
        post.updated_at = now;
        posts::update_post(self.db(), &post).await?;
        record_event(
            self.db(),
            "post_unverified",
            Some(&post.campaign_id),
            Some(&post.id),
            json!({}),
            now,
        )
        .await?;

        if !decisions::unresolved_request_exists(self.db(), &post.id, DecisionKind::Confirmation)
            .await?
        {
            let request = DecisionRequest::open(
                DecisionKind::Confirmation,
                Some(post.campaign_id.clone()),
                Some(post.id.clone()),
                format!(
                    "{} post {} ended ambiguously and could not be verified. Check the \
                     platform manually, then approve to retry or reject to cancel.",
                    post.platform, post.id,
                ),
                true,
                now,
            );
            decisions::insert_decision_request(self.db(), &request).await?;
            self.send_card(&request).await;
        }
        Ok(())
    }

    /// True when today's health gate is clear, either by passing or by a
    /// one-shot armed override. A failing gate alerts once per cycle date.
    async fn health_gate_clear(&self, now: DateTime<Utc>) -> Result<bool, CrosspostError> {
        let cycle = interlocks::gate_cycle_date(now, self.audience_offset_minutes);
        if interlocks::health_gate_passed(self.db(), &cycle).await? {
            return Ok(true);
        }
        let first_check = crosspost_storage::queries::health::latest_health_check_for_date(
            self.db(),
            &cycle,
        )
        .await?
        .is_none();
        let status =
            interlocks::run_health_check(self.db(), self.tokens_present, now, &cycle).await?;
        if status.passed() {
            return Ok(true);
        }
        if status.token_status == "fail" && interlocks::token_failure_alert_due(self.db(), now).await?
        {
            // Credential failure blocks everything live; keep ringing
            // until it is fixed, quiet hours or not.
            self.alert(
                "Platform credentials are missing or unreadable; live publishing is blocked.",
                true,
            )
            .await;
        }
        if interlocks::consume_health_override(self.db()).await? {
            warn!(cycle, "health gate failing but one-shot override armed, proceeding");
            record_event(self.db(), "health_gate_overridden", None, None, json!({}), now)
                .await?;
            return Ok(true);
        }
        if first_check {
            self.alert(
                &format!(
                    "Daily health gate failed for {cycle} (tokens {}, worker {}, kill switch \
                     {}, failures {}). Live publishing is deferred; /health_override to bypass \
                     once.",
                    status.token_status,
                    status.worker_status,
                    status.kill_switch_status,
                    status.critical_failure_status,
                ),
                true,
            )
            .await;
        }
        Ok(false)
    }

    async fn alert(&self, text: &str, critical: bool) {
        if let Err(e) = self.transport.send_alert(text, critical).await {
            warn!(error = %e, "alert delivery failed");
        }
    }

    async fn send_card(&self, request: &DecisionRequest) {
        if let Err(e) = self
            .transport
            .send_decision_card(&request.id, &request.message)
            .await
        {
            warn!(request_id = request.id, error = %e, "decision card delivery failed");
        }
    }
}

fn attempt_outcome(outcome: &PublishOutcome) -> AttemptOutcome {
    match outcome {
        PublishOutcome::Success { .. } => AttemptOutcome::Success,
        PublishOutcome::Transient { .. } => AttemptOutcome::TransientFailure,
        PublishOutcome::Permanent { .. } => AttemptOutcome::PermanentFailure,
        PublishOutcome::Ambiguous { .. } => AttemptOutcome::Ambiguous,
    }
}

fn outcome_error(outcome: &PublishOutcome) -> Option<&str> {
    match outcome {
        PublishOutcome::Success { .. } => None,
        PublishOutcome::Transient { error }
        | PublishOutcome::Permanent { error }
        | PublishOutcome::Ambiguous { error } => Some(error),
    }
}
