// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command dispatch for the operator chat.
//!
//! Every inbound command passes, in order: the single-operator
//! authorization check, the rate limiter, then dispatch. Critical actions
//! never execute directly; they issue a single-use confirmation token the
//! operator must echo back with `/confirm`.

use chrono::{DateTime, Utc};
use crosspost_core::ids::new_id;
use crosspost_core::types::{DecisionAudit, DecisionKind, OverrideAudit};
use crosspost_core::{CrosspostError, PostState, RolloutStage, TokenAction};
use crosspost_scheduler::{ApprovalOutcome, Scheduler, interlocks, reports};
use crosspost_storage::Database;
use crosspost_storage::queries::{audit, decisions, health, posts};
use std::str::FromStr;
use tracing::{info, warn};

use crate::{rate_limit, reminders, tokens};

/// Reply routed back to the operator chat.
#[derive(Debug, Clone)]
pub struct CommandReply {
    pub text: String,
    /// Critical replies escalate delivery (notification sound on).
    pub critical: bool,
}

impl CommandReply {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            critical: false,
        }
    }

    fn critical(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            critical: true,
        }
    }
}

/// The human decision control plane.
#[derive(Clone)]
pub struct ControlPlane {
    scheduler: Scheduler,
    allowed_user_id: String,
    audience_offset_minutes: i32,
}

impl ControlPlane {
    pub fn new(
        scheduler: Scheduler,
        allowed_user_id: String,
        audience_offset_minutes: i32,
    ) -> Self {
        Self {
            scheduler,
            allowed_user_id,
            audience_offset_minutes,
        }
    }

    fn db(&self) -> &Database {
        self.scheduler.database()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Handle one slash command from the chat.
    pub async fn handle_command(
        &self,
        user_id: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<CommandReply, CrosspostError> {
        let mut parts = text.split_whitespace();
        let command = parts.next().unwrap_or("");
        let argument = parts.next();

        if user_id != self.allowed_user_id {
            warn!(user_id, command, "unauthorized control-plane command");
            self.record_audit(user_id, &format!("unauthorized:{command}"), None, None, now)
                .await?;
            return Ok(CommandReply::plain("Not authorized."));
        }
        if !rate_limit::check(self.db(), user_id, command, now).await? {
            return Ok(CommandReply::plain(
                "Rate limit reached (20 commands per minute). Cooling down.",
            ));
        }
        self.record_audit(user_id, command, None, None, now).await?;

        let result = self.dispatch(user_id, command, argument, now).await;
        match result {
            Ok(reply) => Ok(reply),
            // Operator-correctable failures become reply text; storage and
            // internal errors still propagate.
            Err(
                e @ (CrosspostError::Validation { .. }
                | CrosspostError::NotFound { .. }
                | CrosspostError::IllegalTransition { .. }
                | CrosspostError::Conflict { .. }),
            ) => Ok(CommandReply::plain(format!("Cannot do that: {e}"))),
            Err(e) => Err(e),
        }
    }

    async fn dispatch(
        &self,
        user_id: &str,
        command: &str,
        argument: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<CommandReply, CrosspostError> {
        match command {
            "/status" => self.status_reply(now).await,
            "/approve" => {
                let id = required(argument, "/approve <campaign-id>")?;
                match self.scheduler.approve_campaign(id, None, now).await? {
                    ApprovalOutcome::Scheduled { recommendation } => {
                        Ok(CommandReply::plain(format!(
                            "Approved and scheduled for {} (confidence {:.2}).",
                            recommendation.recommended_time_utc.format("%Y-%m-%d %H:%M UTC"),
                            recommendation.confidence,
                        )))
                    }
                    ApprovalOutcome::HeldForConfirmation { request, .. } => {
                        Ok(CommandReply::plain(format!(
                            "Approved, but timing confidence is low. {}",
                            request.message,
                        )))
                    }
                }
            }
            "/retry" => {
                let id = required(argument, "/retry <post-id>")?;
                let post = self.scheduler.retry_failed_post(id, now).await?;
                Ok(CommandReply::plain(format!(
                    "Post {} re-queued for immediate publish.",
                    post.id
                )))
            }
            "/refresh" => {
                let id = required(argument, "/refresh <request-id>")?;
                if reminders::refresh_expired_request(self.db(), id, now).await? {
                    Ok(CommandReply::plain(format!("Request {id} reopened for 30 minutes.")))
                } else {
                    Ok(CommandReply::plain(format!(
                        "Request {id} is not awaiting manual follow-up."
                    )))
                }
            }
            "/kill_on" => self.issue_critical(TokenAction::KillSwitchOn, "global", now).await,
            "/kill_off" => {
                self.issue_critical(TokenAction::KillSwitchOff, "global", now).await
            }
            "/override" => {
                let id = required(argument, "/override <post-id>")?;
                self.scheduler.require_post(id).await?;
                self.issue_critical(TokenAction::ManualOverridePublish, id, now).await
            }
            "/cancel" => {
                let id = required(argument, "/cancel <post-id>")?;
                let post = self.scheduler.require_post(id).await?;
                if post.state == PostState::Scheduled {
                    // Canceling committed work is critical.
                    self.issue_critical(TokenAction::CancelScheduledPost, id, now).await
                } else {
                    let post = self.scheduler.cancel_post(id).await?;
                    Ok(CommandReply::plain(format!("Post {} canceled.", post.id)))
                }
            }
            "/confirm" => {
                let id = required(argument, "/confirm <token-id>")?;
                self.confirm(user_id, id, now).await
            }
            "/health" => self.health_reply(now).await,
            "/health_override" => {
                self.issue_critical(TokenAction::HealthGateOverride, "health_gate", now)
                    .await
            }
            "/rollout" => {
                let Some(arg) = argument else {
                    let stage = interlocks::rollout_stage(self.db()).await?;
                    return Ok(CommandReply::plain(format!("Rollout stage: {stage}")));
                };
                let stage = RolloutStage::from_str(arg).map_err(|_| {
                    CrosspostError::validation(format!(
                        "unknown stage {arg}; expected dry_run_only, linkedin_live, or all_live"
                    ))
                })?;
                interlocks::set_rollout_stage(self.db(), stage, now).await?;
                Ok(CommandReply::plain(format!("Rollout stage set to {stage}.")))
            }
            "/digest" => {
                let text =
                    reports::build_digest(self.db(), reports::DigestKind::Evening, now).await?;
                Ok(CommandReply::plain(text))
            }
            "/weekly" => {
                let text =
                    reports::build_digest(self.db(), reports::DigestKind::Weekly, now).await?;
                Ok(CommandReply::plain(text))
            }
            _ => Ok(CommandReply::plain(
                "Commands: /status /approve /retry /refresh /cancel /override /confirm \
                 /kill_on /kill_off /health /health_override /rollout /digest /weekly",
            )),
        }
    }

    /// Resolve a decision request from an inline approve/reject button.
    pub async fn resolve_decision(
        &self,
        user_id: &str,
        request_id: &str,
        approve: bool,
        message_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<CommandReply, CrosspostError> {
        if user_id != self.allowed_user_id {
            self.record_audit(user_id, "unauthorized:decision", None, message_id, now)
                .await?;
            return Ok(CommandReply::plain("Not authorized."));
        }
        if !rate_limit::check(self.db(), user_id, "decision", now).await? {
            return Ok(CommandReply::plain(
                "Rate limit reached (20 commands per minute). Cooling down.",
            ));
        }

        let Some(request) = decisions::get_decision_request(self.db(), request_id).await? else {
            return Ok(CommandReply::plain(format!("Unknown request {request_id}.")));
        };
        let action = if approve { "approve" } else { "reject" };
        match decisions::resolve_request(self.db(), request_id, action, user_id, message_id, now)
            .await
        {
            Ok(()) => {}
            Err(CrosspostError::Conflict { .. }) => {
                return Ok(CommandReply::plain(format!(
                    "Request {request_id} was already resolved."
                )));
            }
            Err(e) => return Err(e),
        }
        self.record_audit(user_id, &format!("decision:{action}"), None, message_id, now)
            .await?;
        info!(request_id, action, kind = %request.kind, "decision resolved");

        if !approve {
            if let Some(post_id) = request.post_id.as_deref() {
                // Rejecting a post-bound ask cancels the post when legal.
                match self.scheduler.cancel_post(post_id).await {
                    Ok(post) => {
                        return Ok(CommandReply::plain(format!(
                            "Rejected; post {} canceled.",
                            post.id
                        )));
                    }
                    Err(CrosspostError::IllegalTransition { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
            return Ok(CommandReply::plain("Rejected."));
        }

        match request.kind {
            DecisionKind::Approval => {
                let campaign_id = request.campaign_id.as_deref().ok_or_else(|| {
                    CrosspostError::Internal("approval request without campaign".into())
                })?;
                match self.scheduler.approve_campaign(campaign_id, None, now).await {
                    Ok(ApprovalOutcome::Scheduled { recommendation }) => {
                        Ok(CommandReply::plain(format!(
                            "Campaign approved and scheduled for {}.",
                            recommendation.recommended_time_utc.format("%Y-%m-%d %H:%M UTC"),
                        )))
                    }
                    Ok(ApprovalOutcome::HeldForConfirmation { request, .. }) => {
                        Ok(CommandReply::plain(request.message))
                    }
                    Err(e @ CrosspostError::Validation { .. }) => {
                        Ok(CommandReply::plain(format!("Approval blocked: {e}")))
                    }
                    Err(e) => Err(e),
                }
            }
            DecisionKind::LowConfidenceConfirm => {
                self.schedule_at_recommendation(&request, now).await
            }
            DecisionKind::Confirmation | DecisionKind::RetryDecision => {
                let post_id = request.post_id.as_deref().ok_or_else(|| {
                    CrosspostError::Internal("post decision without post".into())
                })?;
                let post = self.scheduler.override_publish_now(post_id, now).await?;
                Ok(CommandReply::plain(format!(
                    "Post {} re-queued for immediate publish.",
                    post.id
                )))
            }
            DecisionKind::KillSwitchToggle | DecisionKind::Override => {
                Ok(CommandReply::plain("Acknowledged."))
            }
        }
    }

    async fn schedule_at_recommendation(
        &self,
        request: &crosspost_core::DecisionRequest,
        now: DateTime<Utc>,
    ) -> Result<CommandReply, CrosspostError> {
        let campaign_id = request.campaign_id.as_deref().ok_or_else(|| {
            CrosspostError::Internal("confirm request without campaign".into())
        })?;
        let campaign_posts = posts::list_posts_for_campaign(self.db(), campaign_id).await?;
        let Some(at) = campaign_posts.iter().find_map(|p| p.recommended_for_utc) else {
            return Ok(CommandReply::plain(
                "No stored recommendation; schedule explicitly with the CLI.",
            ));
        };
        match self.scheduler.schedule_campaign(campaign_id, at, now).await {
            Ok(()) => Ok(CommandReply::plain(format!(
                "Confirmed; campaign scheduled for {}.",
                at.format("%Y-%m-%d %H:%M UTC"),
            ))),
            Err(e @ CrosspostError::Validation { .. }) => Ok(CommandReply::plain(format!(
                "Recommended time is no longer usable: {e}"
            ))),
            Err(e) => Err(e),
        }
    }

    /// Issue a confirmation token and tell the operator how to redeem it.
    async fn issue_critical(
        &self,
        action: TokenAction,
        target_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CommandReply, CrosspostError> {
        let token = tokens::issue(self.db(), action, target_id, now).await?;
        Ok(CommandReply::critical(format!(
            "Critical action {action} on {target_id}. Reply `/confirm {}` within {} minutes \
             to proceed.",
            token.id,
            tokens::TOKEN_EXPIRY_MINUTES,
        )))
    }

    /// Redeem a token and execute its bound action.
    async fn confirm(
        &self,
        user_id: &str,
        token_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CommandReply, CrosspostError> {
        let Some(token) = tokens::redeem(self.db(), token_id, user_id, now).await? else {
            return Ok(CommandReply::plain(
                "Token is unknown, already used, or expired. Re-run the original command.",
            ));
        };
        self.record_audit(user_id, &format!("confirm:{}", token.action), Some(&token.id), None, now)
            .await?;

        match token.action {
            TokenAction::KillSwitchOn => {
                interlocks::set_kill_switch(self.db(), true, now).await?;
                Ok(CommandReply::critical("Kill switch engaged. All publishing paused."))
            }
            TokenAction::KillSwitchOff => {
                let reconfirmations = interlocks::set_kill_switch(self.db(), false, now).await?;
                Ok(CommandReply::critical(format!(
                    "Kill switch released. {} post(s) missed their window while paused and \
                     now await reconfirmation.",
                    reconfirmations.len(),
                )))
            }
            TokenAction::ManualOverridePublish => {
                let post = self
                    .scheduler
                    .override_publish_now(&token.target_id, now)
                    .await?;
                audit::insert_override_audit(
                    self.db(),
                    &OverrideAudit {
                        id: new_id("ovr"),
                        campaign_id: Some(post.campaign_id.clone()),
                        post_id: post.id.clone(),
                        user_id: user_id.to_string(),
                        reason: "manual override publish".to_string(),
                        confirmation_token_id: token.id.clone(),
                        created_at: now,
                    },
                )
                .await?;
                Ok(CommandReply::critical(format!(
                    "Override confirmed; post {} publishes on the next cycle.",
                    post.id
                )))
            }
            TokenAction::CancelScheduledPost => {
                let post = self.scheduler.cancel_post(&token.target_id).await?;
                Ok(CommandReply::plain(format!("Scheduled post {} canceled.", post.id)))
            }
            TokenAction::HealthGateOverride => {
                interlocks::arm_health_override(self.db(), now).await?;
                Ok(CommandReply::critical(
                    "Health gate override armed for one publish cycle.",
                ))
            }
        }
    }

    async fn status_reply(&self, now: DateTime<Utc>) -> Result<CommandReply, CrosspostError> {
        let scheduled = posts::list_posts_in_state(self.db(), PostState::Scheduled).await?;
        let parked = posts::list_posts_in_state(self.db(), PostState::PendingManual).await?;
        let open = decisions::list_requests_in_status(self.db(), crosspost_core::DecisionStatus::Open)
            .await?;
        let kill = interlocks::kill_switch_on(self.db()).await?;
        let stage = interlocks::rollout_stage(self.db()).await?;
        let heartbeat = interlocks::heartbeat_fresh(self.db(), now).await?;
        Ok(CommandReply::plain(format!(
            "Kill switch: {}\nRollout: {stage}\nWorker heartbeat: {}\nScheduled: {}\n\
             Awaiting manual decision: {}\nOpen requests: {}",
            if kill { "ON" } else { "off" },
            if heartbeat { "fresh" } else { "STALE" },
            scheduled.len(),
            parked.len(),
            open.len(),
        )))
    }

    async fn health_reply(&self, now: DateTime<Utc>) -> Result<CommandReply, CrosspostError> {
        let cycle = interlocks::gate_cycle_date(now, self.audience_offset_minutes);
        let Some(status) = health::latest_health_check_for_date(self.db(), &cycle).await? else {
            return Ok(CommandReply::plain(format!(
                "No health check recorded yet for {cycle}."
            )));
        };
        Ok(CommandReply::plain(format!(
            "Health {}: overall {}\n  tokens {}\n  worker {}\n  kill switch {}\n  failures {}",
            status.date_local,
            status.overall_status,
            status.token_status,
            status.worker_status,
            status.kill_switch_status,
            status.critical_failure_status,
        )))
    }

    async fn record_audit(
        &self,
        user_id: &str,
        action: &str,
        token_id: Option<&str>,
        message_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), CrosspostError> {
        audit::insert_decision_audit(
            self.db(),
            &DecisionAudit {
                id: new_id("aud"),
                campaign_id: None,
                post_id: None,
                user_id: user_id.to_string(),
                action: action.to_string(),
                token_id: token_id.map(String::from),
                message_id: message_id.map(String::from),
                created_at: now,
            },
        )
        .await
    }
}

fn required<'a>(argument: Option<&'a str>, usage: &str) -> Result<&'a str, CrosspostError> {
    argument.ok_or_else(|| CrosspostError::validation(format!("usage: {usage}")))
}
