// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity types shared across the Crosspost workspace.
//!
//! Everything here is plain data. Lifecycle rules live in
//! [`crate::state_machine`]; persistence lives in `crosspost-storage`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Target publishing platform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linkedin,
    X,
}

impl Platform {
    /// Both platforms, in campaign creation order.
    pub const ALL: [Platform; 2] = [Platform::Linkedin, Platform::X];
}

/// Lifecycle state of a [`Post`].
///
/// `posted` and `canceled` are terminal. `pending_manual` parks a post
/// awaiting an operator decision; the worker never auto-advances it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PostState {
    Draft,
    ReadyForApproval,
    PendingManual,
    Approved,
    Scheduled,
    Posted,
    Failed,
    Canceled,
}

impl PostState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PostState::Posted | PostState::Canceled)
    }
}

/// Outcome classification of a single publish attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    TransientFailure,
    PermanentFailure,
    Ambiguous,
}

/// Staged rollout of live publishing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RolloutStage {
    DryRunOnly,
    LinkedinLive,
    AllLive,
}

/// A scheduled publish event spanning both platforms at one shared time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub source_path: String,
    /// Audience timezone as a fixed UTC offset in minutes (e.g. -300).
    pub audience_utc_offset_minutes: i32,
    pub campaign_time_utc: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency version, incremented on every write.
    pub version: i64,
}

/// One platform-specific publish unit belonging to a [`Campaign`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub campaign_id: String,
    pub platform: Platform,
    pub content: String,
    pub state: PostState,
    /// Frozen at approval; the publish payload pin and half the
    /// idempotency key. Never recomputed after it is set.
    pub approved_content_hash: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub edited_at: Option<DateTime<Utc>>,
    pub scheduled_for_utc: Option<DateTime<Utc>>,
    pub recommended_for_utc: Option<DateTime<Utc>>,
    pub recommended_confidence: Option<f64>,
    pub recommended_reasoning: Option<String>,
    pub recommendation_fallback_used: bool,
    /// Set when an ambiguous outcome could not be verified; blocks
    /// automatic execution until an operator resolves it.
    pub needs_verification: bool,
    pub external_post_id: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

/// One execution try of a post's publish action. Append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: String,
    pub post_id: String,
    pub attempt_number: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: AttemptOutcome,
    pub error_redacted: Option<String>,
    pub idempotency_key: String,
    pub external_post_id: Option<String>,
}

/// What kind of human decision a request asks for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Approval,
    /// Reconfirm a schedule (missed window, kill-switch resume).
    Confirmation,
    LowConfidenceConfirm,
    RetryDecision,
    KillSwitchToggle,
    Override,
}

/// Lifecycle status of a decision request.
///
/// `open -> resolved`, or `open -> pending_manual` exactly once when the
/// 30-minute expiry passes without a resolution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Open,
    Resolved,
    PendingManual,
}

/// An outstanding ask routed to the human operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub id: String,
    pub campaign_id: Option<String>,
    pub post_id: Option<String>,
    pub kind: DecisionKind,
    pub message: String,
    /// Critical requests bypass quiet-hour reminder suppression.
    pub critical: bool,
    pub status: DecisionStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_reminder_at: Option<DateTime<Utc>>,
    pub reminder_count: i64,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_action: Option<String>,
    pub resolved_by: Option<String>,
    pub resolving_message_id: Option<String>,
}

/// Minutes an open decision request stays actionable before it parks as
/// `pending_manual`.
pub const DECISION_EXPIRY_MINUTES: i64 = 30;

impl DecisionRequest {
    /// A freshly opened request with the standard 30-minute expiry.
    pub fn open(
        kind: DecisionKind,
        campaign_id: Option<String>,
        post_id: Option<String>,
        message: String,
        critical: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: crate::ids::new_id("dec"),
            campaign_id,
            post_id,
            kind,
            message,
            critical,
            status: DecisionStatus::Open,
            created_at: now,
            expires_at: now + chrono::Duration::minutes(DECISION_EXPIRY_MINUTES),
            last_reminder_at: None,
            reminder_count: 0,
            resolved_at: None,
            resolution_action: None,
            resolved_by: None,
            resolving_message_id: None,
        }
    }
}

/// Critical actions a confirmation token can authorize.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TokenAction {
    KillSwitchOn,
    KillSwitchOff,
    ManualOverridePublish,
    CancelScheduledPost,
    HealthGateOverride,
}

/// Single-use credential bound to one critical action and target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationToken {
    pub id: String,
    pub action: TokenAction,
    pub target_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by: Option<String>,
}

/// Write-once audit row for every inbound decision, rejection, and
/// control-plane action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionAudit {
    pub id: String,
    pub campaign_id: Option<String>,
    pub post_id: Option<String>,
    pub user_id: String,
    pub action: String,
    pub token_id: Option<String>,
    pub message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One rate-limiter evaluation, allowed or rejected. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitEvent {
    pub id: String,
    pub user_id: String,
    pub command: String,
    pub window_start_utc: DateTime<Utc>,
    pub window_end_utc: DateTime<Utc>,
    pub action_taken: String,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of one daily health-gate evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckStatus {
    pub id: String,
    pub date_local: String,
    pub checked_at: DateTime<Utc>,
    pub overall_status: String,
    pub token_status: String,
    pub worker_status: String,
    pub kill_switch_status: String,
    pub critical_failure_status: String,
}

impl HealthCheckStatus {
    pub fn passed(&self) -> bool {
        self.overall_status == "pass"
    }
}

/// Audit row for a token-gated manual override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideAudit {
    pub id: String,
    pub campaign_id: Option<String>,
    pub post_id: String,
    pub user_id: String,
    pub reason: String,
    pub confirmation_token_id: String,
    pub created_at: DateTime<Utc>,
}

/// A key/value system control read fresh by every worker cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemControl {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Well-known system control keys.
pub mod controls {
    pub const GLOBAL_PUBLISH_PAUSED: &str = "global_publish_paused";
    pub const HEALTH_GATE_LAST_PASS_DATE: &str = "health_gate_last_pass_date";
    pub const HEALTH_GATE_OVERRIDE_ONCE: &str = "health_gate_override_once";
    pub const WORKER_LAST_HEARTBEAT_UTC: &str = "worker_last_heartbeat_utc";
    pub const ROLLOUT_STAGE: &str = "rollout_stage";
    /// Set once the worker has alerted about an engaged kill switch;
    /// cleared on release so the next engagement alerts again.
    pub const KILL_SWITCH_ALERTED: &str = "kill_switch_alerted";
    /// Timestamp of the last recurring credential-failure alert.
    pub const TOKEN_FAILURE_LAST_ALERT_UTC: &str = "token_failure_last_alert_utc";
}

/// Operational event appended to the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub event_type: String,
    pub campaign_id: Option<String>,
    pub post_id: Option<String>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
