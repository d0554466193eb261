// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams to the external collaborators: platform connectors and the
//! chat transport. The worker and control plane depend only on these.

use async_trait::async_trait;

use crate::error::CrosspostError;
use crate::retry::PublishOutcome;
use crate::types::Platform;

/// Identifier of a message delivered through the chat transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatMessageId(pub String);

/// One publishing platform (LinkedIn, X).
///
/// `publish` never panics and never raises: every result, including
/// indeterminate ones, is reported through the closed [`PublishOutcome`]
/// set. Implementations must bound their own network timeouts.
#[async_trait]
pub trait PlatformConnector: Send + Sync {
    fn platform(&self) -> Platform;

    /// Publish `content`, tagging the request with the idempotency key.
    async fn publish(&self, content: &str, idempotency_key: &str, dry_run: bool) -> PublishOutcome;

    /// Verification lookup: does a post with this idempotency key exist?
    /// Returns the external post id when found. Used to reconcile
    /// ambiguous outcomes before any retry.
    async fn lookup(&self, idempotency_key: &str) -> Result<Option<String>, CrosspostError>;
}

/// Two-way chat transport to the human operator.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a plain alert. `critical` alerts ring through; non-critical
    /// ones are delivered silently.
    async fn send_alert(&self, text: &str, critical: bool) -> Result<ChatMessageId, CrosspostError>;

    /// Send a decision card with inline Approve/Reject actions bound to
    /// the request id.
    async fn send_decision_card(
        &self,
        request_id: &str,
        message: &str,
    ) -> Result<ChatMessageId, CrosspostError>;

    /// Is the transport currently reachable? The worker's fail-safe
    /// consults this before trusting that open decision requests can
    /// reach the operator.
    async fn healthy(&self) -> bool;
}
