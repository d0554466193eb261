// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure post-lifecycle state machine.
//!
//! Callers must evaluate transitions against the state re-read from
//! storage, never against a caller-supplied snapshot, so a stale read
//! cannot smuggle an illegal edge past the guard.

use crate::error::CrosspostError;
use crate::types::PostState;

/// Legal outbound edges per state. Empty slice means terminal.
pub fn allowed_transitions(from: PostState) -> &'static [PostState] {
    use PostState::*;
    match from {
        Draft => &[ReadyForApproval, Canceled],
        ReadyForApproval => &[PendingManual, Approved, Canceled],
        PendingManual => &[Approved, Scheduled, Canceled],
        Approved => &[Scheduled, Canceled],
        Scheduled => &[Posted, Failed, Canceled, PendingManual],
        Failed => &[Scheduled, Canceled],
        Posted => &[],
        Canceled => &[],
    }
}

pub fn can_transition(from: PostState, to: PostState) -> bool {
    allowed_transitions(from).contains(&to)
}

/// Reject any edge not in the table with a typed error. Never mutates
/// anything; the caller applies the transition only on `Ok`.
pub fn ensure_transition(from: PostState, to: PostState) -> Result<(), CrosspostError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(CrosspostError::IllegalTransition { from, to })
    }
}
