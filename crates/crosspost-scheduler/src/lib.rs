// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign scheduling, safety interlocks, and digest reporting.

pub mod drafting;
pub mod events;
pub mod interlocks;
pub mod reports;
pub mod service;

pub use service::{ApprovalOutcome, MISSED_WINDOW_HOURS, Scheduler};
