// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human decision control plane: command dispatch, confirmation tokens,
//! rate limiting, and decision-request maintenance.

pub mod plane;
pub mod rate_limit;
pub mod reminders;
pub mod tokens;

pub use plane::{CommandReply, ControlPlane};
pub use reminders::MaintenanceReport;
