// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event-log helper shared by the scheduling and interlock operations.

use chrono::{DateTime, Utc};
use crosspost_core::CrosspostError;
use crosspost_core::ids::new_id;
use crosspost_core::types::Event;
use crosspost_storage::Database;
use crosspost_storage::queries::events;

/// Append one operational event.
pub async fn record_event(
    db: &Database,
    event_type: &str,
    campaign_id: Option<&str>,
    post_id: Option<&str>,
    details: serde_json::Value,
    now: DateTime<Utc>,
) -> Result<(), CrosspostError> {
    events::insert_event(
        db,
        &Event {
            id: new_id("evt"),
            event_type: event_type.to_string(),
            campaign_id: campaign_id.map(String::from),
            post_id: post_id.map(String::from),
            details,
            created_at: now,
        },
    )
    .await
}
