// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound routing: authorization filtering and callback parsing.
//!
//! The control plane re-checks authorization itself; the checks here only
//! decide whether a message is worth forwarding at all.

use teloxide::prelude::*;
use teloxide::types::ChatKind;

/// Does the sender match the single allowed operator id?
///
/// Messages without a sender (channel posts) always fail. An unset
/// operator id rejects everything.
pub fn is_authorized(msg: &Message, allowed_user_id: &str) -> bool {
    if allowed_user_id.is_empty() {
        return false;
    }
    msg.from
        .as_ref()
        .is_some_and(|u| u.id.0.to_string() == allowed_user_id)
}

/// Is the message from a private (DM) chat? Groups and channels are
/// ignored entirely.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

/// Parse decision-card callback data into (approve, request_id).
pub fn parse_callback(data: &str) -> Option<(bool, &str)> {
    if let Some(id) = data.strip_prefix("approve:") {
        return Some((true, id));
    }
    if let Some(id) = data.strip_prefix("reject:") {
        return Some((false, id));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_private_message(user_id: u64, text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
            },
            "text": text,
        });
        serde_json::from_value(json).expect("valid message json")
    }

    #[test]
    fn authorization_matches_exact_user_id() {
        let msg = make_private_message(42, "/status");
        assert!(is_authorized(&msg, "42"));
        assert!(!is_authorized(&msg, "43"));
        assert!(!is_authorized(&msg, ""));
    }

    #[test]
    fn private_chats_pass_the_dm_filter() {
        let msg = make_private_message(42, "hello");
        assert!(is_dm(&msg));
    }

    #[test]
    fn callback_data_round_trip() {
        assert_eq!(parse_callback("approve:dec_1"), Some((true, "dec_1")));
        assert_eq!(parse_callback("reject:dec_1"), Some((false, "dec_1")));
        assert_eq!(parse_callback("garbage"), None);
    }
}
