// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Preflight content validation, staged by how close the post is to going
//! live.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Platform, Post};

/// Validation stage. `PrePublish` additionally requires the frozen
/// approval hash to be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreflightStage {
    PreApproval,
    PreSchedule,
    PrePublish,
}

#[derive(Debug, Clone)]
pub struct PreflightResult {
    pub ok: bool,
    pub errors: Vec<String>,
}

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[^}]+\}\}").expect("placeholder regex"));

fn max_length(platform: Platform) -> usize {
    match platform {
        Platform::Linkedin => 120_000,
        Platform::X => 25_000,
    }
}

/// Validate a post's content for the given stage. Collects every failure
/// reason rather than stopping at the first.
pub fn validate_post(post: &Post, stage: PreflightStage) -> PreflightResult {
    let mut errors = Vec::new();
    let content = post.content.trim();

    if content.is_empty() {
        return PreflightResult {
            ok: false,
            errors: vec!["content is empty".to_string()],
        };
    }

    if content.chars().count() > max_length(post.platform) {
        errors.push(format!("content exceeds max length for {}", post.platform));
    }

    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|ln| !ln.is_empty())
        .collect();
    if lines.len() < 2 {
        errors.push("content must include title and body".to_string());
    } else {
        if lines[0].chars().count() < 5 {
            errors.push("title line too short".to_string());
        }
        let body_words = lines[1..].join(" ").split_whitespace().count();
        if body_words < 20 {
            errors.push("body too short".to_string());
        }
    }

    if PLACEHOLDER_RE.is_match(content) {
        errors.push("unresolved template placeholders detected".to_string());
    }

    if stage == PreflightStage::PrePublish && post.approved_content_hash.is_none() {
        errors.push("approved_content_hash missing".to_string());
    }

    PreflightResult {
        ok: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Platform, Post, PostState};
    use chrono::Utc;

    fn post(content: &str) -> Post {
        let now = Utc::now();
        Post {
            id: "post_test0001".into(),
            campaign_id: "camp_test0001".into(),
            platform: Platform::X,
            content: content.into(),
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
        }
    }

    const VALID: &str = "A perfectly fine title\n\nThis body has more than twenty words in it \
        because we keep typing words until the count comfortably clears the minimum threshold.";

    #[test]
    fn valid_content_passes_pre_approval() {
        let result = validate_post(&post(VALID), PreflightStage::PreApproval);
        assert!(result.ok, "errors: {:?}", result.errors);
    }

    #[test]
    fn empty_content_short_circuits() {
        let result = validate_post(&post("   "), PreflightStage::PreApproval);
        assert!(!result.ok);
        assert_eq!(result.errors, vec!["content is empty"]);
    }

    #[test]
    fn missing_body_is_rejected() {
        let result = validate_post(&post("Just a title"), PreflightStage::PreApproval);
        assert!(result.errors.contains(&"content must include title and body".to_string()));
    }

    #[test]
    fn short_title_and_body_collect_both_errors() {
        let result = validate_post(&post("Hi\n\nfew words only"), PreflightStage::PreApproval);
        assert!(result.errors.contains(&"title line too short".to_string()));
        assert!(result.errors.contains(&"body too short".to_string()));
    }

    #[test]
    fn unresolved_placeholders_are_rejected() {
        let content = format!("{VALID}\n\nRead more at {{{{article_url}}}}");
        let result = validate_post(&post(&content), PreflightStage::PreSchedule);
        assert!(result
            .errors
            .contains(&"unresolved template placeholders detected".to_string()));
    }

    #[test]
    fn pre_publish_requires_frozen_hash() {
        let result = validate_post(&post(VALID), PreflightStage::PrePublish);
        assert!(result
            .errors
            .contains(&"approved_content_hash missing".to_string()));

        let mut approved = post(VALID);
        approved.approved_content_hash = Some("abc123".into());
        let result = validate_post(&approved, PreflightStage::PrePublish);
        assert!(result.ok);
    }

    #[test]
    fn oversized_x_content_is_rejected() {
        let body = "word ".repeat(6000);
        let content = format!("A fine title line\n\n{body}");
        let result = validate_post(&post(&content), PreflightStage::PreApproval);
        assert!(result.errors.iter().any(|e| e.contains("max length")));
    }
}
