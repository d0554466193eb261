// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Draft generation from a markdown source document.
//!
//! Drafts are starting points for the mandatory human edit, not final
//! copy: the approval path rejects posts that were never edited.

/// Split a markdown document into (title, paragraphs).
///
/// The title is the first heading, or the first non-empty line when no
/// heading exists. Paragraphs are blank-line separated blocks, headings
/// excluded.
fn parse_source(source: &str) -> (String, Vec<String>) {
    let mut title = None;
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
            continue;
        }
        if trimmed.starts_with('#') {
            if title.is_none() {
                title = Some(trimmed.trim_start_matches('#').trim().to_string());
            }
            continue;
        }
        if title.is_none() {
            title = Some(trimmed.to_string());
            continue;
        }
        current.push(trimmed.to_string());
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    (title.unwrap_or_default(), paragraphs)
}

/// Draft the LinkedIn post: title, the first two paragraphs, and a source
/// attribution line.
pub fn draft_linkedin(source: &str, source_path: &str) -> String {
    let (title, paragraphs) = parse_source(source);
    let mut sections = vec![title];
    sections.extend(paragraphs.into_iter().take(2));
    sections.push(format!("Source: {source_path}"));
    sections.join("\n\n")
}

/// Draft the X post: title and the first paragraph.
pub fn draft_x(source: &str, source_path: &str) -> String {
    let (title, paragraphs) = parse_source(source);
    let mut sections = vec![title];
    sections.extend(paragraphs.into_iter().take(1));
    sections.push(format!("Source: {source_path}"));
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "# Shipping the v2 pipeline\n\n\
        We rebuilt the ingestion pipeline from scratch over the last quarter \
        and it now handles ten times the load with half the machines.\n\n\
        The trick was moving from per-record locking to an append-only log \
        with periodic compaction, which simplified recovery enormously.\n\n\
        A third paragraph that should only show up nowhere.\n";

    #[test]
    fn linkedin_draft_takes_title_and_two_paragraphs() {
        let draft = draft_linkedin(SOURCE, "drafts/v2.md");
        assert!(draft.starts_with("Shipping the v2 pipeline\n\n"));
        assert!(draft.contains("rebuilt the ingestion pipeline"));
        assert!(draft.contains("append-only log"));
        assert!(!draft.contains("third paragraph"));
        assert!(draft.ends_with("Source: drafts/v2.md"));
    }

    #[test]
    fn x_draft_takes_only_the_first_paragraph() {
        let draft = draft_x(SOURCE, "drafts/v2.md");
        assert!(draft.contains("rebuilt the ingestion pipeline"));
        assert!(!draft.contains("append-only log"));
    }

    #[test]
    fn missing_heading_uses_first_line_as_title() {
        let source = "Just a plain first line\n\nThen a body paragraph here.\n";
        let draft = draft_x(source, "a.md");
        assert!(draft.starts_with("Just a plain first line\n\n"));
        assert!(draft.contains("body paragraph"));
    }
}
