// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secret redaction for error text before it reaches the ledger or chat.

use std::sync::LazyLock;

use regex::Regex;

static PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        // Authorization headers and bearer tokens.
        (
            Regex::new(r"(?i)(authorization\s*[:=]\s*bearer\s+)[^\s,;]+").expect("redact regex"),
            "${1}[REDACTED]",
        ),
        (
            Regex::new(r"(?i)(bearer\s+)[^\s,;]+").expect("redact regex"),
            "${1}[REDACTED]",
        ),
        // Common secret key/value pairs.
        (
            Regex::new(r"(?i)\b(token|access_token|refresh_token|api_key|secret)\s*[:=]\s*[^\s,;]+")
                .expect("redact regex"),
            "${1}=[REDACTED]",
        ),
    ]
});

/// Replace token-like material in `text` with `[REDACTED]`.
pub fn redact_secrets(text: &str) -> String {
    let mut out = text.to_string();
    for (pattern, repl) in PATTERNS.iter() {
        out = pattern.replace_all(&out, *repl).into_owned();
    }
    out
}
