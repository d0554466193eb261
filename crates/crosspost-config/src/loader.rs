// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Merge hierarchy: compiled defaults < `/etc/crosspost/crosspost.toml` <
//! `~/.config/crosspost/crosspost.toml` < `./crosspost.toml` < `CROSSPOST_*`
//! environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::CrosspostConfig;

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<CrosspostConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CrosspostConfig::default()))
        .merge(Toml::file("/etc/crosspost/crosspost.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("crosspost/crosspost.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("crosspost.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<CrosspostConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CrosspostConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CrosspostConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CrosspostConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so underscore-bearing
/// key names stay unambiguous: `CROSSPOST_TELEGRAM_BOT_TOKEN` maps to
/// `telegram.bot_token`, not `telegram.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("CROSSPOST_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("scheduler_", "scheduler.", 1)
            .replacen("telegram_", "telegram.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("vault_", "vault.", 1)
            .replacen("timing_", "timing.", 1)
            .replacen("linkedin_", "linkedin.", 1)
            .replacen("x_", "x.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_loading_applies_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.scheduler.poll_interval_seconds, 60);
        assert!(config.scheduler.dry_run);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[scheduler]
poll_interval_seconds = 15

[timing]
audience_utc_offset_minutes = 60
"#,
        )
        .unwrap();
        assert_eq!(config.scheduler.poll_interval_seconds, 15);
        assert_eq!(config.timing.audience_utc_offset_minutes, 60);
    }

    #[test]
    fn unknown_section_key_is_an_error() {
        let result = load_config_from_str("[scheduler]\npoll_secs = 5\n");
        assert!(result.is_err());
    }
}
