// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Crosspost.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Crosspost configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with `CROSSPOST_*`
/// environment variable overrides. All sections default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CrosspostConfig {
    /// Worker scheduling and rollout settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Telegram control-plane settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Ledger storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Credential vault settings.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Timing-engine settings.
    #[serde(default)]
    pub timing: TimingConfig,

    /// LinkedIn connector settings.
    #[serde(default)]
    pub linkedin: ConnectorConfig,

    /// X connector settings.
    #[serde(default)]
    pub x: ConnectorConfig,
}

/// Worker scheduling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Seconds between worker poll cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    /// When true, all publishes run in dry-run mode (no live API calls).
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,

    /// Per-connector-call timeout in seconds; exceeding it is an
    /// ambiguous outcome, never a success.
    #[serde(default = "default_connector_timeout")]
    pub connector_timeout_seconds: u64,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            dry_run: default_dry_run(),
            connector_timeout_seconds: default_connector_timeout(),
            log_level: default_log_level(),
        }
    }
}

fn default_poll_interval() -> u64 {
    60
}

fn default_dry_run() -> bool {
    true
}

fn default_connector_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram control-plane configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API token. Required for the Telegram runtime and notifier.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// The single authorized operator's Telegram user id (also the chat id
    /// alerts are delivered to).
    #[serde(default)]
    pub allowed_user_id: Option<String>,
}

/// Ledger storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("crosspost/crosspost.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "crosspost.db".to_string())
}

/// Credential vault configuration. The encryption key itself comes from
/// the `CROSSPOST_ENCRYPTION_KEY` environment variable, never from config.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Path to the encrypted token file.
    #[serde(default = "default_vault_path")]
    pub file_path: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            file_path: default_vault_path(),
        }
    }
}

fn default_vault_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("crosspost/tokens.enc"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "tokens.enc".to_string())
}

/// Timing-engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    /// Default audience timezone as a fixed UTC offset in minutes.
    /// -300 is US Eastern standard time.
    #[serde(default = "default_audience_offset")]
    pub audience_utc_offset_minutes: i32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            audience_utc_offset_minutes: default_audience_offset(),
        }
    }
}

fn default_audience_offset() -> i32 {
    -300
}

/// Per-platform connector endpoint configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectorConfig {
    /// Publish endpoint URL. Absent means live publishing is unavailable
    /// (dry-run still works).
    #[serde(default)]
    pub publish_url: Option<String>,

    /// Verification lookup endpoint URL.
    #[serde(default)]
    pub verify_url: Option<String>,

    /// Application client id.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Application client secret.
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_safe() {
        let config = CrosspostConfig::default();
        assert_eq!(config.scheduler.poll_interval_seconds, 60);
        assert!(config.scheduler.dry_run, "default must be dry-run");
        assert_eq!(config.scheduler.connector_timeout_seconds, 30);
        assert_eq!(config.timing.audience_utc_offset_minutes, -300);
        assert!(config.telegram.bot_token.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml = "[scheduler]\npoll_interval_secs = 10\n";
        let result: Result<CrosspostConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn sections_deserialize_independently() {
        let toml = r#"
[telegram]
bot_token = "123:abc"
allowed_user_id = "42"

[scheduler]
dry_run = false
"#;
        let config: CrosspostConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
        assert!(!config.scheduler.dry_run);
        // Untouched sections keep defaults.
        assert_eq!(config.scheduler.poll_interval_seconds, 60);
    }
}
