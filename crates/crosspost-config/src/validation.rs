// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints serde attributes cannot express.

use crate::diagnostic::ConfigError;
use crate::model::CrosspostConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects all failures rather than failing fast.
pub fn validate_config(config: &CrosspostConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.scheduler.poll_interval_seconds < 5 {
        errors.push(ConfigError::Validation {
            message: format!(
                "scheduler.poll_interval_seconds must be at least 5, got {}",
                config.scheduler.poll_interval_seconds
            ),
        });
    }

    if config.scheduler.connector_timeout_seconds == 0 {
        errors.push(ConfigError::Validation {
            message: "scheduler.connector_timeout_seconds must be positive".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // UTC offsets beyond +/-14h do not exist.
    let offset = config.timing.audience_utc_offset_minutes;
    if !(-14 * 60..=14 * 60).contains(&offset) {
        errors.push(ConfigError::Validation {
            message: format!(
                "timing.audience_utc_offset_minutes must be within +/-840, got {offset}"
            ),
        });
    }

    if let Some(token) = &config.telegram.bot_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "telegram.bot_token must not be empty when set".to_string(),
        });
    }

    if config.telegram.bot_token.is_some() && config.telegram.allowed_user_id.is_none() {
        errors.push(ConfigError::Validation {
            message: "telegram.allowed_user_id is required when telegram.bot_token is set"
                .to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&CrosspostConfig::default()).is_ok());
    }

    #[test]
    fn tiny_poll_interval_is_rejected() {
        let mut config = CrosspostConfig::default();
        config.scheduler.poll_interval_seconds = 1;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("poll_interval")));
    }

    #[test]
    fn bot_token_requires_allowed_user() {
        let mut config = CrosspostConfig::default();
        config.telegram.bot_token = Some("123:abc".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("allowed_user_id")));
    }

    #[test]
    fn impossible_utc_offset_is_rejected() {
        let mut config = CrosspostConfig::default();
        config.timing.audience_utc_offset_minutes = 2000;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = CrosspostConfig::default();
        config.scheduler.poll_interval_seconds = 0;
        config.storage.database_path = " ".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 2);
    }
}
