// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration error diagnostics rendered through miette.

use miette::Diagnostic;
use thiserror::Error;

/// A configuration error suitable for terminal rendering.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// The configuration failed to parse or deserialize.
    #[error("configuration could not be loaded: {message}")]
    #[diagnostic(
        code(crosspost::config::parse),
        help("check crosspost.toml against the documented keys; unknown keys are rejected")
    )]
    Parse {
        /// Figment's rendered error, including the offending key path.
        message: String,
    },

    /// A value parsed but violates a semantic constraint.
    #[error("{message}")]
    #[diagnostic(code(crosspost::config::validation))]
    Validation { message: String },
}

/// Render collected config errors to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        eprintln!("{:?}", miette::Report::msg(error.to_string()));
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Parse {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_displays_message_verbatim() {
        let err = ConfigError::Validation {
            message: "storage.database_path must not be empty".into(),
        };
        assert_eq!(err.to_string(), "storage.database_path must not be empty");
    }

    #[test]
    fn figment_errors_convert_to_parse_errors() {
        let result = crate::loader::load_config_from_str("[scheduler]\nbogus = 1\n");
        let err: ConfigError = result.unwrap_err().into();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
