// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Miette-based diagnostic rendering for configuration errors.
//!
//! Converts Figment deserialization errors and validation failures into
//! diagnostics the user can act on at startup.

use miette::Diagnostic;
use thiserror::Error;

/// A configuration error with diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A TOML parse or deserialization error from Figment.
    #[error("configuration parse error: {message}")]
    #[diagnostic(
        code(kotoba::config::parse),
        help("check kotoba.toml against the documented sections")
    )]
    Parse {
        /// Description of the parse failure, including the offending key.
        message: String,
    },

    /// A semantic validation error for a config value.
    #[error("validation error: {message}")]
    #[diagnostic(code(kotoba::config::validation))]
    Validation {
        /// Description of the constraint that failed.
        message: String,
    },
}

/// Convert a Figment error into one diagnostic per underlying failure.
pub fn figment_to_config_errors(err: figment::Error) -> Vec<ConfigError> {
    err.into_iter()
        .map(|e| ConfigError::Parse {
            message: e.to_string(),
        })
        .collect()
}

/// Render collected configuration errors to stderr via miette.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        let report = miette::Report::msg(error.to_string());
        eprintln!("{report:?}");
    }
    eprintln!(
        "error: configuration invalid ({} problem{})",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    );
}
