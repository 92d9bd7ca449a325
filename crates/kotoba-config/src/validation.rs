// SPDX-FileCopyrightText: 2026 Kotoba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as the chunking invariant `overlap < chunk_size`.

use crate::diagnostic::ConfigError;
use crate::model::KotobaConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &KotobaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.knowledge.chunk_size == 0 {
        errors.push(ConfigError::Validation {
            message: "knowledge.chunk_size must be at least 1".to_string(),
        });
    }

    // The chunker rejects overlap >= max_size; catch it at startup instead.
    if config.knowledge.chunk_overlap >= config.knowledge.chunk_size {
        errors.push(ConfigError::Validation {
            message: format!(
                "knowledge.chunk_overlap ({}) must be smaller than knowledge.chunk_size ({})",
                config.knowledge.chunk_overlap, config.knowledge.chunk_size
            ),
        });
    }

    if config.knowledge.top_k == 0 {
        errors.push(ConfigError::Validation {
            message: "knowledge.top_k must be at least 1".to_string(),
        });
    }

    if config.embedding.dimensions == 0 {
        errors.push(ConfigError::Validation {
            message: "embedding.dimensions must be at least 1".to_string(),
        });
    }

    if config.embedding.base_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "embedding.base_url must not be empty".to_string(),
        });
    }

    if config.anthropic.max_tokens == 0 {
        errors.push(ConfigError::Validation {
            message: "anthropic.max_tokens must be at least 1".to_string(),
        });
    }

    if config.gateway.enabled {
        let addr = config.gateway.host.trim();
        if addr.is_empty() {
            errors.push(ConfigError::Validation {
                message: "gateway.host must not be empty".to_string(),
            });
        } else {
            let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
            let is_valid_hostname = addr
                .chars()
                .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
            if !is_valid_ip && !is_valid_hostname {
                errors.push(ConfigError::Validation {
                    message: format!("gateway.host `{addr}` is not a valid IP address or hostname"),
                });
            }
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
