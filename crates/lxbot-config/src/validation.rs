// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as URL schemes, non-zero capacities and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::LxbotConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &LxbotConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let base_url = config.ollama.base_url.trim();
    if base_url.is_empty() {
        errors.push(ConfigError::Validation {
            message: "ollama.base_url must not be empty".to_string(),
        });
    } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push(ConfigError::Validation {
            message: format!("ollama.base_url `{base_url}` must start with http:// or https://"),
        });
    }

    if config.ollama.model.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "ollama.model must not be empty".to_string(),
        });
    }

    if config.ollama.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "ollama.timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.ollama.probe_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "ollama.probe_timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.queue.capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.capacity must be at least 1".to_string(),
        });
    }

    let prefix = &config.bot.command_prefix;
    if prefix.is_empty() || prefix.chars().any(char::is_whitespace) {
        errors.push(ConfigError::Validation {
            message: format!(
                "bot.command_prefix `{prefix}` must be non-empty and contain no whitespace"
            ),
        });
    }

    if !LOG_LEVELS.contains(&config.bot.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "bot.log_level `{}` must be one of: {}",
                config.bot.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
