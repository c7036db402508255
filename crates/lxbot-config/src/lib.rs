// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the lxbot Ollama bridge.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, and Elm-style diagnostic
//! error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use lxbot_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Bot name: {}", config.bot.name);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{Overrides, load_config, load_config_from_path, load_config_from_str};
pub use model::LxbotConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Returns either a valid `LxbotConfig` or a list of diagnostic errors.
pub fn load_and_validate() -> Result<LxbotConfig, Vec<ConfigError>> {
    load_and_validate_with(&Overrides::default())
}

/// Load configuration with command-line overrides and validate it.
///
/// 1. Loads config from TOML files, env vars and `overrides` via Figment
/// 2. On success: runs post-deserialization validation
/// 3. On Figment error: converts to rich miette diagnostics with typo suggestions
pub fn load_and_validate_with(overrides: &Overrides) -> Result<LxbotConfig, Vec<ConfigError>> {
    match loader::load_config_with(overrides) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let toml_sources = collect_toml_sources(overrides.config_path.as_deref());
            Err(diagnostic::figment_to_config_errors(err, &toml_sources))
        }
    }
}

/// Load configuration from a specific TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<LxbotConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![(diagnostic::INLINE_SOURCE.to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Collect TOML source file contents for error span resolution.
fn collect_toml_sources(explicit: Option<&std::path::Path>) -> Vec<(String, String)> {
    let mut sources = Vec::new();

    if let Some(path) = explicit
        && let Ok(content) = std::fs::read_to_string(path)
    {
        let path = std::fs::canonicalize(path)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| path.display().to_string());
        sources.push((path, content));
    }

    // Local config
    if let Ok(content) = std::fs::read_to_string("lxbot.toml") {
        let path = std::env::current_dir()
            .map(|d| d.join("lxbot.toml").display().to_string())
            .unwrap_or_else(|_| "lxbot.toml".to_string());
        sources.push((path, content));
    }

    if let Some(path) = loader::user_config_path()
        && let Ok(content) = std::fs::read_to_string(&path)
    {
        sources.push((path.display().to_string(), content));
    }

    let system_path = std::path::Path::new("/etc/lxbot/lxbot.toml");
    if let Ok(content) = std::fs::read_to_string(system_path) {
        sources.push((system_path.display().to_string(), content));
    }

    sources
}
