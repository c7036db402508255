// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./lxbot.toml` > `~/.config/lxbot/lxbot.toml` > `/etc/lxbot/lxbot.toml`
//! with environment variable overrides via the `LXBOT_` prefix, the
//! unprefixed variables the bot has always honoured (`OLLAMA_API_URL`,
//! `OLLAMA_MODEL`, `BOT_NAME`, `SYSTEM_PROMPT`, `LXMF_ADMINS`), and finally
//! command-line overrides.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
    value::Uncased,
};

use crate::model::LxbotConfig;

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Explicit config file, merged after the XDG hierarchy.
    pub config_path: Option<PathBuf>,
    pub name: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    /// Comma-separated admin addresses.
    pub admins: Option<String>,
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/lxbot/lxbot.toml` (system-wide)
/// 3. `~/.config/lxbot/lxbot.toml` (user XDG config)
/// 4. `./lxbot.toml` (local directory)
/// 5. Legacy unprefixed environment variables
/// 6. `LXBOT_*` environment variables
pub fn load_config() -> Result<LxbotConfig, figment::Error> {
    build_figment(&Overrides::default()).extract()
}

/// Load configuration with command-line overrides applied last.
pub fn load_config_with(overrides: &Overrides) -> Result<LxbotConfig, figment::Error> {
    build_figment(overrides).extract()
}

/// Load configuration from a TOML string only (no files, no environment).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<LxbotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LxbotConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LxbotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LxbotConfig::default()))
        .merge(Toml::file(path))
        .merge(legacy_env_provider())
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment(overrides: &Overrides) -> Figment {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(LxbotConfig::default()))
        .merge(Toml::file("/etc/lxbot/lxbot.toml"))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file("lxbot.toml"));

    if let Some(path) = &overrides.config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(legacy_env_provider());
    if let Ok(admins) = std::env::var("LXMF_ADMINS") {
        figment = figment.merge(("bot.admins", split_admins(&admins)));
    }
    figment = figment.merge(env_provider());

    apply_overrides(figment, overrides)
}

/// Path of the per-user config file, if the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lxbot/lxbot.toml"))
}

fn apply_overrides(mut figment: Figment, overrides: &Overrides) -> Figment {
    if let Some(name) = &overrides.name {
        figment = figment.merge(("bot.name", name.as_str()));
    }
    if let Some(url) = &overrides.base_url {
        figment = figment.merge(("ollama.base_url", url.as_str()));
    }
    if let Some(model) = &overrides.model {
        figment = figment.merge(("ollama.model", model.as_str()));
    }
    if let Some(admins) = &overrides.admins {
        figment = figment.merge(("bot.admins", split_admins(admins)));
    }
    figment
}

/// Split a comma-separated admin list, dropping empty entries.
pub fn split_admins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Prefix of the environment variables that mirror `lxbot.toml` keys.
pub const ENV_PREFIX: &str = "LXBOT_";

/// Unprefixed variables from earlier deployments of the bot, with the key
/// each one sets.
pub const LEGACY_ENV: &[(&str, &str)] = &[
    ("OLLAMA_API_URL", "ollama.base_url"),
    ("OLLAMA_MODEL", "ollama.model"),
    ("BOT_NAME", "bot.name"),
    ("SYSTEM_PROMPT", "chat.system_prompt"),
];

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")`: `LXBOT_OLLAMA_BASE_URL` must
/// map to `ollama.base_url`, not `ollama.base.url`.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| {
        let mapped = key
            .as_str()
            .to_ascii_lowercase()
            .replacen("bot_", "bot.", 1)
            .replacen("ollama_", "ollama.", 1)
            .replacen("queue_", "queue.", 1)
            .replacen("chat_", "chat.", 1)
            .replacen("storage_", "storage.", 1);
        mapped.into()
    })
}

fn legacy_env_provider() -> Env {
    let names: Vec<&str> = LEGACY_ENV.iter().map(|(var, _)| *var).collect();
    Env::raw().only(&names).map(|key| {
        LEGACY_ENV
            .iter()
            .find(|(var, _)| key.as_str().eq_ignore_ascii_case(var))
            .map(|(_, path)| Uncased::from(*path))
            .unwrap_or_else(|| Uncased::from(key.as_str().to_ascii_lowercase()))
    })
}
