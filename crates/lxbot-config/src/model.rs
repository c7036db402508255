// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for lxbot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages. Every
//! optional bot-wide switch is an explicit field that defaults to off.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level lxbot configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable and command-line overrides. All sections default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LxbotConfig {
    /// Bot identity and behavior settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// Inference backend settings.
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Dispatch queue settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Conversation settings.
    #[serde(default)]
    pub chat: ChatConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Bot identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name of the bot.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Prefix marking a message as a command (e.g. `/help`).
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Network addresses allowed to run admin commands.
    #[serde(default)]
    pub admins: Vec<String>,

    /// Send a "processing" notice before every backend request.
    #[serde(default)]
    pub debug: bool,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            command_prefix: default_command_prefix(),
            admins: Vec::new(),
            debug: false,
            log_level: default_log_level(),
        }
    }
}

fn default_bot_name() -> String {
    "OllamaBot".to_string()
}

fn default_command_prefix() -> String {
    "/".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Inference backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OllamaConfig {
    /// Base URL of the backend, without the `/api/...` path.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout for generate/chat calls, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for the startup model probe, in seconds.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl OllamaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_timeout_secs() -> u64 {
    900
}

fn default_probe_timeout_secs() -> u64 {
    5
}

/// Dispatch queue configuration. Fixed at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Maximum number of requests waiting behind the one being executed.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

fn default_capacity() -> usize {
    10
}

/// Conversation configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// System prompt prepended to every chat request. Not stored in history.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Persist conversation history across restarts. Chat-mode flags are
    /// always persisted.
    #[serde(default)]
    pub persist_history: bool,
}

impl ChatConfig {
    /// The system prompt, ignoring a configured-but-blank value.
    pub fn effective_system_prompt(&self) -> Option<&str> {
        self.system_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("lxbot").join("lxbot.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("lxbot.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}
