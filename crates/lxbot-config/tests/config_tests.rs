// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the lxbot configuration system.

use lxbot_config::diagnostic::ConfigError;
use lxbot_config::model::LxbotConfig;
use lxbot_config::{load_and_validate_str, load_config_from_path, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_lxbot_config() {
    let toml = r#"
[bot]
name = "Mesh Oracle"
command_prefix = "!"
admins = ["a1b2c3", "d4e5f6"]
debug = true
log_level = "debug"

[ollama]
base_url = "http://gpu-box:11434"
model = "qwen2.5:7b"
timeout_secs = 120
probe_timeout_secs = 2

[queue]
capacity = 4

[chat]
system_prompt = "Answer in one sentence."
persist_history = true

[storage]
database_path = "/tmp/lxbot-test.db"
wal_mode = false
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.bot.name, "Mesh Oracle");
    assert_eq!(config.bot.command_prefix, "!");
    assert_eq!(config.bot.admins, vec!["a1b2c3", "d4e5f6"]);
    assert!(config.bot.debug);
    assert_eq!(config.ollama.base_url, "http://gpu-box:11434");
    assert_eq!(config.ollama.model, "qwen2.5:7b");
    assert_eq!(config.ollama.timeout().as_secs(), 120);
    assert_eq!(config.ollama.probe_timeout().as_secs(), 2);
    assert_eq!(config.queue.capacity, 4);
    assert_eq!(
        config.chat.effective_system_prompt(),
        Some("Answer in one sentence.")
    );
    assert!(config.chat.persist_history);
    assert_eq!(config.storage.database_path, "/tmp/lxbot-test.db");
    assert!(!config.storage.wal_mode);
}

/// Missing sections fall back to the documented defaults.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should deserialize");
    assert_eq!(config.bot.name, "OllamaBot");
    assert_eq!(config.bot.command_prefix, "/");
    assert!(config.bot.admins.is_empty());
    assert!(!config.bot.debug);
    assert_eq!(config.ollama.base_url, "http://localhost:11434");
    assert_eq!(config.ollama.model, "llama3.2:latest");
    assert_eq!(config.ollama.timeout_secs, 900);
    assert_eq!(config.queue.capacity, 10);
    assert!(config.chat.system_prompt.is_none());
    assert!(!config.chat.persist_history);
}

#[test]
fn unknown_top_level_section_is_rejected() {
    let result = load_config_from_str("[telegram]\nbot_token = \"x\"\n");
    assert!(result.is_err(), "unknown section should be rejected");
}

#[test]
fn unknown_key_produces_suggestion() {
    let errors = load_and_validate_str("[queue]\ncapcity = 5\n").expect_err("typo should fail");
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion: Some(s), .. }
                if key == "queue.capcity" && s == "queue.capacity"
        )
    });
    assert!(found, "expected suggestion for capcity, got: {errors:?}");
}

#[test]
fn invalid_type_is_reported() {
    let errors =
        load_and_validate_str("[queue]\ncapacity = \"ten\"\n").expect_err("string capacity");
    let err_str = errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    assert!(
        err_str.starts_with("`queue.capacity` has the wrong type"),
        "error should name the key, got: {err_str}"
    );
}

#[test]
fn validation_rejects_zero_capacity() {
    let errors = load_and_validate_str("[queue]\ncapacity = 0\n").expect_err("zero capacity");
    assert!(errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("queue.capacity"))
    }));
}

#[test]
fn validation_rejects_non_http_url() {
    let errors = load_and_validate_str("[ollama]\nbase_url = \"ftp://host\"\n")
        .expect_err("ftp url should fail");
    assert!(errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("ollama.base_url"))
    }));
}

#[test]
fn blank_system_prompt_is_treated_as_absent() {
    let config = load_and_validate_str("[chat]\nsystem_prompt = \"   \"\n").unwrap();
    assert_eq!(config.chat.effective_system_prompt(), None);
}

#[test]
fn load_from_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "[bot]\nname = \"FileBot\"\n").unwrap();
    let config = load_config_from_path(&path).unwrap();
    assert_eq!(config.bot.name, "FileBot");
}

#[test]
fn missing_config_file_is_skipped() {
    let config = load_config_from_path(std::path::Path::new("/nonexistent/lxbot.toml"))
        .expect("missing file should be silently skipped");
    assert_eq!(config.queue.capacity, 10);
}

#[test]
fn defaults_serialize_to_json() {
    let value = serde_json::to_value(LxbotConfig::default()).unwrap();
    assert_eq!(value["ollama"]["model"], "llama3.2:latest");
    assert_eq!(value["queue"]["capacity"], 10);
    assert_eq!(value["chat"]["persist_history"], false);
}

#[test]
fn config_error_renders_with_miette() {
    use miette::GraphicalReportHandler;

    let error = ConfigError::UnknownKey {
        key: "ollama.modle".to_string(),
        suggestion: Some("ollama.model".to_string()),
        valid_keys: &["base_url", "model", "timeout_secs", "probe_timeout_secs"],
        origin: None,
        span: None,
        src: None,
    };

    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    handler
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("ollama.modle"), "rendered report should mention the key");
    assert!(buf.contains("did you mean `ollama.model`?"), "{buf}");
}
