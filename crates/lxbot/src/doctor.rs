// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lxbot doctor` command implementation.
//!
//! Checks that the configuration is usable, the conversation database opens,
//! and the Ollama server answers with the configured model installed.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use colored::Colorize;
use lxbot_config::LxbotConfig;
use lxbot_core::{HealthStatus, LxbotError, PluginAdapter};
use lxbot_ollama::{OllamaBackend, ProbeReport};
use lxbot_storage::SqliteStore;

/// Status of a diagnostic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(
        name: &'static str,
        status: CheckStatus,
        message: impl Into<String>,
        start: Instant,
    ) -> Self {
        Self {
            name,
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Runs the `lxbot doctor` command.
///
/// Only reached with a configuration that already passed validation. With
/// `plain`, or when stdout is not a terminal, output is uncolored.
pub async fn run_doctor(config: &LxbotConfig, plain: bool) -> Result<(), LxbotError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let results = run_checks(config).await;

    println!();
    println!("  lxbot doctor");
    println!("  {}", "-".repeat(50));
    for result in &results {
        println!("{}", render_line(result, use_color));
    }
    println!();

    let issues = results
        .iter()
        .filter(|r| r.status != CheckStatus::Pass)
        .count();
    match issues {
        0 => println!("  All checks passed."),
        1 => println!("  1 issue found."),
        n => println!("  {n} issues found."),
    }
    println!();

    Ok(())
}

/// Runs every check in display order.
pub async fn run_checks(config: &LxbotConfig) -> Vec<CheckResult> {
    vec![
        check_config(config),
        check_database(&config.storage.database_path, config).await,
        check_ollama(config).await,
    ]
}

fn render_line(result: &CheckResult, use_color: bool) -> String {
    let ms = result.duration.as_millis();
    if !use_color {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        return format!("    {tag} {:<12} {} ({ms}ms)", result.name, result.message);
    }

    let (symbol, message) = match result.status {
        CheckStatus::Pass => ("✓".green(), result.message.normal()),
        CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
        CheckStatus::Fail => ("✗".red(), result.message.red()),
    };
    format!("    {symbol} {:<12} {message} ({ms}ms)", result.name)
}

fn check_config(config: &LxbotConfig) -> CheckResult {
    let start = Instant::now();
    let admins = match config.bot.admins.len() {
        0 => "no admins, everyone may use admin commands".to_string(),
        n => format!("{n} admin(s)"),
    };
    let status = if config.bot.admins.is_empty() {
        CheckStatus::Warn
    } else {
        CheckStatus::Pass
    };
    CheckResult::new("Config", status, format!("valid, {admins}"), start)
}

async fn check_database(db_path: &str, config: &LxbotConfig) -> CheckResult {
    let start = Instant::now();
    let done = |status, message: String| CheckResult::new("Database", status, message, start);

    if !Path::new(db_path).exists() {
        return done(
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
        );
    }

    let store = match SqliteStore::open(&config.storage) {
        Ok(store) => store,
        Err(e) => return done(CheckStatus::Fail, format!("open failed: {e}")),
    };
    match store.health_check().await {
        Ok(HealthStatus::Healthy) => {
            let keys = store.keys().map(|k| k.len()).unwrap_or(0);
            done(CheckStatus::Pass, format!("{db_path} ({keys} keys)"))
        }
        Ok(HealthStatus::Degraded(reason)) => done(CheckStatus::Warn, reason),
        Ok(HealthStatus::Unhealthy(reason)) => done(CheckStatus::Fail, reason),
        Err(e) => done(CheckStatus::Fail, format!("query failed: {e}")),
    }
}

async fn check_ollama(config: &LxbotConfig) -> CheckResult {
    let start = Instant::now();
    let backend = match OllamaBackend::new(&config.ollama) {
        Ok(backend) => backend,
        Err(e) => {
            return CheckResult::new(
                "Ollama",
                CheckStatus::Fail,
                format!("client error: {e}"),
                start,
            );
        }
    };

    match backend.probe().await {
        ProbeReport::Ready { model_count } => CheckResult::new(
            "Ollama",
            CheckStatus::Pass,
            format!("{} ready ({model_count} models installed)", backend.model()),
            start,
        ),
        ProbeReport::ModelMissing { available } => CheckResult::new(
            "Ollama",
            CheckStatus::Warn,
            format!(
                "model {} not installed (available: {}); run `ollama pull {}`",
                backend.model(),
                available.join(", "),
                backend.model()
            ),
            start,
        ),
        ProbeReport::NoModels => CheckResult::new(
            "Ollama",
            CheckStatus::Warn,
            format!("no models installed at {}", backend.base_url()),
            start,
        ),
        ProbeReport::Unreachable(e) => CheckResult::new(
            "Ollama",
            CheckStatus::Fail,
            format!("{} unreachable: {e}", backend.base_url()),
            start,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lxbot_core::KeyValueStore;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, db_path: &Path) -> LxbotConfig {
        let mut config = LxbotConfig::default();
        config.ollama.base_url = server.uri();
        config.ollama.model = "llama3.2:latest".into();
        config.storage.database_path = db_path.to_string_lossy().into_owned();
        config
    }

    async fn serve_tags(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn missing_database_warns() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("absent.db");
        let config = LxbotConfig::default();
        let result = check_database(db.to_str().unwrap(), &config).await;
        assert_eq!(result.status, CheckStatus::Warn);
        assert!(result.message.contains("will be created"));
        assert!(!db.exists());
    }

    #[tokio::test]
    async fn existing_database_passes() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("lxbot.db");
        let mut config = LxbotConfig::default();
        config.storage.database_path = db.to_string_lossy().into_owned();
        {
            let store = SqliteStore::open(&config.storage).unwrap();
            store.set("users", &json!({})).unwrap();
        }

        let result = check_database(&config.storage.database_path, &config).await;
        assert_eq!(result.status, CheckStatus::Pass, "{}", result.message);
        assert!(result.message.contains("1 keys"));
    }

    #[tokio::test]
    async fn installed_model_passes_and_missing_model_warns() {
        let server = MockServer::start().await;
        serve_tags(
            &server,
            json!({"models": [{"name": "llama3.2:latest"}, {"name": "mistral:7b"}]}),
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(&server, &dir.path().join("x.db"));

        let ready = check_ollama(&config).await;
        assert_eq!(ready.status, CheckStatus::Pass, "{}", ready.message);
        assert!(ready.message.contains("2 models"));

        config.ollama.model = "phi3".into();
        let missing = check_ollama(&config).await;
        assert_eq!(missing.status, CheckStatus::Warn);
        assert!(missing.message.contains("ollama pull phi3"));
    }

    #[tokio::test]
    async fn empty_model_list_warns() {
        let server = MockServer::start().await;
        serve_tags(&server, json!({"models": []})).await;
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&server, &dir.path().join("x.db"));

        let result = check_ollama(&config).await;
        assert_eq!(result.status, CheckStatus::Warn);
        assert!(result.message.contains("no models"));
    }

    #[tokio::test]
    async fn server_error_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&server, &dir.path().join("x.db"));

        let result = check_ollama(&config).await;
        assert_eq!(result.status, CheckStatus::Fail);
        assert!(result.message.contains("unreachable"));
    }

    #[test]
    fn config_without_admins_warns() {
        let mut config = LxbotConfig::default();
        assert_eq!(check_config(&config).status, CheckStatus::Warn);
        config.bot.admins = vec!["a1".into()];
        assert_eq!(check_config(&config).status, CheckStatus::Pass);
    }

    #[test]
    fn plain_lines_carry_status_tags() {
        let result = CheckResult {
            name: "Ollama",
            status: CheckStatus::Fail,
            message: "down".into(),
            duration: Duration::from_millis(3),
        };
        assert_eq!(
            render_line(&result, false),
            "    [FAIL] Ollama       down (3ms)"
        );
    }
}
