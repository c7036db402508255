// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lxbot shell` command implementation.
//!
//! Runs the full bot (conversation store, dispatch queue, router, Ollama
//! backend and SQLite storage) with the terminal standing in for the
//! messaging network. Every line typed is an inbound message from the user
//! `local`; replies are printed as they arrive.

use std::sync::Arc;

use async_trait::async_trait;
use colored::Colorize;
use lxbot_agent::{AgentLoop, shutdown};
use lxbot_config::LxbotConfig;
use lxbot_core::{
    AdapterType, ChannelAdapter, HealthStatus, InboundMessage, LxbotError, OutboundMessage,
    PluginAdapter, UserId,
};
use lxbot_ollama::OllamaBackend;
use lxbot_storage::SqliteStore;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, info, warn};

/// Sender id of everything typed into the shell.
pub const LOCAL_USER: &str = "local";

/// Lines buffered between the readline thread and the agent loop.
const LINE_BUFFER: usize = 16;

/// Runs the `lxbot shell` interactive REPL.
pub async fn run_shell(config: LxbotConfig) -> Result<(), LxbotError> {
    let storage = Arc::new(SqliteStore::open(&config.storage)?);
    let backend = OllamaBackend::new(&config.ollama)?;
    backend.probe_and_log().await;

    let channel = ShellChannel::new(&config.bot.name);
    let agent = AgentLoop::new(
        Box::new(channel),
        Arc::new(backend),
        storage.clone(),
        &config,
    )
    .await?;

    println!("{}", format!("{} shell", config.bot.name).bold().green());
    println!(
        "Model {} at {}. Type {} for commands, {} to exit.\n",
        config.ollama.model.cyan(),
        config.ollama.base_url,
        format!("{}help", config.bot.command_prefix).yellow(),
        "/quit".yellow()
    );

    let cancel = shutdown::install_signal_handler();
    let result = agent.run(cancel.clone()).await;
    cancel.cancel();

    storage.shutdown().await?;
    println!("{}", "goodbye".dimmed());
    result
}

/// A [`ChannelAdapter`] over the terminal.
///
/// `connect` starts a readline thread that forwards each line; the channel
/// closes on `/quit`, `/exit`, Ctrl+C or Ctrl+D.
pub struct ShellChannel {
    bot_name: String,
    sender: UserId,
    lines: Mutex<Option<mpsc::Receiver<String>>>,
}

impl ShellChannel {
    pub fn new(bot_name: &str) -> Self {
        Self {
            bot_name: bot_name.to_string(),
            sender: UserId::from(LOCAL_USER),
            lines: Mutex::new(None),
        }
    }
}

#[async_trait]
impl PluginAdapter for ShellChannel {
    fn name(&self) -> &str {
        "shell"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, LxbotError> {
        match self.lines.lock().await.as_ref() {
            Some(rx) if !rx.is_closed() => Ok(HealthStatus::Healthy),
            Some(_) => Ok(HealthStatus::Unhealthy("input closed".into())),
            None => Ok(HealthStatus::Degraded("not connected".into())),
        }
    }

    async fn shutdown(&self) -> Result<(), LxbotError> {
        if let Some(rx) = self.lines.lock().await.as_mut() {
            rx.close();
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for ShellChannel {
    async fn connect(&mut self) -> Result<(), LxbotError> {
        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        let (ready_tx, ready_rx) = oneshot::channel();
        let prompt = format!("{}> ", LOCAL_USER.green());

        // The editor owns the terminal, so it is created on the thread that uses it.
        std::thread::Builder::new()
            .name("lxbot-readline".into())
            .spawn(move || match DefaultEditor::new() {
                Ok(mut editor) => {
                    let _ = ready_tx.send(Ok(()));
                    read_lines(&mut editor, &prompt, &tx);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                }
            })
            .map_err(|e| LxbotError::Internal(format!("failed to start readline thread: {e}")))?;

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(LxbotError::Internal(format!(
                    "failed to initialize readline: {e}"
                )));
            }
            Err(_) => {
                return Err(LxbotError::Internal("readline thread exited early".into()));
            }
        }

        *self.lines.get_mut() = Some(rx);
        info!("shell channel connected");
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<(), LxbotError> {
        println!("{} {}", format!("{}>", self.bot_name).cyan().bold(), msg.content);
        Ok(())
    }

    async fn receive(&self) -> Result<InboundMessage, LxbotError> {
        let mut lines = self.lines.lock().await;
        let rx = lines.as_mut().ok_or_else(|| LxbotError::Channel {
            message: "shell channel is not connected".into(),
            source: None,
        })?;
        match rx.recv().await {
            Some(line) => Ok(InboundMessage::new(self.sender.clone(), line)),
            None => Err(LxbotError::ChannelClosed),
        }
    }
}

/// Reads lines until the user quits or the agent stops listening.
fn read_lines(editor: &mut DefaultEditor, prompt: &str, tx: &mpsc::Sender<String>) {
    loop {
        match editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if is_quit(trimmed) {
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(trimmed);
                if tx.blocking_send(line).is_err() {
                    debug!("agent loop stopped listening");
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                warn!(error = %e, "readline failed");
                break;
            }
        }
    }
}

fn is_quit(line: &str) -> bool {
    matches!(line, "/quit" | "/exit")
}
