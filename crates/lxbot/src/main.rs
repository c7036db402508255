// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! lxbot - An Ollama chat bot for the LXMF messaging network.
//!
//! This is the binary entry point for lxbot.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod doctor;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lxbot_config::{LxbotConfig, Overrides};
use lxbot_core::LxbotError;

/// lxbot - An Ollama chat bot for the LXMF messaging network.
#[derive(Parser, Debug)]
#[command(name = "lxbot", version, about, long_about = None)]
struct Cli {
    /// Config file merged over the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Display name of the bot.
    #[arg(long, global = true)]
    name: Option<String>,

    /// Ollama server URL, e.g. http://localhost:11434.
    #[arg(long = "api-url", global = true, value_name = "URL")]
    api_url: Option<String>,

    /// Model used for every request.
    #[arg(long, global = true)]
    model: Option<String>,

    /// Comma-separated admin addresses.
    #[arg(long, global = true, value_name = "LIST")]
    admins: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            config_path: self.config.clone(),
            name: self.name.clone(),
            base_url: self.api_url.clone(),
            model: self.model.clone(),
            admins: self.admins.clone(),
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Chat with the bot from the terminal (default).
    Shell,
    /// Check configuration, storage and Ollama connectivity.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup
    let config = match lxbot_config::load_and_validate_with(&cli.overrides()) {
        Ok(config) => config,
        Err(errors) => {
            lxbot_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.bot.log_level);

    let result = match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => shell::run_shell(config).await,
        Commands::Doctor { plain } => doctor::run_doctor(&config, plain).await,
        Commands::Config => print_config(&config),
    };

    if let Err(e) = result {
        eprintln!("lxbot: {e}");
        std::process::exit(1);
    }
}

fn print_config(config: &LxbotConfig) -> Result<(), LxbotError> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| LxbotError::Internal(format!("failed to render config: {e}")))?;
    print!("{rendered}");
    Ok(())
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` wins when set. Logs go to stderr so the shell's stdout stays
/// readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lxbot={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
