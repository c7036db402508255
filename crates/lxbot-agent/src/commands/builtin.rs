// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in commands, always available.

use std::fmt::Write as _;
use std::sync::Arc;

use lxbot_conversation::ResetOutcome;
use lxbot_core::LxbotError;

use crate::commands::{Command, CommandContext, CommandRegistry};
use crate::replies;

/// Registers all built-in commands into the given registry.
pub fn register_builtins(registry: &mut CommandRegistry) {
    registry.register(Arc::new(HelpCommand));
    registry.register(Arc::new(AboutCommand));
    registry.register(Arc::new(HelloCommand));
    registry.register(Arc::new(AskCommand));
    registry.register(Arc::new(ChatCommand));
    registry.register(Arc::new(ResetCommand));
    registry.register(Arc::new(DebugCommand));
}

pub struct HelpCommand;

impl Command for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }

    fn description(&self) -> &str {
        "List available commands"
    }

    fn execute(&self, ctx: &CommandContext<'_>) -> Result<(), LxbotError> {
        let prefix = &ctx.core.settings().command_prefix;
        let mut text = String::from("Available commands:");
        for (name, description) in ctx.commands.list() {
            let _ = write!(text, "\n{prefix}{name} - {description}");
        }
        let _ = write!(
            text,
            "\n\nSend a message starting with \"chat\" to start a conversation."
        );
        ctx.reply(text);
        Ok(())
    }
}

pub struct AboutCommand;

impl Command for AboutCommand {
    fn name(&self) -> &str {
        "about"
    }

    fn description(&self) -> &str {
        "Show bot and model information"
    }

    fn execute(&self, ctx: &CommandContext<'_>) -> Result<(), LxbotError> {
        let settings = ctx.core.settings();
        let text = format!(
            "{name} v{version}\n\
             Model: {model}\n\
             Ollama API: {base_url}\n\
             Admins: {admins}\n\
             Queue capacity: {capacity}\n\
             Chat history persistence: {persist}",
            name = settings.bot_name,
            version = env!("CARGO_PKG_VERSION"),
            model = settings.model,
            base_url = settings.base_url,
            admins = settings.admins.len(),
            capacity = settings.queue_capacity,
            persist = if settings.persist_history {
                "enabled"
            } else {
                "disabled"
            },
        );
        ctx.reply(text);
        Ok(())
    }
}

pub struct HelloCommand;

impl Command for HelloCommand {
    fn name(&self) -> &str {
        "hello"
    }

    fn description(&self) -> &str {
        "Say hello"
    }

    fn execute(&self, ctx: &CommandContext<'_>) -> Result<(), LxbotError> {
        ctx.reply(format!("Hello {}!", ctx.sender));
        Ok(())
    }
}

/// One-shot question; never touches conversation history.
pub struct AskCommand;

impl Command for AskCommand {
    fn name(&self) -> &str {
        "ask"
    }

    fn description(&self) -> &str {
        "Ask a single question without conversation context"
    }

    fn execute(&self, ctx: &CommandContext<'_>) -> Result<(), LxbotError> {
        if ctx.args.is_empty() {
            ctx.reply(replies::ASK_USAGE);
            return Ok(());
        }
        ctx.core.ask(ctx.sender, ctx.args);
        Ok(())
    }
}

pub struct ChatCommand;

impl Command for ChatCommand {
    fn name(&self) -> &str {
        "chat"
    }

    fn description(&self) -> &str {
        "Start or continue a conversation"
    }

    fn execute(&self, ctx: &CommandContext<'_>) -> Result<(), LxbotError> {
        ctx.core.chat(ctx.sender, ctx.args);
        Ok(())
    }
}

pub struct ResetCommand;

impl Command for ResetCommand {
    fn name(&self) -> &str {
        "reset"
    }

    fn description(&self) -> &str {
        "Forget the current conversation"
    }

    fn execute(&self, ctx: &CommandContext<'_>) -> Result<(), LxbotError> {
        match ctx.core.conversations().reset(ctx.sender)? {
            ResetOutcome::Reset => ctx.reply(replies::RESET_DONE),
            ResetOutcome::NothingToReset => ctx.reply(replies::NOTHING_TO_RESET),
        }
        Ok(())
    }
}

/// Toggles the "Processing your request..." notices.
pub struct DebugCommand;

impl Command for DebugCommand {
    fn name(&self) -> &str {
        "debug"
    }

    fn description(&self) -> &str {
        "Toggle debug mode"
    }

    fn admin_only(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &CommandContext<'_>) -> Result<(), LxbotError> {
        let enabled = ctx.core.toggle_debug();
        ctx.reply(replies::debug_mode(enabled));
        Ok(())
    }
}
