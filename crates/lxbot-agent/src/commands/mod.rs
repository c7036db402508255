// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command trait and registry.
//!
//! A message that starts with the configured prefix is split into a command
//! name and its arguments and handed to the [`Command`] registered under that
//! name. Commands answer through [`CommandContext::reply`]; anything slow
//! (backend requests) goes through the dispatch queue via the router core.

pub mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

use lxbot_core::{LxbotError, UserId};

use crate::router::RouterCore;

/// Everything a command invocation can see.
pub struct CommandContext<'a> {
    /// Address of the user who sent the command.
    pub sender: &'a UserId,
    /// Text after the command name, trimmed.
    pub args: &'a str,
    pub core: &'a RouterCore,
    pub commands: &'a CommandRegistry,
}

impl CommandContext<'_> {
    /// Queues a reply to the sender.
    pub fn reply(&self, text: impl Into<String>) {
        self.core.reply(self.sender, text);
    }
}

/// A chat command such as `/help`.
pub trait Command: Send + Sync {
    /// Name the command is invoked by, without the prefix.
    fn name(&self) -> &str;

    /// One-line description shown by `/help`.
    fn description(&self) -> &str;

    /// Whether only configured admins may run the command.
    fn admin_only(&self) -> bool {
        false
    }

    /// Runs the command. Must not block.
    fn execute(&self, ctx: &CommandContext<'_>) -> Result<(), LxbotError>;
}

/// Registry of available commands, indexed by lowercase name.
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Creates an empty command registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Creates a registry holding the built-in commands.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_builtins(&mut registry);
        registry
    }

    /// Registers a command, replacing any previous one with the same name.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        self.commands
            .insert(command.name().to_ascii_lowercase(), command);
    }

    /// Looks up a command by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Returns (name, description) pairs for all registered commands.
    pub fn list(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .commands
            .values()
            .map(|c| (c.name(), c.description()))
            .collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits the text after the prefix into a command name and trimmed arguments.
pub fn split_invocation(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (text, ""),
    }
}
