// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message routing.
//!
//! Every inbound message is decoded, trimmed and then either handed to a
//! command, turned into a chat turn (users in chat mode), or sent as a
//! one-shot `generate` request. Backend work always goes through the
//! dispatch queue; `handle` itself never waits on I/O.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lxbot_config::LxbotConfig;
use lxbot_conversation::ConversationStore;
use lxbot_core::{Backend, Endpoint, InboundMessage, LxbotError, UserId};
use lxbot_dispatch::DispatchQueue;
use tracing::{debug, error, info, warn};

use crate::commands::{Command, CommandContext, CommandRegistry, split_invocation};
use crate::outbox::Outbox;
use crate::replies;

/// Keyword that starts a conversation without the command prefix.
const CHAT_KEYWORD: &str = "chat";

/// Router parameters fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterSettings {
    pub bot_name: String,
    pub command_prefix: String,
    pub admins: BTreeSet<String>,
    /// Shown in connectivity error replies.
    pub base_url: String,
    pub model: String,
    pub queue_capacity: usize,
    pub persist_history: bool,
    /// Initial debug mode.
    pub debug: bool,
}

impl RouterSettings {
    pub fn from_config(config: &LxbotConfig) -> Self {
        Self {
            bot_name: config.bot.name.clone(),
            command_prefix: config.bot.command_prefix.clone(),
            admins: config.bot.admins.iter().cloned().collect(),
            base_url: config.ollama.base_url.clone(),
            model: config.ollama.model.clone(),
            queue_capacity: config.queue.capacity,
            persist_history: config.chat.persist_history,
            debug: config.bot.debug,
        }
    }
}

/// Shared state and actions available to the router and to commands.
pub struct RouterCore {
    settings: RouterSettings,
    conversations: Arc<ConversationStore>,
    queue: Arc<DispatchQueue>,
    backend: Arc<dyn Backend>,
    outbox: Outbox,
    debug: AtomicBool,
}

impl RouterCore {
    pub fn new(
        settings: RouterSettings,
        conversations: Arc<ConversationStore>,
        queue: Arc<DispatchQueue>,
        backend: Arc<dyn Backend>,
        outbox: Outbox,
    ) -> Self {
        let debug = AtomicBool::new(settings.debug);
        Self {
            settings,
            conversations,
            queue,
            backend,
            outbox,
            debug,
        }
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    pub fn conversations(&self) -> &Arc<ConversationStore> {
        &self.conversations
    }

    /// Queues a reply to `user`.
    pub fn reply(&self, user: &UserId, text: impl Into<String>) {
        self.outbox.reply(user, text);
    }

    /// True for configured admins, and for everyone when no admins are configured.
    pub fn is_admin(&self, user: &UserId) -> bool {
        self.settings.admins.is_empty() || self.settings.admins.contains(user.as_str())
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Flips debug mode and returns the new value.
    pub fn toggle_debug(&self) -> bool {
        let enabled = !self.debug.fetch_xor(true, Ordering::Relaxed);
        info!(enabled, "debug mode toggled");
        enabled
    }

    /// Submits a one-shot `generate` request whose result is replied to `user`.
    ///
    /// Conversation state is not touched.
    pub fn ask(&self, user: &UserId, prompt: &str) {
        let payload = self.backend.generate_payload(prompt);
        self.announce(user);

        let outbox = self.outbox.clone();
        let base_url = self.settings.base_url.clone();
        let recipient = user.clone();
        let submitted = self.queue.submit(Endpoint::Generate, payload, move |result| {
            outbox.reply(&recipient, replies::backend_reply(&result, &base_url));
        });

        match submitted {
            Ok(()) => debug!(user_id = %user, "generate request queued"),
            Err(e) => self.reject(user, &e),
        }
    }

    /// Records a chat turn and submits the whole conversation.
    ///
    /// The completion records the outcome in the conversation store before
    /// the reply is queued.
    pub fn chat(&self, user: &UserId, content: &str) {
        let messages = match self.conversations.begin_chat(user, content) {
            Ok(messages) => messages,
            Err(LxbotError::EmptyInput) => {
                self.reply(user, replies::EMPTY_CHAT);
                return;
            }
            Err(LxbotError::AlreadyWaiting { .. }) => {
                debug!(user_id = %user, "request already in flight");
                self.reply(user, replies::STILL_PROCESSING);
                return;
            }
            Err(e) => {
                error!(user_id = %user, error = %e, "failed to start chat turn");
                self.reply(user, format!("Error: {e}"));
                return;
            }
        };

        let payload = self.backend.chat_payload(&messages);
        self.announce(user);

        let conversations = Arc::clone(&self.conversations);
        let outbox = self.outbox.clone();
        let base_url = self.settings.base_url.clone();
        let recipient = user.clone();
        let submitted = self.queue.submit(Endpoint::Chat, payload, move |result| {
            if let Err(e) = conversations.complete_chat(&recipient, &result) {
                error!(user_id = %recipient, error = %e, "failed to record chat result");
            }
            outbox.reply(&recipient, replies::backend_reply(&result, &base_url));
        });

        match submitted {
            Ok(()) => debug!(user_id = %user, turns = messages.len(), "chat request queued"),
            Err(e) => {
                if let Err(abort_err) = self.conversations.abort_chat(user) {
                    error!(user_id = %user, error = %abort_err, "failed to roll back chat turn");
                }
                self.reject(user, &e);
            }
        }
    }

    fn announce(&self, user: &UserId) {
        if self.debug_enabled() {
            self.reply(user, replies::PROCESSING);
        }
    }

    fn reject(&self, user: &UserId, e: &LxbotError) {
        match e {
            LxbotError::QueueFull { .. } => self.reply(user, replies::QUEUE_FULL),
            other => {
                error!(user_id = %user, error = %other, "request not queued");
                self.reply(user, format!("Error: {other}"));
            }
        }
    }
}

/// Routes inbound messages to commands, chat turns or one-shot requests.
pub struct MessageRouter {
    core: RouterCore,
    commands: CommandRegistry,
}

impl MessageRouter {
    /// Creates a router with the built-in commands registered.
    pub fn new(core: RouterCore) -> Self {
        Self {
            core,
            commands: CommandRegistry::with_builtins(),
        }
    }

    /// Adds (or replaces) a command.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.register(command);
    }

    pub fn core(&self) -> &RouterCore {
        &self.core
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Handles one inbound message.
    pub fn handle(&self, msg: InboundMessage) {
        let sender = &msg.sender_id;
        let text = match msg.text() {
            Ok(text) => text.trim(),
            Err(e) => {
                warn!(user_id = %sender, error = %e, "undecodable message");
                self.core.reply(sender, replies::DECODE_ERROR);
                return;
            }
        };
        if text.is_empty() {
            debug!(user_id = %sender, "ignoring empty message");
            return;
        }

        if let Some(invocation) = text.strip_prefix(self.core.settings.command_prefix.as_str()) {
            let (name, args) = split_invocation(invocation);
            self.run_command(sender, name, args);
            return;
        }

        if self.core.conversations.in_chat_mode(sender) {
            self.core.chat(sender, text);
        } else if let Some(rest) = strip_chat_keyword(text) {
            self.run_command(sender, CHAT_KEYWORD, rest);
        } else {
            self.core.ask(sender, text);
        }
    }

    fn run_command(&self, sender: &UserId, name: &str, args: &str) {
        let Some(command) = self.commands.get(name) else {
            debug!(user_id = %sender, command = name, "unknown command");
            self.core.reply(
                sender,
                replies::unknown_command(&self.core.settings.command_prefix, name),
            );
            return;
        };

        if command.admin_only() && !self.core.is_admin(sender) {
            warn!(user_id = %sender, command = name, "admin command refused");
            self.core.reply(sender, replies::ADMIN_ONLY);
            return;
        }

        debug!(user_id = %sender, command = name, "running command");
        let ctx = CommandContext {
            sender,
            args,
            core: &self.core,
            commands: &self.commands,
        };
        if let Err(e) = command.execute(&ctx) {
            error!(user_id = %sender, command = name, error = %e, "command failed");
            self.core.reply(sender, format!("Error: {e}"));
        }
    }
}

/// Returns the rest of `text` when its first word is `chat`, ignoring case.
fn strip_chat_keyword(text: &str) -> Option<&str> {
    let (first, rest) = split_invocation(text);
    first
        .eq_ignore_ascii_case(CHAT_KEYWORD)
        .then_some(rest)
}
