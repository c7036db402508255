// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the complete agent stack (conversation store,
//! dispatch queue, router, outbox and agent loop) over a [`MockChannel`],
//! a [`MockBackend`] and an in-memory key-value store, and runs the agent
//! loop on a background task. Tests drive it by injecting inbound messages
//! and waiting for replies.

use std::sync::Arc;
use std::time::Duration;

use lxbot_agent::AgentLoop;
use lxbot_config::LxbotConfig;
use lxbot_conversation::ConversationStore;
use lxbot_core::{InboundMessage, LxbotError, OutboundMessage, UserId};
use lxbot_storage::MemoryStore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::mock_backend::MockBackend;
use crate::mock_channel::MockChannel;

/// How long [`TestHarness::wait_for_replies`] waits before failing.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: LxbotConfig,
    backend: Option<MockBackend>,
    storage: Option<Arc<MemoryStore>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = LxbotConfig::default();
        config.ollama.model = "mock-model".to_string();
        Self {
            config,
            backend: None,
            storage: None,
        }
    }

    /// Use a pre-scripted (or gated) backend.
    pub fn with_backend(mut self, backend: MockBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Start from existing storage, e.g. to simulate a restart.
    pub fn with_storage(mut self, storage: Arc<MemoryStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.config.chat.system_prompt = Some(prompt.to_string());
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.config.queue.capacity = capacity;
        self
    }

    pub fn with_admins(mut self, admins: &[&str]) -> Self {
        self.config.bot.admins = admins.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.config.bot.debug = debug;
        self
    }

    pub fn with_persist_history(mut self, persist: bool) -> Self {
        self.config.chat.persist_history = persist;
        self
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: LxbotConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the stack and start the agent loop.
    pub async fn build(self) -> Result<TestHarness, LxbotError> {
        let channel = MockChannel::new();
        let backend = Arc::new(self.backend.unwrap_or_default());
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));

        let agent = AgentLoop::new(
            Box::new(channel.clone()),
            backend.clone(),
            storage.clone(),
            &self.config,
        )
        .await?;
        let conversations = agent.conversations();

        let cancel = CancellationToken::new();
        let task = tokio::spawn(agent.run(cancel.clone()));

        Ok(TestHarness {
            channel,
            backend,
            storage,
            conversations,
            config: self.config,
            cancel,
            task: Some(task),
        })
    }
}

/// A running agent stack over mock adapters.
pub struct TestHarness {
    channel: MockChannel,
    backend: Arc<MockBackend>,
    storage: Arc<MemoryStore>,
    conversations: Arc<ConversationStore>,
    config: LxbotConfig,
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<(), LxbotError>>>,
}

impl TestHarness {
    /// Create a builder for configuring the test environment.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Injects a text message from `sender`.
    pub async fn send(&self, sender: &str, text: &str) {
        self.channel.inject_text(sender, text).await;
    }

    /// Injects a message with raw payload bytes.
    pub async fn send_bytes(&self, sender: &str, bytes: &[u8]) {
        self.channel
            .inject_message(InboundMessage::new(sender, bytes))
            .await;
    }

    /// Waits until at least `count` replies have been sent and returns all of them.
    pub async fn wait_for_replies(&self, count: usize) -> Result<Vec<OutboundMessage>, LxbotError> {
        self.channel.wait_for_sent(count, REPLY_TIMEOUT).await
    }

    /// Reply texts sent to `user` so far.
    pub async fn replies_to(&self, user: &str) -> Vec<String> {
        self.channel.sent_to(&UserId::from(user)).await
    }

    pub fn channel(&self) -> &MockChannel {
        &self.channel
    }

    pub fn backend(&self) -> &Arc<MockBackend> {
        &self.backend
    }

    pub fn storage(&self) -> &Arc<MemoryStore> {
        &self.storage
    }

    pub fn conversations(&self) -> &Arc<ConversationStore> {
        &self.conversations
    }

    pub fn config(&self) -> &LxbotConfig {
        &self.config
    }

    /// Stops the agent loop and waits for it to finish.
    pub async fn shutdown(mut self) -> Result<(), LxbotError> {
        self.cancel.cancel();
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| LxbotError::Internal(format!("agent task failed: {e}")))?,
            None => Ok(()),
        }
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
