// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message routing and the agent loop for lxbot.
//!
//! The [`AgentLoop`] is the central coordinator that:
//! - Receives messages from a channel adapter
//! - Routes them to commands, chat turns or one-shot requests
//! - Feeds backend work through the dispatch queue
//! - Delivers replies in order through the outbox
//! - Handles graceful shutdown

pub mod commands;
pub mod outbox;
pub mod replies;
pub mod router;
pub mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use lxbot_config::LxbotConfig;
use lxbot_conversation::{ConversationSettings, ConversationStore};
use lxbot_core::{Backend, ChannelAdapter, InboundMessage, KeyValueStore, LxbotError};
use lxbot_dispatch::{DispatchQueue, QueueSettings};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use commands::{Command, CommandContext, CommandRegistry};
pub use outbox::Outbox;
pub use router::{MessageRouter, RouterCore, RouterSettings};

/// Pause after a receive error before polling the channel again.
const RECEIVE_BACKOFF: Duration = Duration::from_secs(1);

/// How long shutdown waits for queued replies to go out.
const OUTBOX_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// The main loop that connects the channel, the router and the dispatch queue.
pub struct AgentLoop {
    channel: Arc<dyn ChannelAdapter>,
    router: MessageRouter,
    queue: Arc<DispatchQueue>,
    conversations: Arc<ConversationStore>,
    outbox_task: JoinHandle<()>,
}

impl AgentLoop {
    /// Connects the channel and wires up the full stack.
    ///
    /// Loads conversation state from `storage` and starts the dispatch worker,
    /// so it must be called from within a tokio runtime.
    pub async fn new(
        mut channel: Box<dyn ChannelAdapter>,
        backend: Arc<dyn Backend>,
        storage: Arc<dyn KeyValueStore>,
        config: &LxbotConfig,
    ) -> Result<Self, LxbotError> {
        channel.connect().await?;
        let channel: Arc<dyn ChannelAdapter> = Arc::from(channel);

        let conversations = Arc::new(ConversationStore::open(
            storage,
            ConversationSettings::from(&config.chat),
        )?);
        let queue = Arc::new(DispatchQueue::start(
            Arc::clone(&backend),
            QueueSettings::new(config.queue.capacity, config.ollama.timeout()),
        )?);
        let (outbox, outbox_task) = Outbox::spawn(Arc::clone(&channel));

        let core = RouterCore::new(
            RouterSettings::from_config(config),
            Arc::clone(&conversations),
            Arc::clone(&queue),
            backend,
            outbox,
        );

        info!(
            bot_name = config.bot.name.as_str(),
            channel = channel.name(),
            model = config.ollama.model.as_str(),
            "agent loop initialized"
        );

        Ok(Self {
            channel,
            router: MessageRouter::new(core),
            queue,
            conversations,
            outbox_task,
        })
    }

    /// The conversation store shared with the router.
    pub fn conversations(&self) -> Arc<ConversationStore> {
        Arc::clone(&self.conversations)
    }

    /// Mutable access to the router, e.g. to register extra commands.
    pub fn router_mut(&mut self) -> &mut MessageRouter {
        &mut self.router
    }

    /// Runs until the cancellation token fires or the channel closes.
    ///
    /// On exit the dispatch queue is shut down (waiting requests complete
    /// with a failure), pending replies are flushed, and the channel is shut
    /// down.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), LxbotError> {
        info!("agent loop running");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping agent loop");
                    break;
                }
                msg = self.channel.receive() => match msg {
                    Ok(inbound) => self.dispatch(inbound),
                    Err(LxbotError::ChannelClosed) => {
                        info!("channel closed, stopping agent loop");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "channel receive error");
                        tokio::time::sleep(RECEIVE_BACKOFF).await;
                    }
                },
            }
        }

        self.queue.shutdown().await;

        // The outbox task ends once every sender is gone; the router holds
        // the last one now that the queue has released its completions.
        let Self {
            channel,
            router,
            outbox_task,
            ..
        } = self;
        drop(router);
        match tokio::time::timeout(OUTBOX_DRAIN_TIMEOUT, outbox_task).await {
            Ok(Ok(())) => debug!("outbox flushed"),
            Ok(Err(e)) => error!(error = %e, "outbox task failed"),
            Err(_) => warn!("timed out flushing outbox; some replies were not sent"),
        }

        channel.shutdown().await?;
        info!("agent loop stopped");
        Ok(())
    }

    fn dispatch(&self, inbound: InboundMessage) {
        debug!(
            user_id = %inbound.sender_id,
            bytes = inbound.content.len(),
            "inbound message"
        );
        self.router.handle(inbound);
    }
}
