// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered reply delivery.
//!
//! Completion callbacks run on the dispatch worker and must not await
//! network I/O, so replies are pushed onto an unbounded channel and a
//! dedicated task sends them in order.

use std::sync::Arc;

use lxbot_core::{ChannelAdapter, OutboundMessage, UserId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Cloneable, non-blocking handle for queueing replies.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl Outbox {
    /// Spawns the delivery task for `channel`.
    ///
    /// The task exits once every `Outbox` clone has been dropped and the
    /// remaining replies have been sent.
    pub fn spawn(channel: Arc<dyn ChannelAdapter>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<OutboundMessage>();
        let handle = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let recipient = msg.recipient_id.clone();
                if let Err(e) = channel.send(msg).await {
                    warn!(user_id = %recipient, error = %e, "failed to deliver reply");
                }
            }
            debug!("outbox drained");
        });
        (Self { tx }, handle)
    }

    /// Queues `content` for `recipient`. Never blocks.
    pub fn reply(&self, recipient: &UserId, content: impl Into<String>) {
        let msg = OutboundMessage::new(recipient.clone(), content);
        if self.tx.send(msg).is_err() {
            warn!(user_id = %recipient, "outbox closed; reply dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lxbot_test_utils::MockChannel;

    #[tokio::test]
    async fn replies_are_delivered_in_order() {
        let channel = Arc::new(MockChannel::new());
        let (outbox, task) = Outbox::spawn(channel.clone());
        let user = UserId::from("a1");
        for i in 0..5 {
            outbox.reply(&user, format!("reply {i}"));
        }
        drop(outbox);
        task.await.unwrap();

        let sent: Vec<String> = channel
            .sent_messages()
            .await
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(sent, vec!["reply 0", "reply 1", "reply 2", "reply 3", "reply 4"]);
    }
}
