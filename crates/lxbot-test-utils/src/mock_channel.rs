// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound messages
//! and captured outbound messages for assertion in tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use lxbot_core::{
    AdapterType, ChannelAdapter, HealthStatus, InboundMessage, LxbotError, OutboundMessage,
    PluginAdapter, UserId,
};

/// A mock messaging channel for testing.
///
/// Provides two queues:
/// - **inbound**: Messages injected via `inject_message()` are returned by `receive()`
/// - **sent**: Messages passed to `send()` are captured and retrievable via `sent_messages()`
///
/// Clones share both queues, so a test can keep one handle while the agent
/// loop owns another.
#[derive(Clone)]
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<InboundMessage>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    inbound_ready: Arc<Notify>,
    sent_ready: Arc<Notify>,
    closed: Arc<AtomicBool>,
}

impl MockChannel {
    /// Create a new mock channel with empty queues.
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            inbound_ready: Arc::new(Notify::new()),
            sent_ready: Arc::new(Notify::new()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Inject an inbound message into the receive queue.
    ///
    /// The next call to `receive()` will return this message.
    pub async fn inject_message(&self, msg: InboundMessage) {
        self.inbound.lock().await.push_back(msg);
        self.inbound_ready.notify_one();
    }

    /// Inject a UTF-8 text message from `sender`.
    pub async fn inject_text(&self, sender: &str, text: &str) {
        self.inject_message(InboundMessage::new(sender, text.as_bytes()))
            .await;
    }

    /// Marks the channel closed.
    ///
    /// Messages already queued are still delivered; after that `receive()`
    /// returns [`LxbotError::ChannelClosed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.inbound_ready.notify_one();
    }

    /// Get all messages that were sent through `send()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    /// Texts of the messages sent to `recipient`, oldest first.
    pub async fn sent_to(&self, recipient: &UserId) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| &m.recipient_id == recipient)
            .map(|m| m.content.clone())
            .collect()
    }

    /// Get the count of sent messages.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Clear all sent messages.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    /// Waits until at least `count` messages have been sent.
    ///
    /// Returns every sent message, or [`LxbotError::Timeout`] if fewer than
    /// `count` arrived within `timeout`.
    pub async fn wait_for_sent(
        &self,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<OutboundMessage>, LxbotError> {
        let wait = async {
            loop {
                {
                    let sent = self.sent.lock().await;
                    if sent.len() >= count {
                        return sent.clone();
                    }
                }
                self.sent_ready.notified().await;
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| LxbotError::Timeout { duration: timeout })
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, LxbotError> {
        if self.closed.load(Ordering::SeqCst) {
            Ok(HealthStatus::Unhealthy("closed".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), LxbotError> {
        self.close();
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    async fn connect(&mut self) -> Result<(), LxbotError> {
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<(), LxbotError> {
        self.sent.lock().await.push(msg);
        self.sent_ready.notify_one();
        Ok(())
    }

    async fn receive(&self) -> Result<InboundMessage, LxbotError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Ok(msg);
                }
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(LxbotError::ChannelClosed);
            }
            // Wait for notification that a new message was injected
            self.inbound_ready.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receive_returns_injected_messages() {
        let channel = MockChannel::new();
        channel.inject_text("test-user", "hello").await;

        let received = channel.receive().await.unwrap();
        assert_eq!(received.sender_id, UserId::from("test-user"));
        assert_eq!(received.content, b"hello");
    }

    #[tokio::test]
    async fn send_captures_outbound_messages() {
        let channel = MockChannel::new();
        let user = UserId::from("a1");
        channel
            .send(OutboundMessage::new(user.clone(), "response text"))
            .await
            .unwrap();

        let sent = channel.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].content, "response text");
        assert_eq!(channel.sent_to(&user).await, vec!["response text"]);
        assert!(channel.sent_to(&UserId::from("b2")).await.is_empty());
    }

    #[tokio::test]
    async fn multiple_messages_in_order() {
        let channel = MockChannel::new();
        channel.inject_text("u", "first").await;
        channel.inject_text("u", "second").await;

        assert_eq!(channel.receive().await.unwrap().content, b"first");
        assert_eq!(channel.receive().await.unwrap().content, b"second");
    }

    #[tokio::test]
    async fn receive_waits_for_injection() {
        let channel = MockChannel::new();
        let injector = channel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            injector.inject_text("u", "delayed").await;
        });

        let received = tokio::time::timeout(Duration::from_secs(2), channel.receive())
            .await
            .expect("receive timed out")
            .unwrap();
        assert_eq!(received.content, b"delayed");
    }

    #[tokio::test]
    async fn close_drains_queue_then_reports_closed() {
        let channel = MockChannel::new();
        channel.inject_text("u", "last").await;
        channel.close();

        assert_eq!(channel.receive().await.unwrap().content, b"last");
        assert!(matches!(
            channel.receive().await,
            Err(LxbotError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn close_wakes_a_blocked_receiver() {
        let channel = MockChannel::new();
        let closer = channel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            closer.close();
        });

        let result = tokio::time::timeout(Duration::from_secs(2), channel.receive())
            .await
            .expect("receive timed out");
        assert!(matches!(result, Err(LxbotError::ChannelClosed)));
    }

    #[tokio::test]
    async fn wait_for_sent_times_out_when_short() {
        let channel = MockChannel::new();
        channel
            .send(OutboundMessage::new(UserId::from("u"), "one"))
            .await
            .unwrap();

        assert_eq!(
            channel
                .wait_for_sent(1, Duration::from_millis(50))
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(matches!(
            channel.wait_for_sent(2, Duration::from_millis(50)).await,
            Err(LxbotError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn sent_count_and_clear() {
        let channel = MockChannel::new();
        assert_eq!(channel.sent_count().await, 0);

        let msg = OutboundMessage::new(UserId::from("u"), "test");
        channel.send(msg.clone()).await.unwrap();
        channel.send(msg).await.unwrap();
        assert_eq!(channel.sent_count().await, 2);

        channel.clear_sent().await;
        assert_eq!(channel.sent_count().await, 0);
    }
}
