// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for the messaging network.

use async_trait::async_trait;

use crate::error::LxbotError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{InboundMessage, OutboundMessage};

/// Bidirectional connection to the messaging network.
///
/// Identity, announcement and signature verification are the adapter's
/// business; lxbot only consumes `{sender, bytes}` events and sends text.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Establishes a connection to the network.
    async fn connect(&mut self) -> Result<(), LxbotError>;

    /// Delivers a text message to a recipient.
    async fn send(&self, msg: OutboundMessage) -> Result<(), LxbotError>;

    /// Receives the next inbound message.
    ///
    /// Returns [`LxbotError::ChannelClosed`] once no further messages can arrive.
    async fn receive(&self) -> Result<InboundMessage, LxbotError>;
}
