// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the lxbot crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{BackendError, LxbotError};

/// Stable identifier of a remote user (the sender's network address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Author of a conversation turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of a conversation history, in the shape the chat endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Backend endpoint a request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Endpoint {
    /// Single-turn completion (`/api/generate`).
    Generate,
    /// Multi-turn conversation (`/api/chat`).
    Chat,
}

impl Endpoint {
    /// Path relative to the backend base URL.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Generate => "/api/generate",
            Endpoint::Chat => "/api/chat",
        }
    }
}

/// Outcome of one backend call: the raw JSON response or a categorised failure.
pub type CallResult = Result<serde_json::Value, BackendError>;

/// An inbound message delivered by the messaging network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender_id: UserId,
    /// Raw payload bytes; not guaranteed to be UTF-8.
    pub content: Vec<u8>,
}

impl InboundMessage {
    pub fn new(sender_id: impl Into<UserId>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            sender_id: sender_id.into(),
            content: content.into(),
        }
    }

    /// The payload as text, or [`LxbotError::Decode`] when it is not UTF-8.
    pub fn text(&self) -> Result<&str, LxbotError> {
        Ok(std::str::from_utf8(&self.content)?)
    }
}

/// A reply to be delivered to a user over the messaging network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub recipient_id: UserId,
    pub content: String,
}

impl OutboundMessage {
    pub fn new(recipient_id: UserId, content: impl Into<String>) -> Self {
        Self {
            recipient_id,
            content: content.into(),
        }
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Backend,
    Storage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn inbound_text_decodes_utf8_only() {
        let ok = InboundMessage::new("a1", "héllo");
        assert_eq!(ok.text().unwrap(), "héllo");

        let bad = InboundMessage::new("a1", vec![0x68, 0xff]);
        let err = bad.text().unwrap_err();
        assert!(matches!(err, LxbotError::Decode(_)));
        assert!(err.to_string().starts_with("message content is not valid UTF-8"));
    }

    #[test]
    fn role_serializes_lowercase() {
        let turn = ChatTurn::assistant("hello");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "hello"}));

        let parsed: ChatTurn =
            serde_json::from_value(serde_json::json!({"role": "system", "content": "be brief"}))
                .unwrap();
        assert_eq!(parsed, ChatTurn::system("be brief"));
    }

    #[test]
    fn role_display_matches_wire_name() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::from_str("assistant").unwrap(), Role::Assistant);
    }

    #[test]
    fn endpoint_paths() {
        assert_eq!(Endpoint::Generate.path(), "/api/generate");
        assert_eq!(Endpoint::Chat.path(), "/api/chat");
        assert_eq!(Endpoint::Chat.to_string(), "chat");
    }

    #[test]
    fn user_id_is_transparent_in_json() {
        let id = UserId::from("a1b2c3");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"a1b2c3\"");
        assert_eq!(id.to_string(), "a1b2c3");
    }

    #[test]
    fn adapter_type_round_trips_through_display() {
        for variant in [AdapterType::Channel, AdapterType::Backend, AdapterType::Storage] {
            let parsed = AdapterType::from_str(&variant.to_string()).unwrap();
            assert_eq!(parsed, variant);
        }
    }
}
