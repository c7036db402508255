// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state records and their persisted shape.

use lxbot_core::{ChatTurn, UserId};
use serde::{Deserialize, Serialize};

/// Everything the bot knows about one user's conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserConversationState {
    /// Multi-turn mode is active; plain messages become chat turns.
    pub chat_mode: bool,
    /// A chat request for this user is queued or executing.
    pub waiting_response: bool,
    /// Accepted chat turns over the user's lifetime. Never decremented.
    pub message_count: u64,
    /// Alternating user/assistant turns, oldest first.
    pub history: Vec<ChatTurn>,
}

impl UserConversationState {
    /// True when there is something for `reset` to clear.
    pub fn has_conversation(&self) -> bool {
        self.chat_mode || !self.history.is_empty()
    }
}

/// Result of a reset request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    Reset,
    NothingToReset,
}

/// Entry of the `chat_states` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PersistedChatState {
    #[serde(default)]
    pub chat_mode: bool,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub waiting_response: bool,
}

impl PersistedChatState {
    pub(crate) fn from_state(user: &UserId, state: &UserConversationState) -> Self {
        Self {
            chat_mode: state.chat_mode,
            message_count: state.message_count,
            address: user.to_string(),
            waiting_response: state.waiting_response,
        }
    }
}
