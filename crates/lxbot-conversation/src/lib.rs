// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user conversation state for lxbot.
//!
//! The [`ConversationStore`] tracks, for every user, whether chat mode is on,
//! whether a request is in flight, and the chat history. Every mutation is
//! written through to a [`KeyValueStore`](lxbot_core::KeyValueStore) before
//! it returns.

pub mod state;
pub mod store;

pub use state::{ResetOutcome, UserConversationState};
pub use store::{CHAT_STATES_KEY, CONVERSATIONS_KEY, ConversationSettings, ConversationStore};
