// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for lxbot.
//!
//! This crate provides the trait definitions, error types, and common types
//! shared by the backend client, dispatch queue, conversation store and
//! message router.

pub mod error;
pub mod reply;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{BackendError, BackendErrorKind, LxbotError};
pub use reply::extract_reply_text;
pub use types::{
    AdapterType, CallResult, ChatTurn, Endpoint, HealthStatus, InboundMessage, OutboundMessage,
    Role, UserId,
};

pub use traits::{Backend, ChannelAdapter, KeyValueStore, PluginAdapter};
