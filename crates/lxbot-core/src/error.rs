// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for lxbot.

use std::time::Duration;

use strum::Display;
use thiserror::Error;

use crate::types::UserId;

/// The primary error type used across lxbot adapter traits and core operations.
#[derive(Debug, Error)]
pub enum LxbotError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel adapter errors (delivery failure, message format).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The channel has no more inbound messages and will not produce any.
    #[error("channel closed")]
    ChannelClosed,

    /// Inference backend failure.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Inbound message content is not valid UTF-8.
    #[error("message content is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),

    /// The dispatch queue already holds `capacity` pending requests.
    #[error("request queue is full ({capacity} pending)")]
    QueueFull { capacity: usize },

    /// A request for this user is already in flight.
    #[error("a request for {user} is already in flight")]
    AlreadyWaiting { user: UserId },

    /// Message content was empty after trimming.
    #[error("message is empty")]
    EmptyInput,

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LxbotError {
    /// Wraps any error as a storage failure.
    pub fn storage<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Storage {
            source: source.into(),
        }
    }
}

/// Category of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum BackendErrorKind {
    /// Connection refused, DNS failure, reset, or any other transport fault.
    Transport,
    /// The call did not finish within the configured timeout.
    Timeout,
    /// The backend answered with a body that is not the expected JSON shape.
    MalformedResponse,
    /// The backend answered with a non-success HTTP status.
    Status(u16),
    /// The dispatch worker caught a panic while executing the call.
    WorkerFault,
}

/// A failed backend call, carried through completion callbacks as the
/// `Err` side of [`CallResult`](crate::types::CallResult).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Transport, message)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            BackendErrorKind::Timeout,
            format!("request timed out after {}s", after.as_secs()),
        )
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::MalformedResponse, message)
    }

    pub fn status(code: u16, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("backend returned status {code}")
        } else {
            format!("backend returned status {code}: {body}")
        };
        Self::new(BackendErrorKind::Status(code), message)
    }

    pub fn worker_fault(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::WorkerFault, message)
    }

    /// True when the failure points at backend reachability rather than at
    /// the request itself.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self.kind,
            BackendErrorKind::Transport | BackendErrorKind::Timeout
        )
    }
}
