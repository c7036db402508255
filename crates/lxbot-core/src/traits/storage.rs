// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value storage trait for persisted bot state.

use serde_json::Value;

use crate::error::LxbotError;

/// Synchronous JSON key-value storage.
///
/// Every `set` is a write-through: when it returns `Ok`, the value is
/// durable as far as the implementation can make it.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Value>, LxbotError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &Value) -> Result<(), LxbotError>;

    /// Returns the value stored under `key`, or `default` when absent.
    fn get_or(&self, key: &str, default: Value) -> Result<Value, LxbotError> {
        Ok(self.get(key)?.unwrap_or(default))
    }
}
