// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local key-value store.

use std::collections::HashMap;
use std::sync::Mutex;

use lxbot_core::{KeyValueStore, LxbotError};
use serde_json::Value;

/// Key-value store held entirely in memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, LxbotError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| LxbotError::Internal("memory store mutex poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), LxbotError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| LxbotError::Internal("memory store mutex poisoned".into()))?;
        entries.insert(key.to_string(), value.clone());
        Ok(())
    }
}
