// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the KeyValueStore trait.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use lxbot_config::model::StorageConfig;
use lxbot_core::{AdapterType, HealthStatus, KeyValueStore, LxbotError, PluginAdapter};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use tracing::debug;

use crate::database;

/// SQLite-backed key-value store.
///
/// A single connection guarded by a mutex serializes every read and write.
/// Each `set` is its own statement, committed before it returns.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: String,
}

impl SqliteStore {
    /// Opens the database described by `config`, running migrations.
    pub fn open(config: &StorageConfig) -> Result<Self, LxbotError> {
        let conn = database::open_connection(&config.database_path, config.wal_mode)?;
        debug!(path = %config.database_path, "SQLite store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            path: config.database_path.clone(),
        })
    }

    /// Opens a throwaway in-memory database.
    pub fn in_memory() -> Result<Self, LxbotError> {
        Ok(Self {
            conn: Mutex::new(database::open_in_memory()?),
            path: ":memory:".to_string(),
        })
    }

    /// Path of the database file.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Lists stored keys in lexical order.
    pub fn keys(&self) -> Result<Vec<String>, LxbotError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT key FROM kv ORDER BY key ASC")
            .map_err(LxbotError::storage)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(LxbotError::storage)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(LxbotError::storage)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LxbotError> {
        self.conn
            .lock()
            .map_err(|_| LxbotError::Internal("sqlite connection mutex poisoned".into()))
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Value>, LxbotError> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(LxbotError::storage)?;

        raw.map(|text| serde_json::from_str(&text).map_err(LxbotError::storage))
            .transpose()
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), LxbotError> {
        let text = serde_json::to_string(value).map_err(LxbotError::storage)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_at)
             VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![key, text],
        )
        .map_err(LxbotError::storage)?;
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, LxbotError> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(LxbotError::storage)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LxbotError> {
        let conn = self.lock()?;
        // The checkpoint pragma reports a status row.
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            .map_err(LxbotError::storage)?;
        debug!("shutdown: WAL checkpoint complete");
        Ok(())
    }
}
