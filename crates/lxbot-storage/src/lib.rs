// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value persistence for lxbot.
//!
//! Provides [`SqliteStore`], a WAL-mode SQLite store with embedded
//! migrations, and [`MemoryStore`] for tests and ephemeral runs. Both
//! implement [`lxbot_core::KeyValueStore`] with JSON values.

pub mod database;
pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
