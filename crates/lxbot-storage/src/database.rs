// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection setup: parent directory creation, PRAGMAs, migrations.

use std::path::Path;
use std::time::Duration;

use lxbot_core::LxbotError;
use rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Opens (creating if needed) the database at `path` and brings its schema
/// up to date.
pub fn open_connection(path: &str, wal_mode: bool) -> Result<Connection, LxbotError> {
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(LxbotError::storage)?;
    }

    let mut conn = Connection::open(path).map_err(LxbotError::storage)?;
    apply_pragmas(&conn, wal_mode)?;
    migrations::run_migrations(&mut conn)?;
    debug!(path, wal_mode, "database opened");
    Ok(conn)
}

/// Opens a private in-memory database with the same schema.
pub fn open_in_memory() -> Result<Connection, LxbotError> {
    let mut conn = Connection::open_in_memory().map_err(LxbotError::storage)?;
    apply_pragmas(&conn, false)?;
    migrations::run_migrations(&mut conn)?;
    Ok(conn)
}

fn apply_pragmas(conn: &Connection, wal_mode: bool) -> Result<(), LxbotError> {
    if wal_mode {
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(LxbotError::storage)?;
        debug!(journal_mode = %mode, "journal mode set");
    }
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(LxbotError::storage)?;
    conn.busy_timeout(Duration::from_secs(5))
        .map_err(LxbotError::storage)?;
    Ok(())
}
