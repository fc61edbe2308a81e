//! Per-call connection opening.

use rusqlite::{Connection, OpenFlags};
use std::time::Duration;

use crate::DbError;

/// Settings used every time a connection is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbSettings {
    /// SQLite database path or `file:` URI (e.g. `file:app.db?mode=ro`).
    pub connection_string: String,

    /// Busy timeout for each connection, in milliseconds.
    pub busy_timeout_ms: u64,
}

/// Busy timeout used when none is configured, in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

impl DbSettings {
    /// Settings for `connection_string` with the default busy timeout.
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl Default for DbSettings {
    fn default() -> Self {
        Self::new("deppo.db")
    }
}

/// Opens a fresh connection with foreign keys enabled and the configured
/// busy timeout applied.
///
/// The caller owns the connection; dropping it closes the underlying handle.
///
/// # Errors
///
/// Returns [`DbError::Open`] if the database cannot be opened or configured.
pub fn open_connection(settings: &DbSettings) -> Result<Connection, DbError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let conn = Connection::open_with_flags(&settings.connection_string, flags)
        .map_err(DbError::Open)?;

    conn.busy_timeout(Duration::from_millis(settings.busy_timeout_ms))
        .map_err(DbError::Open)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(DbError::Open)?;

    Ok(conn)
}
