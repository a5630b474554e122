//! SQLite database wrapper

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::debug;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS preferences (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;

/// SQLite database holding durable preferences
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {:?}", path))?;

        // Several CLI instances may share one preferences file
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        Self::with_connection(conn)
    }

    /// In-memory database, used by tests
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        debug!("Preferences schema ready");
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}
