//! Durable preferences backed by SQLite

use anyhow::Result;
use rusqlite::{params, OptionalExtension};
use std::sync::Mutex;

use super::database::Database;
use super::kv::KeyValueStore;
use crate::constants::storage::{PASSWORD_KEY, STICK_TO_BOTTOM_KEY, STICK_TO_BOTTOM_VALUE};

/// Preferences that survive restarts
pub struct Preferences {
    // rusqlite connections are Send but not Sync
    db: Mutex<Database>,
}

impl Preferences {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let db = self
            .db
            .lock()
            .map_err(|_| anyhow::anyhow!("preferences lock poisoned"))?;
        f(&db)
    }

    /// Stick-to-bottom preference; absent means off
    pub fn stick_to_bottom(&self) -> bool {
        matches!(
            self.get(STICK_TO_BOTTOM_KEY),
            Ok(Some(ref v)) if v == STICK_TO_BOTTOM_VALUE
        )
    }

    /// Stored site password
    ///
    /// Kept in plaintext, like the browser client this mirrors.
    pub fn password(&self) -> Option<String> {
        self.get(PASSWORD_KEY).ok().flatten()
    }

    pub fn set_password(&self, password: &str) -> Result<()> {
        if password.is_empty() {
            return self.remove(PASSWORD_KEY);
        }
        self.set(PASSWORD_KEY, password)
    }
}

impl KeyValueStore for Preferences {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_db(|db| {
            Ok(db
                .conn()
                .query_row(
                    "SELECT value FROM preferences WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?)
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_db(|db| {
            db.conn().execute(
                "INSERT INTO preferences (key, value, updated_at)
                 VALUES (?1, ?2, strftime('%s', 'now'))
                 ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = strftime('%s', 'now')",
                params![key, value],
            )?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.with_db(|db| {
            db.conn()
                .execute("DELETE FROM preferences WHERE key = ?1", params![key])?;
            Ok(())
        })
    }
}
