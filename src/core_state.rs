//! Shared application state: the database connection behind a mutex.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use thiserror::Error;

use crate::db::sqlite::{open_database, open_memory_database};
use crate::db::DatabaseError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("State lock poisoned")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Application state shared across request handlers. SQLite connections are
/// not Sync, so the single connection lives behind a mutex.
pub struct AppState {
    db: Mutex<Connection>,
}

impl AppState {
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        Ok(Self { db: Mutex::new(open_database(path)?) })
    }

    /// In-memory state for tests.
    pub fn in_memory() -> Result<Self, CoreError> {
        Ok(Self { db: Mutex::new(open_memory_database()?) })
    }

    pub fn lock_db(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.db.lock().map_err(|_| CoreError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_state_is_usable() {
        let state = AppState::in_memory().unwrap();
        let conn = state.lock_db().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
