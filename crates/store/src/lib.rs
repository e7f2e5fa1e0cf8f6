//! SQLite persistence for the vocabulary database.
//!
//! One [`Store`] wraps a connection pool; every operation checks a
//! connection out for its own scope and releases it on drop. All mutation
//! is single-statement (insert, update, delete, upsert) committing
//! immediately, so no cross-request locking is needed.

pub mod sessions;
pub mod users;
pub mod words;

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use croco_core::{Error, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

pub use sessions::SESSION_TTL_SECONDS;
pub use users::{User, UserSummary};
pub use words::{WordOrder, WordRow};

type PooledConn = r2d2::PooledConnection<SqliteConnectionManager>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_salt BLOB NOT NULL,
    password_hash BLOB NOT NULL,
    created_at TEXT NOT NULL,
    is_admin INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS words (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    word TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS user_word_usage (
    user_id INTEGER NOT NULL,
    word_id INTEGER NOT NULL,
    last_used_at TEXT NOT NULL,
    PRIMARY KEY (user_id, word_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (word_id) REFERENCES words(id) ON DELETE CASCADE
);
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    token TEXT NOT NULL UNIQUE,
    user_id INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);
";

/// Enforce foreign keys and a busy timeout on every connection handed out
/// by the pool. Cascading deletes depend on the pragma being set
/// per-connection.
#[derive(Debug)]
struct ConnectionTuning;

impl r2d2::CustomizeConnection<rusqlite::Connection, rusqlite::Error> for ConnectionTuning {
    fn on_acquire(&self, conn: &mut rusqlite::Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(())
    }
}

/// Handle to the vocabulary database. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    pool: Pool<SqliteConnectionManager>,
}

impl Store {
    /// Open (creating if needed) the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .connection_customizer(Box::new(ConnectionTuning))
            .build(manager)
            .map_err(|e| Error::Database(e.to_string()))?;

        let store = Self { pool };
        store.init_schema()?;
        Ok(store)
    }

    /// Open a fresh in-memory database (tests).
    ///
    /// The pool is capped at one connection: every in-memory connection is
    /// its own database, so handing out a second one would expose an empty
    /// schema.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .connection_customizer(Box::new(ConnectionTuning))
            .build(manager)
            .map_err(|e| Error::Database(e.to_string()))?;

        let store = Self { pool };
        store.init_schema()?;
        Ok(store)
    }

    pub(crate) fn conn(&self) -> Result<PooledConn> {
        self.pool.get().map_err(|e| Error::Database(e.to_string()))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        log::debug!("database schema initialized");
        Ok(())
    }
}

/// Collapse a rusqlite error into the shared taxonomy.
pub(crate) fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

/// Like [`db_err`], but reports unique-constraint violations as a
/// [`Error::Conflict`] with the given message.
pub(crate) fn constraint_err(e: rusqlite::Error, conflict_msg: &str) -> Error {
    match &e {
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::Conflict(conflict_msg.to_string())
        }
        _ => db_err(e),
    }
}

/// Current UTC time as a fixed-width RFC 3339 string.
///
/// Fixed width keeps lexicographic and chronological order identical, which
/// the LRU selector relies on.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current unix timestamp in seconds (session expiry bookkeeping).
pub(crate) fn now_unix() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("words.db");
        let store = Store::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.count_words().unwrap(), 0);
    }

    #[test]
    fn test_schema_init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.db");
        {
            let store = Store::open(&path).unwrap();
            store
                .insert_new_words(&["apple".to_string()])
                .unwrap();
        }
        let store = Store::open(&path).unwrap();
        assert_eq!(store.count_words().unwrap(), 1);
    }

    #[test]
    fn test_now_rfc3339_is_sortable() {
        let a = now_rfc3339();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = now_rfc3339();
        assert!(a < b);
        assert_eq!(a.len(), b.len());
    }
}
