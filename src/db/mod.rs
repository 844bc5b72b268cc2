//! Device-local persistence
//!
//! A small SQLite key/value store. Keys are structured (namespace, quiz,
//! day, user) and map onto separate columns, so no two logical keys can
//! collide the way concatenated strings can. Values are JSON.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored value could not be (de)serialized: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to create data directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Logical storage key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Questions chosen for one user, quiz and calendar day
    DailySelection {
        quiz_id: String,
        day: NaiveDate,
        user_id: String,
    },
    /// Completion record for one user, quiz and calendar day
    DailyCompletion {
        quiz_id: String,
        day: NaiveDate,
        user_id: String,
    },
    /// Serialized ledger (holdings, trades, history)
    Ledger { user_id: String },
    /// Serialized balance account
    Balance { user_id: String },
    /// Set once the balance was seeded from the remote profile
    BalanceInitialized { user_id: String },
}

impl StoreKey {
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::DailySelection { .. } => "daily_selection",
            Self::DailyCompletion { .. } => "daily_completion",
            Self::Ledger { .. } => "ledger",
            Self::Balance { .. } => "balance",
            Self::BalanceInitialized { .. } => "balance_initialized",
        }
    }

    /// (namespace, quiz_id, day, user_id) as stored in the kv table
    fn columns(&self) -> (&'static str, &str, String, &str) {
        match self {
            Self::DailySelection { quiz_id, day, user_id }
            | Self::DailyCompletion { quiz_id, day, user_id } => {
                (self.namespace(), quiz_id.as_str(), day.to_string(), user_id.as_str())
            }
            Self::Ledger { user_id }
            | Self::Balance { user_id }
            | Self::BalanceInitialized { user_id } => {
                (self.namespace(), "", String::new(), user_id.as_str())
            }
        }
    }
}

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database file and make sure the schema exists
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        log::debug!("Opened academy database at {}", path.display());

        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                namespace TEXT NOT NULL,
                quiz_id TEXT NOT NULL DEFAULT '',
                day TEXT NOT NULL DEFAULT '',
                user_id TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (namespace, quiz_id, day, user_id)
            );

            CREATE TABLE IF NOT EXISTS points_outbox (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                amount INTEGER NOT NULL,
                reason TEXT NOT NULL,
                created_at TEXT NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 0,
                last_error TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_points_outbox_user ON points_outbox(user_id);
            "#,
        )?;

        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` in a transaction: everything it writes is committed together,
    /// or rolled back if it returns an error.
    pub fn with_transaction<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Store) -> StoreResult<T>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let result = f(self)?;
        tx.commit()?;
        Ok(result)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &StoreKey) -> StoreResult<Option<T>> {
        let (namespace, quiz_id, day, user_id) = key.columns();

        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE namespace = ?1 AND quiz_id = ?2 AND day = ?3 AND user_id = ?4",
                params![namespace, quiz_id, day, user_id],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn put<T: Serialize + ?Sized>(&self, key: &StoreKey, value: &T) -> StoreResult<()> {
        let (namespace, quiz_id, day, user_id) = key.columns();
        let json = serde_json::to_string(value)?;

        self.conn.execute(
            r#"
            INSERT INTO kv_store (namespace, quiz_id, day, user_id, value, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
            ON CONFLICT(namespace, quiz_id, day, user_id)
            DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![namespace, quiz_id, day, user_id, json],
        )?;

        Ok(())
    }

    pub fn contains(&self, key: &StoreKey) -> StoreResult<bool> {
        let (namespace, quiz_id, day, user_id) = key.columns();

        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM kv_store WHERE namespace = ?1 AND quiz_id = ?2 AND day = ?3 AND user_id = ?4",
            params![namespace, quiz_id, day, user_id],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    /// Returns true if a value was removed
    pub fn remove(&self, key: &StoreKey) -> StoreResult<bool> {
        let (namespace, quiz_id, day, user_id) = key.columns();

        let removed = self.conn.execute(
            "DELETE FROM kv_store WHERE namespace = ?1 AND quiz_id = ?2 AND day = ?3 AND user_id = ?4",
            params![namespace, quiz_id, day, user_id],
        )?;

        Ok(removed > 0)
    }

    /// Delete day-scoped entries of a namespace older than `day` for a user.
    /// ISO dates sort lexicographically, so a string comparison is enough.
    pub fn purge_before(&self, namespace: &str, user_id: &str, day: NaiveDate) -> StoreResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM kv_store WHERE namespace = ?1 AND user_id = ?2 AND day != '' AND day < ?3",
            params![namespace, user_id, day.to_string()],
        )?;

        Ok(removed)
    }
}
