//! Key-value repository contracts and implementations.
//!
//! # Responsibility
//! - Store opaque byte blobs by string key for the outline store.
//! - Keep SQL details inside the repository boundary.
//!
//! # Invariants
//! - `put` replaces any previous value stored under the same key.
//! - `get` returns `None` for keys that were never written.
//! - SQLite-backed repositories only accept migrated connections.

use crate::db::migrations::{latest_version, schema_version};
use crate::db::{open_db, DbError};
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Result type used by key-value repository operations.
pub type KvRepoResult<T> = Result<T, KvRepoError>;

/// Errors from key-value repository operations.
#[derive(Debug)]
pub enum KvRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for KvRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "kv repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "kv repository requires table `{table}`")
            }
        }
    }
}

impl Error for KvRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<DbError> for KvRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for KvRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable blob storage consumed by the outline store.
pub trait KvRepository {
    /// Loads the value stored under `key`.
    fn get(&self, key: &str) -> KvRepoResult<Option<Vec<u8>>>;
    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &[u8]) -> KvRepoResult<()>;
}

/// SQLite-backed key-value repository.
///
/// Owns its connection so a store can live for the whole process.
pub struct SqliteKvRepository {
    conn: Connection,
}

impl SqliteKvRepository {
    /// Wraps a migrated connection.
    pub fn try_new(conn: Connection) -> KvRepoResult<Self> {
        ensure_kv_connection_ready(&conn)?;
        Ok(Self { conn })
    }

    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> KvRepoResult<Self> {
        let conn = open_db(path)?;
        Self::try_new(conn)
    }

    /// Borrows the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl KvRepository for SqliteKvRepository {
    fn get(&self, key: &str) -> KvRepoResult<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row(
                "SELECT value
                 FROM kv_entries
                 WHERE key = ?1;",
                [key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &[u8]) -> KvRepoResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entries (key, value)
             VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }
}

/// In-process key-value repository.
///
/// Nothing survives the process; used by tests and the CLI probe.
#[derive(Debug, Default)]
pub struct MemoryKvRepository {
    entries: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKvRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KvRepository for MemoryKvRepository {
    fn get(&self, key: &str) -> KvRepoResult<Option<Vec<u8>>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> KvRepoResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

fn ensure_kv_connection_ready(conn: &Connection) -> KvRepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(KvRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'kv_entries'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(KvRepoError::MissingRequiredTable("kv_entries"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{KvRepository, MemoryKvRepository};

    #[test]
    fn memory_repo_replaces_values() {
        let repo = MemoryKvRepository::new();
        assert!(repo.is_empty());
        assert_eq!(repo.get("k").unwrap(), None);

        repo.put("k", b"first").unwrap();
        repo.put("k", b"second").unwrap();

        assert_eq!(repo.get("k").unwrap().as_deref(), Some(&b"second"[..]));
        assert_eq!(repo.len(), 1);
    }
}
