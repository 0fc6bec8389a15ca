//! Database persistence layer for SimpleChain
//!
//! The ledger store is a dumb ordered map from block height to a serialized
//! payload. It knows nothing about blocks, hashes or chain order.

use crate::error::ChainError;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Returned by [`LedgerStore::count`] when no entry has been written yet.
pub const EMPTY_HEIGHT: i64 = -1;

/// Abstraction for persistence backends keyed by block height.
pub trait LedgerStore: Send + Sync {
    /// Payload stored at `key`, or `None` when nothing was written there.
    fn get(&self, key: u64) -> Result<Option<String>, ChainError>;

    /// Writes `value` at `key`, overwriting whatever was there.
    fn put(&self, key: u64, value: &str) -> Result<(), ChainError>;

    /// Index of the highest stored entry, derived by scanning every key.
    /// An empty store yields [`EMPTY_HEIGHT`].
    fn count(&self) -> Result<i64, ChainError>;
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ChainError> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| ChainError::DatabaseError(format!("Failed to open database: {}", e)))?;
        Self::init(conn)
    }

    /// Private database that disappears with the handle. Used by tests.
    pub fn open_in_memory() -> Result<Self, ChainError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ChainError::DatabaseError(format!("Failed to open database: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, ChainError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS ledger (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to create ledger table: {}", e)))?;

        Ok(Database { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, ChainError> {
        self.conn
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))
    }
}

impl LedgerStore for Database {
    fn get(&self, key: u64) -> Result<Option<String>, ChainError> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM ledger WHERE key = ?1",
                params![key.to_string()],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| ChainError::DatabaseError(format!("Failed to read key {}: {}", key, e)))?;
        debug!(key, found = value.is_some(), "ledger get");
        Ok(value)
    }

    fn put(&self, key: u64, value: &str) -> Result<(), ChainError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO ledger (key, value) VALUES (?1, ?2)",
            params![key.to_string(), value],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to write key {}: {}", key, e)))?;
        Ok(())
    }

    fn count(&self) -> Result<i64, ChainError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT key FROM ledger")
            .map_err(|e| ChainError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| ChainError::DatabaseError(format!("Failed to scan ledger: {}", e)))?;

        let mut count = EMPTY_HEIGHT;
        for key in keys {
            key.map_err(|e| ChainError::DatabaseError(format!("Failed to read row: {}", e)))?;
            count += 1;
        }
        Ok(count)
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral runs.
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    pub entries: Arc<Mutex<BTreeMap<u64, String>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for InMemoryPersistence {
    fn get(&self, key: u64) -> Result<Option<String>, ChainError> {
        let entries = self.entries.lock().map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;
        Ok(entries.get(&key).cloned())
    }

    fn put(&self, key: u64, value: &str) -> Result<(), ChainError> {
        let mut entries = self.entries.lock().map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;
        entries.insert(key, value.to_string());
        Ok(())
    }

    fn count(&self) -> Result<i64, ChainError> {
        let entries = self.entries.lock().map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;
        Ok(entries.keys().fold(EMPTY_HEIGHT, |count, _| count + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backends() -> Vec<Box<dyn LedgerStore>> {
        vec![
            Box::new(Database::open_in_memory().unwrap()),
            Box::new(InMemoryPersistence::new()),
        ]
    }

    #[test]
    fn test_database_open() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.conn.lock().unwrap().is_autocommit());
    }

    #[test]
    fn test_empty_store_counts_minus_one() {
        for store in backends() {
            assert_eq!(store.count().unwrap(), EMPTY_HEIGHT);
        }
    }

    #[test]
    fn test_missing_key_is_none() {
        for store in backends() {
            store.put(0, "genesis").unwrap();
            assert_eq!(store.get(1).unwrap(), None);
            assert_eq!(store.get(0).unwrap().as_deref(), Some("genesis"));
        }
    }

    #[test]
    fn test_count_is_highest_index() {
        for store in backends() {
            store.put(0, "a").unwrap();
            assert_eq!(store.count().unwrap(), 0);
            store.put(1, "b").unwrap();
            store.put(2, "c").unwrap();
            assert_eq!(store.count().unwrap(), 2);
        }
    }

    #[test]
    fn test_put_overwrites_without_growing() {
        for store in backends() {
            store.put(0, "a").unwrap();
            store.put(0, "a").unwrap();
            store.put(0, "changed").unwrap();
            assert_eq!(store.count().unwrap(), 0);
            assert_eq!(store.get(0).unwrap().as_deref(), Some("changed"));
        }
    }

    #[test]
    fn test_in_memory_clones_share_entries() {
        let store = InMemoryPersistence::new();
        let other = store.clone();
        store.put(0, "shared").unwrap();
        assert_eq!(other.get(0).unwrap().as_deref(), Some("shared"));
    }
}
