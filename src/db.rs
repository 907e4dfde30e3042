use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::StorageError;

/// String key-value store, partitioned by an integer scope (one per chat).
///
/// Every value is replaced whole; there are no partial updates.
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS storage (
                scope INTEGER NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (scope, key)
            )",
            (),
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    pub fn get_item(&self, scope: i64, key: &str) -> Result<Option<String>, StorageError> {
        read(&*self.lock()?, scope, key)
    }

    #[cfg(test)]
    pub fn set_item(&self, scope: i64, key: &str, value: &str) -> Result<(), StorageError> {
        write(&*self.lock()?, scope, key, value)
    }

    /// Read-modify-write of one key while holding the connection lock.
    ///
    /// `f` receives the current value and returns the value to store (or
    /// `None` to leave it untouched) together with a result for the caller.
    pub fn modify_item<T, F>(&self, scope: i64, key: &str, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(Option<String>) -> Result<(Option<String>, T), StorageError>,
    {
        let conn = self.lock()?;
        let (replacement, result) = f(read(&conn, scope, key)?)?;
        if let Some(value) = replacement {
            write(&conn, scope, key, &value)?;
        }
        Ok(result)
    }
}

fn read(conn: &Connection, scope: i64, key: &str) -> Result<Option<String>, StorageError> {
    let mut stmt = conn.prepare_cached("SELECT value FROM storage WHERE scope = ?1 AND key = ?2")?;
    match stmt.query_row((scope, key), |row| row.get(0)) {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write(conn: &Connection, scope: i64, key: &str, value: &str) -> Result<(), StorageError> {
    conn.execute(
        "INSERT OR REPLACE INTO storage (scope, key, value) VALUES (?1, ?2, ?3)",
        (scope, key, value),
    )?;
    log::debug!("Stored {} bytes under {}/{}", value.len(), scope, key);
    Ok(())
}
