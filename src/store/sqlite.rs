use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::store::migrations::BASE_MIGRATION;
use crate::store::{StateKey, StatePort, StoreError};

pub struct SqliteStateStore {
    conn: Mutex<Connection>,
    max_value_bytes: usize,
}

impl SqliteStateStore {
    pub fn open(path: &Path, max_value_bytes: usize) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?, max_value_bytes)
    }

    pub fn open_in_memory(max_value_bytes: usize) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?, max_value_bytes)
    }

    fn from_connection(conn: Connection, max_value_bytes: usize) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(conn),
            max_value_bytes,
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn migrate(&self) -> Result<(), StoreError> {
        self.conn()?.execute_batch(BASE_MIGRATION)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl StatePort for SqliteStateStore {
    fn get(&self, key: StateKey) -> Result<Option<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT value FROM kv_state WHERE key = ?1")?;
        let result = stmt.query_row(params![key.as_str()], |row| row.get::<_, String>(0));
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: StateKey, value: &str) -> Result<(), StoreError> {
        if value.len() > self.max_value_bytes {
            return Err(StoreError::QuotaExceeded {
                key: key.as_str(),
                bytes: value.len(),
                limit: self.max_value_bytes,
            });
        }
        self.conn()?.execute(
            r#"
INSERT INTO kv_state(key, value, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
"#,
            params![key.as_str(), value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: StateKey) -> Result<(), StoreError> {
        self.conn()?
            .execute("DELETE FROM kv_state WHERE key = ?1", params![key.as_str()])?;
        Ok(())
    }
}
