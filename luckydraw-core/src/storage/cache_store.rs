use crate::error::{DrawError, Result};
use crate::storage::LocalTier;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Local document cache in a SQLite file.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    pub fn open(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DrawError::internal(format!("Failed to create directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.init_schema()?;
        Ok(cache)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                key TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }
}

impl LocalTier for SqliteCache {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();

        let body = conn
            .query_row(
                "SELECT body FROM documents WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(body)
    }

    fn write(&self, key: &str, document: &str) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "INSERT OR REPLACE INTO documents (key, body, updated_at) VALUES (?1, ?2, ?3)",
            params![key, document, Utc::now().timestamp_millis()],
        )?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM documents WHERE key = ?1", params![key])?;
        Ok(())
    }
}
