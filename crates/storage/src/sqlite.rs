use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::error::StorageError;
use crate::traits::KvMedium;

/// Key/value medium backed by a single SQLite table.
pub struct SqliteKv {
    conn: Connection,
}

impl SqliteKv {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl KvMedium for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CAST(unixepoch('now','subsec') * 1000 AS INTEGER)",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", rusqlite::params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_and_remove_clears() -> Result<(), StorageError> {
        let mut kv = SqliteKv::open_in_memory()?;
        assert_eq!(kv.get("a")?, None);

        kv.set("a", b"one")?;
        kv.set("a", b"two")?;
        assert_eq!(kv.get("a")?.as_deref(), Some(&b"two"[..]));
        assert_eq!(kv.keys()?, ["a"]);

        kv.remove("a")?;
        kv.remove("a")?;
        assert_eq!(kv.get("a")?, None);
        Ok(())
    }

    #[test]
    fn survives_reopen() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("todocal.db");
        {
            let mut kv = SqliteKv::open(&path)?;
            kv.set("todo-cal-v1", b"payload")?;
        }
        let kv = SqliteKv::open(&path)?;
        assert_eq!(kv.get("todo-cal-v1")?.as_deref(), Some(&b"payload"[..]));
        Ok(())
    }
}
