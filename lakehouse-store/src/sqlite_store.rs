//! SQLite-based layer storage
//!
//! Schema:
//!   - layer_documents: one row per (layer, name), latest write wins

use crate::error::Result;
use crate::layer::{validate_name, Layer, LayerStore};
use rusqlite::{params, Connection};
use std::path::Path;

/// SQLite-backed layer store
pub struct SqliteStore {
    conn: Connection,
}

#[allow(clippy::result_large_err)]
impl SqliteStore {
    /// Open the store (create if not exists)
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS layer_documents (
                layer TEXT NOT NULL,
                name TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (layer, name)
            )",
            [],
        )?;

        Ok(Self { conn })
    }

    /// Document counts per layer
    pub fn count_by_layer(&self) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT layer, COUNT(*) FROM layer_documents GROUP BY layer ORDER BY layer",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }
}

#[allow(clippy::result_large_err)]
impl LayerStore for SqliteStore {
    fn put(&self, layer: Layer, name: &str, data: &[u8]) -> Result<()> {
        validate_name(name)?;
        let value = std::str::from_utf8(data)
            .map_err(|e| crate::error::StoreError::Other(format!("Invalid UTF-8: {}", e)))?;

        self.conn.execute(
            "INSERT OR REPLACE INTO layer_documents (layer, name, value, updated_at)
             VALUES (?, ?, ?, datetime('now'))",
            params![layer.as_str(), name, value],
        )?;

        Ok(())
    }

    fn get(&self, layer: Layer, name: &str) -> Result<Option<Vec<u8>>> {
        validate_name(name)?;
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM layer_documents WHERE layer = ? AND name = ?")?;
        let result = stmt.query_row(params![layer.as_str(), name], |row| {
            row.get::<_, String>(0)
        });

        match result {
            Ok(value) => Ok(Some(value.into_bytes())),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, layer: Layer) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM layer_documents WHERE layer = ? ORDER BY name")?;
        let rows = stmt.query_map(params![layer.as_str()], |row| row.get::<_, String>(0))?;

        let mut names = Vec::new();
        for name in rows {
            names.push(name?);
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let store = SqliteStore::open(":memory:").unwrap();

        let data = br#"{"resourceType":"Bundle","type":"collection"}"#;
        store.put(Layer::Bronze, "batch_0", data).unwrap();

        let retrieved = store.get(Layer::Bronze, "batch_0").unwrap();
        assert_eq!(retrieved, Some(data.to_vec()));
        assert_eq!(store.get(Layer::Silver, "batch_0").unwrap(), None);
    }

    #[test]
    fn test_overwrite() {
        let store = SqliteStore::open(":memory:").unwrap();

        store.put(Layer::Silver, "patients", b"[1]").unwrap();
        store.put(Layer::Silver, "patients", b"[1,2]").unwrap();

        assert_eq!(
            store.get(Layer::Silver, "patients").unwrap(),
            Some(b"[1,2]".to_vec())
        );
        assert_eq!(store.list(Layer::Silver).unwrap().len(), 1);
    }

    #[test]
    fn test_list_and_counts() {
        let store = SqliteStore::open(":memory:").unwrap();

        store.put(Layer::Bronze, "b2", b"{}").unwrap();
        store.put(Layer::Bronze, "b1", b"{}").unwrap();
        store.put(Layer::Silver, "s1", b"[]").unwrap();

        assert_eq!(store.list(Layer::Bronze).unwrap(), ["b1", "b2"]);
        assert_eq!(store.latest(Layer::Bronze).unwrap().as_deref(), Some("b2"));
        assert_eq!(
            store.count_by_layer().unwrap(),
            vec![("bronze".to_string(), 2), ("silver".to_string(), 1)]
        );
    }

    #[test]
    fn test_invalid_utf8() {
        let store = SqliteStore::open(":memory:").unwrap();
        assert!(store.put(Layer::Bronze, "bad", &[0xff, 0xfe]).is_err());
    }
}
