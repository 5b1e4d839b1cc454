//! SQLite-backed key-value store

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::now_ms;

/// Database file created inside the store directory
pub const DB_FILE_NAME: &str = "taskstore.db";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS entries (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
)";

/// Key-value store holding one JSON document per key
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open or create a store in the given directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        debug!(dir = %dir.display(), "Store::open: called");
        fs::create_dir_all(dir).context("Failed to create store directory")?;

        let path = dir.join(DB_FILE_NAME);
        let conn = Connection::open(&path).context(format!("Failed to open database {}", path.display()))?;
        conn.execute(SCHEMA, []).context("Failed to create entries table")?;

        info!(path = %path.display(), "Opened taskstore");
        Ok(Self { conn, path: Some(path) })
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self> {
        debug!("Store::open_in_memory: called");
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        conn.execute(SCHEMA, []).context("Failed to create entries table")?;
        Ok(Self { conn, path: None })
    }

    /// Path of the backing database file (None for in-memory stores)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the raw string stored under `key`
    pub fn get_raw(&self, key: &str) -> Result<Option<String>> {
        debug!(%key, "Store::get_raw: called");
        self.conn
            .query_row("SELECT value FROM entries WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .context(format!("Failed to read key {}", key))
    }

    /// Write a raw string under `key`, replacing any previous value
    pub fn put_raw(&mut self, key: &str, value: &str) -> Result<()> {
        debug!(%key, value_len = value.len(), "Store::put_raw: called");
        self.conn
            .execute(
                "INSERT INTO entries (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now_ms()],
            )
            .context(format!("Failed to write key {}", key))?;
        Ok(())
    }

    /// Remove `key`; returns whether anything was deleted
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        debug!(%key, "Store::remove: called");
        let removed = self
            .conn
            .execute("DELETE FROM entries WHERE key = ?1", params![key])
            .context(format!("Failed to remove key {}", key))?;
        Ok(removed > 0)
    }

    /// List stored keys, optionally restricted to a prefix
    pub fn keys(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        debug!(?prefix, "Store::keys: called");
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM entries ORDER BY key")
            .context("Failed to prepare key listing")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("Failed to list keys")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to read key row")?;

        Ok(match prefix {
            Some(p) => keys.into_iter().filter(|k| k.starts_with(p)).collect(),
            None => keys,
        })
    }

    /// Last write time of `key` in Unix milliseconds
    pub fn updated_at(&self, key: &str) -> Result<Option<i64>> {
        debug!(%key, "Store::updated_at: called");
        self.conn
            .query_row("SELECT updated_at FROM entries WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .context(format!("Failed to read timestamp for {}", key))
    }

    /// Read and deserialize the JSON document under `key`
    ///
    /// A present but unparseable document is an error, not `None`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        debug!(%key, "Store::get_json: called");
        match self.get_raw(key)? {
            Some(raw) => {
                let value = serde_json::from_str(&raw).context(format!("Corrupted JSON under key {}", key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Serialize `value` as JSON and store it under `key`
    pub fn put_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        debug!(%key, "Store::put_json: called");
        let raw = serde_json::to_string(value).context("Failed to serialize value")?;
        self.put_raw(key, &raw)
    }
}
