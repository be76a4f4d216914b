use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};

pub mod helpers;
mod migrations;

use helpers::parse_datetime;
use migrations::run_migrations;

/// Persistent, synchronous key-value store shared by the client: the auth
/// token, the admin role, the theme choice. Clones share one connection.
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<Arc<PathBuf>>,
}

impl LocalStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create store directory {}", parent.display())
            })?;
        }

        let conn = Connection::open(&path).context("failed to open SQLite store")?;
        if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
            error!("Failed to enable WAL mode: {err}");
        }

        let store = Self::from_connection(conn, Some(path))?;
        if let Some(path) = store.path() {
            info!("Local store initialized at {}", path.display());
        }
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory store")?;
        Self::from_connection(conn, None)
    }

    fn from_connection(mut conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        run_migrations(&mut conn).context("failed to run store migrations")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.map(Arc::new),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref().map(PathBuf::as_path)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT value FROM kv_entries WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .with_context(|| format!("failed to read key '{key}'"))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now();
        let conn = self.lock();
        conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now.to_rfc3339()],
        )
        .with_context(|| format!("failed to write key '{key}'"))?;
        Ok(())
    }

    /// Returns whether a value was actually removed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let conn = self.lock();
        let removed = conn
            .execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
            .with_context(|| format!("failed to remove key '{key}'"))?;
        Ok(removed > 0)
    }

    pub fn clear(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute("DELETE FROM kv_entries", [])
            .context("failed to clear store")?;
        Ok(())
    }

    pub fn updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = {
            let conn = self.lock();
            conn.query_row(
                "SELECT updated_at FROM kv_entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("failed to read timestamp for '{key}'"))?
        };

        raw.map(|value| parse_datetime(&value, "updated_at"))
            .transpose()
            .map_err(|err| anyhow!("corrupt entry '{key}': {err}"))
    }
}
