use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::models::{Application, Interview, Job};
use crate::sync::OutboxEntry;

const APPLICANTS: &str = "applicants";
const JOBS: &str = "jobs";
const INTERVIEWS: &str = "interviews";
const SESSION: &str = "admin_session";
const OUTBOX: &str = "outbox";

/// Durable key-value backend. Every write replaces the whole value for a key.
pub trait Store: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

// --- SQLite backend ---

pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create data directory: {}", parent.display())
                })?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open cache database: {}", path.display()))?;
        let store = Self {
            conn,
            path: path.to_path_buf(),
        };
        store.init()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }
}

impl Store for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let result = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0));
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                params![key, value],
            )
            .with_context(|| format!("Failed to write cache key '{}'", key))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

// --- In-memory backend ---

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

// --- Namespaced collections ---

/// Typed view over a [`Store`]. Read failures degrade to "no data"; only
/// writes can fail.
pub struct LocalCache {
    store: Box<dyn Store>,
    namespace: String,
}

impl LocalCache {
    pub fn new(store: Box<dyn Store>, namespace: &str) -> Self {
        Self {
            store,
            namespace: namespace.to_string(),
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()), "onboard")
    }

    pub fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.namespace, suffix)
    }

    fn read_collection<T: DeserializeOwned>(&self, suffix: &str) -> Option<Vec<T>> {
        let key = self.key(suffix);
        let raw = match self.store.get(&key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(%key, error = %e, "cache read failed, treating as empty");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(items) => Some(items),
            Err(e) => {
                tracing::warn!(%key, error = %e, "cache entry is not valid JSON, treating as empty");
                None
            }
        }
    }

    fn write_collection<T: Serialize>(&mut self, suffix: &str, items: &[T]) -> Result<()> {
        let key = self.key(suffix);
        let raw = serde_json::to_string(items)?;
        self.store.set(&key, &raw)
    }

    pub fn applications(&self) -> Vec<Application> {
        self.read_collection(APPLICANTS).unwrap_or_default()
    }

    pub fn replace_applications(&mut self, apps: &[Application]) -> Result<()> {
        self.write_collection(APPLICANTS, apps)
    }

    pub fn jobs(&mut self) -> Result<Vec<Job>> {
        match self.read_collection(JOBS) {
            Some(jobs) => Ok(jobs),
            None => {
                let jobs = seed_jobs();
                self.write_collection(JOBS, &jobs)?;
                Ok(jobs)
            }
        }
    }

    pub fn replace_jobs(&mut self, jobs: &[Job]) -> Result<()> {
        self.write_collection(JOBS, jobs)
    }

    pub fn interviews(&mut self) -> Result<Vec<Interview>> {
        match self.read_collection(INTERVIEWS) {
            Some(interviews) => Ok(interviews),
            None => {
                let interviews = seed_interviews();
                self.write_collection(INTERVIEWS, &interviews)?;
                Ok(interviews)
            }
        }
    }

    pub fn replace_interviews(&mut self, interviews: &[Interview]) -> Result<()> {
        self.write_collection(INTERVIEWS, interviews)
    }

    pub fn outbox(&self) -> Vec<OutboxEntry> {
        self.read_collection(OUTBOX).unwrap_or_default()
    }

    pub fn replace_outbox(&mut self, entries: &[OutboxEntry]) -> Result<()> {
        if entries.is_empty() {
            return self.store.remove(&self.key(OUTBOX));
        }
        self.write_collection(OUTBOX, entries)
    }

    pub fn session_active(&self) -> bool {
        match self.store.get(&self.key(SESSION)) {
            Ok(value) => value.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "session lookup failed");
                false
            }
        }
    }

    pub fn set_session(&mut self) -> Result<()> {
        let key = self.key(SESSION);
        self.store.set(&key, "true")
    }

    pub fn clear_session(&mut self) -> Result<()> {
        let key = self.key(SESSION);
        self.store.remove(&key)
    }
}

fn seed_jobs() -> Vec<Job> {
    vec![
        Job {
            id: "JOB-1".to_string(),
            title: "Senior Accountant".to_string(),
            department: "Finance".to_string(),
            status: "Open".to_string(),
            applicants: 12,
        },
        Job {
            id: "JOB-2".to_string(),
            title: "HR Executive".to_string(),
            department: "Human Resources".to_string(),
            status: "Open".to_string(),
            applicants: 8,
        },
    ]
}

fn seed_interviews() -> Vec<Interview> {
    vec![Interview {
        id: "INT-1".to_string(),
        name: "Rahul Sharma".to_string(),
        role: "Senior Accountant".to_string(),
        time: "10:30 AM".to_string(),
        date: "2026-01-05".to_string(),
        kind: "Video Call".to_string(),
        status: "Scheduled".to_string(),
    }]
}
