use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: Backend,
    pub path: Option<PathBuf>,
    /// Prefix for every cache key, e.g. `onboard_applicants`.
    pub namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            path: None,
            namespace: "onboard".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// No base URL means local-only operation.
    pub base_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub replay_outbox: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { replay_outbox: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin123".to_string(),
        }
    }
}

impl Config {
    /// Load from an explicit path, or the per-user config dir. A missing file
    /// yields defaults; environment overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };

        let mut config = match path {
            Some(p) if p.exists() => Self::from_file(&p)?,
            Some(p) if explicit.is_some() => {
                return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
            }
            _ => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ONBOARD_REMOTE_URL") {
            let url = url.trim().to_string();
            self.remote.base_url = if url.is_empty() { None } else { Some(url) };
        }
        if let Some(ms) = lookup("ONBOARD_TIMEOUT_MS") {
            match ms.trim().parse::<u64>() {
                Ok(ms) => self.remote.timeout_ms = ms,
                Err(_) => tracing::warn!(value = %ms, "ignoring invalid ONBOARD_TIMEOUT_MS"),
            }
        }
    }

    /// Where the SQLite cache lives: explicit config path, XDG data dir, or cwd.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.storage.path {
            return path.clone();
        }
        data_dir()
            .map(|dir| dir.join("onboard.db"))
            .unwrap_or_else(|| PathBuf::from("onboard.db"))
    }

    pub fn log_path(&self) -> PathBuf {
        self.database_path().with_file_name("onboard.log")
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "onboard")
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

fn data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}
