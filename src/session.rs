use anyhow::{anyhow, Result};

use crate::config::AdminConfig;
use crate::sync::SyncCoordinator;

/// Fixed username/password pair from config. There is no token and no
/// expiry; the session lasts until logout or the cache is wiped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl From<&AdminConfig> for Credentials {
    fn from(config: &AdminConfig) -> Self {
        Self::new(&config.username, &config.password)
    }
}

pub fn login(sync: &mut SyncCoordinator, expected: &Credentials, given: &Credentials) -> Result<()> {
    if expected != given {
        tracing::warn!(username = %given.username, "rejected admin login");
        return Err(anyhow!("Invalid username or password."));
    }
    sync.begin_session()?;
    tracing::info!(username = %given.username, "admin session started");
    Ok(())
}

pub fn logout(sync: &mut SyncCoordinator) -> Result<()> {
    sync.end_session()
}

pub fn require_session(sync: &SyncCoordinator) -> Result<()> {
    if !sync.is_authenticated() {
        return Err(anyhow!("Not logged in. Run 'onboard login' first."));
    }
    Ok(())
}
