//! Runtime configuration.
//!
//! The server reads its settings from environment variables. The CLI keeps
//! the access token of its last sign-in in `session.json` under the user's
//! config directory so that later commands can resume the session.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};

use crate::api::SecurityConfig;
use crate::client::DEFAULT_URL;

const APP_NAME: &str = "manga-tracker";
const SESSION_FILE: &str = "session.json";

pub const DEFAULT_PORT: u16 = 17020;

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// SQLite file (from MANGA_TRACKER_DB). `None` uses the platform data directory.
    pub db_path: Option<PathBuf>,
    pub security: SecurityConfig,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: DEFAULT_PORT,
            db_path: std::env::var_os("MANGA_TRACKER_DB").map(PathBuf::from),
            security: SecurityConfig::from_env(),
        }
    }
}

/// Base URL of the API the CLI talks to (from MANGA_TRACKER_URL).
pub fn api_url() -> String {
    std::env::var("MANGA_TRACKER_URL").unwrap_or_else(|_| DEFAULT_URL.to_string())
}

/// The CLI's persisted sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub api_url: String,
    pub email: String,
    pub access_token: String,
}

impl StoredSession {
    /// Load from the user's config directory. A missing file is `None`.
    pub fn load() -> Result<Option<Self>> {
        Self::load_from(&session_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).context("Failed to read session file")?;
        let session = serde_json::from_str(&content).context("Failed to parse session file")?;
        Ok(Some(session))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&session_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize session")?;
        write_private(path, &content).context("Failed to write session file")?;
        Ok(())
    }

    /// Forget the persisted sign-in, if there is one.
    pub fn clear() -> Result<()> {
        Self::clear_at(&session_path()?)
    }

    pub fn clear_at(path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_file(path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

/// Write `content` to a file only the current user can read.
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    // `mode` only applies to newly created files
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(content.as_bytes())
}

fn session_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(SESSION_FILE);
    Ok(path)
}
