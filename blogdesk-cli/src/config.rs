//! TOML configuration.

use anyhow::{Context, Result};
use blogdesk_sync::{MoodleConfig, SessionConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything the binary reads from its config file.
///
/// ```toml
/// data_dir = "/home/me/.blogdesk"
///
/// [moodle]
/// site_url = "https://school.example"
/// token = "..."
///
/// [session]
/// site_id = "school"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub moodle: MoodleConfig,
    /// Holds the draft database and staged attachments.
    pub data_dir: PathBuf,
    pub session: SessionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            moodle: MoodleConfig::default(),
            data_dir: PathBuf::from(".blogdesk"),
            session: SessionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("offline.db")
    }

    pub fn files_root(&self) -> PathBuf {
        self.data_dir.join("files")
    }
}
