use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tasklist_storage_remote::RemoteConfig;

/// Values shipped in the sample config; a remote section still holding them
/// counts as "not configured".
pub const PLACEHOLDER_URL: &str = "YOUR_SUPABASE_URL";
pub const PLACEHOLDER_KEY: &str = "YOUR_SUPABASE_ANON_KEY";

pub const ENV_REMOTE_URL: &str = "TASKLIST_REMOTE_URL";
pub const ENV_REMOTE_KEY: &str = "TASKLIST_REMOTE_KEY";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub local: LocalConfig,
    #[serde(default)]
    pub remote: RemoteSection,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalConfig {
    /// SQLite file holding the task blob. Relative paths are resolved against
    /// the workspace root; `~` is expanded.
    pub path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteSection {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_table() -> String {
    "tasks".to_string()
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            url: PLACEHOLDER_URL.to_string(),
            anon_key: PLACEHOLDER_KEY.to_string(),
            table: default_table(),
            timeout_secs: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local: LocalConfig {
                path: ".tasklist/local.db".to_string(),
            },
            remote: RemoteSection::default(),
        }
    }
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| "parse tasklist.toml")?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Overlay `TASKLIST_REMOTE_URL` / `TASKLIST_REMOTE_KEY` as read by `lookup`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_REMOTE_URL) {
            self.remote.url = url;
        }
        if let Some(key) = lookup(ENV_REMOTE_KEY) {
            self.remote.anon_key = key;
        }
        self
    }

    /// Remote connection settings, if usable credentials are configured.
    pub fn remote_credentials(&self) -> Option<RemoteConfig> {
        let url = self.remote.url.trim();
        let key = self.remote.anon_key.trim();
        if url.is_empty() || key.is_empty() || url == PLACEHOLDER_URL || key == PLACEHOLDER_KEY {
            return None;
        }
        Some(RemoteConfig {
            url: url.to_string(),
            api_key: key.to_string(),
            table: self.remote.table.clone(),
            timeout: self.remote.timeout_secs.map(Duration::from_secs),
        })
    }

    pub fn local_db_path(&self, root: &Path) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(&self.local.path).to_string());
        if expanded.is_absolute() {
            expanded
        } else {
            root.join(expanded)
        }
    }

    pub fn config_path(root: &Path) -> PathBuf {
        root.join(".tasklist").join("tasklist.toml")
    }
}
