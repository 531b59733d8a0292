use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tasklist_storage::SharedBackend;
use tasklist_storage_local::LocalStore;
use tasklist_storage_remote::RemoteStore;
use tracing::{info, warn};

use crate::{Config, TaskStore};

/// A directory holding `.tasklist/` plus the config read from it.
pub struct Workspace {
    pub root: PathBuf,
    pub cfg: Config,
}

impl Workspace {
    /// Open `root`, writing a default config first if none exists.
    /// Environment overrides are applied on top of the file.
    pub fn open(root: PathBuf) -> Result<Self> {
        let cfg = load_or_create(&root)?.with_env_overrides(|k| std::env::var(k).ok());
        Ok(Self { root, cfg })
    }

    /// Write the default config and create the local database.
    pub fn init_root(root: &Path) -> Result<()> {
        let cfg = load_or_create(root)?;
        LocalStore::open(&cfg.local_db_path(root))?;
        Ok(())
    }

    /// The one backend this session will use. Decided here and never
    /// revisited: remote when credentials are configured, local otherwise.
    pub fn select_backend(&self) -> Result<SharedBackend> {
        if let Some(remote) = self.cfg.remote_credentials() {
            match RemoteStore::new(&remote) {
                Ok(store) => {
                    info!(endpoint = store.endpoint(), "using remote task table");
                    return Ok(Arc::new(store));
                }
                Err(e) => warn!("remote backend misconfigured, using local storage: {e:#}"),
            }
        } else {
            info!("remote backend not configured, using local storage");
        }

        let db_path = self.cfg.local_db_path(&self.root);
        let store = LocalStore::open(&db_path).with_context(|| format!("open local store {}", db_path.display()))?;
        Ok(Arc::new(store))
    }

    /// Select the backend and load the task list.
    pub async fn connect(&self) -> Result<TaskStore> {
        let store = TaskStore::new(self.select_backend()?);
        store
            .initialize()
            .await
            .with_context(|| format!("load tasks from {} backend", store.backend_kind()))?;
        Ok(store)
    }
}

fn load_or_create(root: &Path) -> Result<Config> {
    let cfg_path = Config::config_path(root);
    if cfg_path.exists() {
        return Config::load_from(&cfg_path);
    }
    let cfg = Config::default();
    cfg.save_to(&cfg_path)?;
    Ok(cfg)
}
