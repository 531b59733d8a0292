use anyhow::Result;
use tasklist_core::BackendKind;

use crate::{Config, Workspace};

#[derive(Debug)]
pub struct DoctorReport {
    pub config_found: bool,
    pub remote_configured: bool,
    pub backend: BackendKind,
    /// Task count on success, rendered error otherwise.
    pub load: Result<usize, String>,
}

impl DoctorReport {
    pub fn is_healthy(&self) -> bool {
        self.config_found && self.load.is_ok()
    }
}

/// Check config and backend reachability without touching any task.
pub async fn doctor(ws: &Workspace) -> Result<DoctorReport> {
    let config_found = Config::config_path(&ws.root).exists();
    let remote_configured = ws.cfg.remote_credentials().is_some();
    let backend = ws.select_backend()?;
    let load = backend
        .load_all()
        .await
        .map(|tasks| tasks.len())
        .map_err(|e| e.to_string());

    Ok(DoctorReport {
        config_found,
        remote_configured,
        backend: backend.kind(),
        load,
    })
}
