use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tasklist_core::{BackendKind, Task, TaskId, TaskResult};

/// Persistence contract shared by every backend.
///
/// All failures are reported as `TaskError::BackendUnavailable`; an operation
/// either fully applies or does not apply at all.
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Every persisted task, newest first.
    async fn load_all(&self) -> TaskResult<Vec<Task>>;

    /// Persist a new task and return it with backend-assigned `id` and `created_at`.
    /// `text` is expected to be trimmed and non-empty already.
    async fn insert(&self, text: &str) -> TaskResult<Task>;

    /// Idempotent; setting the current value again is not an error.
    async fn set_completed(&self, id: &TaskId, completed: bool) -> TaskResult<()>;

    /// Idempotent; a missing id is not an error.
    async fn delete(&self, id: &TaskId) -> TaskResult<()>;

    async fn delete_many(&self, ids: &BTreeSet<TaskId>) -> TaskResult<()>;
}

/// Shared backend handle, chosen once at startup.
pub type SharedBackend = Arc<dyn PersistenceBackend>;
