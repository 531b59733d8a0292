use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tasklist_core::{
    counts, filter, normalize_text, BackendKind, Counts, FilterMode, Task, TaskError, TaskEvent, TaskId, TaskResult,
};
use tasklist_storage::SharedBackend;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::locks::IdLocks;

const EVENT_CAPACITY: usize = 64;

/// Result of a clear-completed request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearOutcome {
    /// No task was completed; nothing was asked or sent.
    NothingToClear,
    /// The confirmation callback said no.
    Declined,
    Cleared(usize),
}

/// Owner of the in-memory task list.
///
/// Every mutation is confirm-then-commit: the backend call runs first and
/// memory is only touched once it succeeded. On failure memory keeps its
/// previous state and the error is handed back to the caller.
pub struct TaskStore {
    backend: SharedBackend,
    tasks: Mutex<Vec<Task>>,
    filter: Mutex<FilterMode>,
    locks: IdLocks,
    events: broadcast::Sender<TaskEvent>,
}

impl TaskStore {
    pub fn new(backend: SharedBackend) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend,
            tasks: Mutex::new(vec![]),
            filter: Mutex::new(FilterMode::All),
            locks: IdLocks::new(),
            events,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    /// Load everything from the backend and replace the in-memory list.
    pub async fn initialize(&self) -> TaskResult<usize> {
        let backend = self.backend.kind();
        match self.backend.load_all().await {
            Ok(loaded) => {
                let loaded = dedup(loaded);
                let count = loaded.len();
                *self.list() = loaded;
                info!(%backend, count, "tasks loaded");
                self.emit(TaskEvent::Loaded { backend, count });
                Ok(count)
            }
            Err(e) => {
                warn!(%backend, "initial load failed: {e}");
                Err(e)
            }
        }
    }

    pub async fn add_task(&self, raw: &str) -> TaskResult<Task> {
        let text = normalize_text(raw).ok_or(TaskError::Validation)?;

        let task = self.backend.insert(text).await.map_err(|e| {
            warn!("add failed: {e}");
            e
        })?;
        {
            let mut tasks = self.list();
            tasks.retain(|t| t.id != task.id);
            tasks.insert(0, task.clone());
        }
        debug!(id = %task.id, "task added");
        self.emit(TaskEvent::TaskAdded { task: task.clone() });
        Ok(task)
    }

    /// Flip `completed`. `Ok(None)` when the id is not in the list.
    pub async fn toggle_task(&self, id: &TaskId) -> TaskResult<Option<Task>> {
        let Some(id) = self.resolve(id) else {
            return Ok(None);
        };
        let id = &id;
        let _guard = self.locks.acquire(id).await;

        let Some(current) = self.get(id) else {
            return Ok(None);
        };
        let completed = !current.completed;

        self.backend.set_completed(id, completed).await.map_err(|e| {
            warn!(%id, "toggle failed: {e}");
            e
        })?;
        let updated = {
            let mut tasks = self.list();
            tasks.iter_mut().find(|t| &t.id == id).map(|t| {
                t.completed = completed;
                t.clone()
            })
        };
        debug!(%id, completed, "task toggled");
        self.emit(TaskEvent::TaskToggled { id: id.clone(), completed });
        Ok(updated)
    }

    /// `Ok(false)` when the id is not in the list.
    pub async fn delete_task(&self, id: &TaskId) -> TaskResult<bool> {
        let Some(id) = self.resolve(id) else {
            return Ok(false);
        };
        let id = &id;
        let _guard = self.locks.acquire(id).await;

        if self.get(id).is_none() {
            return Ok(false);
        }
        self.backend.delete(id).await.map_err(|e| {
            warn!(%id, "delete failed: {e}");
            e
        })?;
        self.list().retain(|t| &t.id != id);
        debug!(%id, "task deleted");
        self.emit(TaskEvent::TaskDeleted { id: id.clone() });
        Ok(true)
    }

    /// Remove every completed task after `confirm(count)` agrees.
    ///
    /// The backend receives one bulk delete; if it fails none of the tasks
    /// leave memory, even if the server removed some before erroring.
    pub async fn clear_completed(&self, confirm: impl FnOnce(usize) -> bool) -> TaskResult<ClearOutcome> {
        let candidates = self.completed_ids();
        if candidates.is_empty() {
            return Ok(ClearOutcome::NothingToClear);
        }
        if !confirm(candidates.len()) {
            return Ok(ClearOutcome::Declined);
        }

        let _guards = self.locks.acquire_all(&candidates).await;
        // a toggle may have landed while we waited for the locks
        let ids: BTreeSet<TaskId> = self.completed_ids().intersection(&candidates).cloned().collect();
        if ids.is_empty() {
            return Ok(ClearOutcome::NothingToClear);
        }

        self.backend.delete_many(&ids).await.map_err(|e| {
            warn!(count = ids.len(), "clear completed failed: {e}");
            e
        })?;
        self.list().retain(|t| !ids.contains(&t.id));
        debug!(count = ids.len(), "completed tasks cleared");
        let cleared = ids.len();
        self.emit(TaskEvent::CompletedCleared { ids: ids.into_iter().collect() });
        Ok(ClearOutcome::Cleared(cleared))
    }

    /// Snapshot of the full list, newest first.
    pub fn tasks(&self) -> Vec<Task> {
        self.list().clone()
    }

    /// Exact match first, then by rendered form: a typed `123` also finds a
    /// text key `"123"`.
    pub fn get(&self, id: &TaskId) -> Option<Task> {
        let tasks = self.list();
        let found = match tasks.iter().find(|t| &t.id == id) {
            Some(t) => Some(t),
            None => {
                let wanted = id.to_string();
                tasks.iter().find(|t| t.id.to_string() == wanted)
            }
        };
        found.cloned()
    }

    pub fn filtered_tasks(&self) -> Vec<Task> {
        let mode = self.filter_mode();
        filter(&self.list(), mode)
    }

    pub fn filter_mode(&self) -> FilterMode {
        *self.filter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_filter(&self, mode: FilterMode) {
        *self.filter.lock().unwrap_or_else(PoisonError::into_inner) = mode;
    }

    pub fn counts(&self) -> Counts {
        counts(&self.list())
    }

    /// The id as stored, so locks and backend calls use one key per task.
    fn resolve(&self, id: &TaskId) -> Option<TaskId> {
        self.get(id).map(|t| t.id)
    }

    fn completed_ids(&self) -> BTreeSet<TaskId> {
        self.list().iter().filter(|t| t.completed).map(|t| t.id.clone()).collect()
    }

    fn list(&self) -> MutexGuard<'_, Vec<Task>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: TaskEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Keep the first occurrence of each id.
fn dedup(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = BTreeSet::new();
    tasks.into_iter().filter(|t| seen.insert(t.id.clone())).collect()
}
