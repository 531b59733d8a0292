use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tasklist_core::{now_iso, BackendKind, Task, TaskError, TaskId, TaskResult};
use uuid::Uuid;

use crate::traits::PersistenceBackend;

/// In-memory backend for tests. Behaves like a remote table (opaque ids,
/// awaitable calls) and can be told to fail or to answer slowly.
#[derive(Default)]
pub struct InMemoryBackend {
    inner: Mutex<Vec<Task>>,
    unavailable: AtomicBool,
    fail_next: AtomicUsize,
    calls: AtomicUsize,
    latency_ms: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with tasks, newest first.
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            inner: Mutex::new(tasks),
            ..Self::default()
        }
    }

    /// Every call fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the next `n` calls, then recover.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms.store(latency.as_millis() as usize, Ordering::SeqCst);
    }

    /// Number of backend calls received so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// What the backend currently holds, bypassing failure injection.
    pub fn persisted(&self) -> Vec<Task> {
        self.inner.lock().map(|t| t.clone()).unwrap_or_default()
    }

    async fn enter(&self) -> TaskResult<MutexGuard<'_, Vec<Task>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency as u64)).await;
        }

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TaskError::unavailable(BackendKind::Memory, "backend marked unavailable"));
        }
        let injected = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(TaskError::unavailable(BackendKind::Memory, "injected failure"));
        }

        self.inner
            .lock()
            .map_err(|_| TaskError::unavailable(BackendKind::Memory, "task table lock poisoned"))
    }
}

#[async_trait]
impl PersistenceBackend for InMemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn load_all(&self) -> TaskResult<Vec<Task>> {
        let tasks = self.enter().await?;
        Ok(tasks.clone())
    }

    async fn insert(&self, text: &str) -> TaskResult<Task> {
        let mut tasks = self.enter().await?;
        let task = Task::new(TaskId::Opaque(Uuid::new_v4().to_string()), text, now_iso());
        tasks.insert(0, task.clone());
        Ok(task)
    }

    async fn set_completed(&self, id: &TaskId, completed: bool) -> TaskResult<()> {
        let mut tasks = self.enter().await?;
        if let Some(t) = tasks.iter_mut().find(|t| &t.id == id) {
            t.completed = completed;
        }
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> TaskResult<()> {
        let mut tasks = self.enter().await?;
        tasks.retain(|t| &t.id != id);
        Ok(())
    }

    async fn delete_many(&self, ids: &BTreeSet<TaskId>) -> TaskResult<()> {
        let mut tasks = self.enter().await?;
        tasks.retain(|t| !ids.contains(&t.id));
        Ok(())
    }
}
