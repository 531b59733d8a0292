use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tasklist_core::TaskId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async lock per task id, created on demand and dropped once nobody
/// holds or waits for it.
#[derive(Default)]
pub struct IdLocks {
    slots: Mutex<HashMap<TaskId, Slot>>,
}

#[derive(Default)]
struct Slot {
    lock: Arc<AsyncMutex<()>>,
    /// Holders plus waiters. Counted under the map lock, never via `Arc` counts.
    users: usize,
}

pub struct IdGuard<'a> {
    locks: &'a IdLocks,
    id: TaskId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl IdLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, id: &TaskId) -> IdGuard<'_> {
        let lock = {
            let mut slots = self.slots();
            let slot = slots.entry(id.clone()).or_default();
            slot.users += 1;
            slot.lock.clone()
        };
        // registered from here on; if this future is dropped while waiting,
        // the guard's Drop still gives the slot back
        let mut guard = IdGuard {
            locks: self,
            id: id.clone(),
            guard: None,
        };
        guard.guard = Some(lock.lock_owned().await);
        guard
    }

    /// Locks every id in ascending order, so two bulk callers cannot deadlock.
    pub async fn acquire_all(&self, ids: &BTreeSet<TaskId>) -> Vec<IdGuard<'_>> {
        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.acquire(id).await);
        }
        guards
    }

    /// Ids that currently have a lock slot.
    pub fn tracked(&self) -> usize {
        self.slots().len()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<TaskId, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for IdGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = self.locks.slots();
        if let Some(slot) = slots.get_mut(&self.id) {
            slot.users -= 1;
            if slot.users == 0 {
                slots.remove(&self.id);
            }
        }
    }
}
