use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tasklist_core::{next_local_id, now_iso, now_ms, BackendKind, Task, TaskError, TaskId, TaskResult};
use tasklist_storage::PersistenceBackend;
use tracing::debug;

/// Key the whole task list is stored under.
pub const TASKS_KEY: &str = "tasks";

/// Local backend: the entire task list is one JSON blob in a SQLite key-value
/// table. Every mutation is a read-modify-write inside one immediate
/// transaction, so callers never observe a half-written list.
pub struct LocalStore {
    conn: Mutex<Connection>,
}

impl LocalStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
        }
        let conn = Connection::open(db_path).with_context(|| format!("open sqlite db {}", db_path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("open in-memory sqlite db")?)
    }

    fn init(conn: Connection) -> Result<Self> {
        let init_sql = include_str!("../migrations/0001_init.sql");
        conn.execute_batch(init_sql).context("apply kv schema")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Raw blob as stored, if any. Handy for inspection and tests.
    pub fn raw_blob(&self) -> TaskResult<Option<String>> {
        let conn = self.lock()?;
        read_raw(&conn).map_err(unavailable)
    }

    fn lock(&self) -> TaskResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TaskError::unavailable(BackendKind::Local, "sqlite connection lock poisoned"))
    }

    fn modify<T>(&self, f: impl FnOnce(&mut Vec<Task>) -> T) -> TaskResult<T> {
        let mut conn = self.lock()?;
        let run = || -> Result<T> {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .context("begin transaction")?;
            let mut tasks = decode(read_raw(&tx)?)?;
            let out = f(&mut tasks);
            let blob = serde_json::to_string(&tasks).context("serialize task list")?;
            tx.execute(
                "INSERT INTO kv(key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![TASKS_KEY, blob],
            )
            .context("write task list")?;
            tx.commit().context("commit task list")?;
            Ok(out)
        };
        run().map_err(unavailable)
    }
}

fn read_raw(conn: &Connection) -> Result<Option<String>> {
    conn.query_row("SELECT value FROM kv WHERE key = ?1", params![TASKS_KEY], |r| r.get(0))
        .optional()
        .context("read task list")
}

fn decode(raw: Option<String>) -> Result<Vec<Task>> {
    match raw {
        None => Ok(vec![]),
        Some(raw) => serde_json::from_str(&raw).context("stored task list is not valid JSON"),
    }
}

fn unavailable(err: anyhow::Error) -> TaskError {
    TaskError::unavailable(BackendKind::Local, err)
}

#[async_trait]
impl PersistenceBackend for LocalStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn load_all(&self) -> TaskResult<Vec<Task>> {
        let conn = self.lock()?;
        read_raw(&conn).and_then(decode).map_err(unavailable)
    }

    async fn insert(&self, text: &str) -> TaskResult<Task> {
        self.modify(|tasks| {
            let last = tasks.iter().filter_map(|t| t.id.as_int()).max();
            let id = next_local_id(now_ms(), last);
            let task = Task::new(TaskId::Int(id), text, now_iso());
            tasks.insert(0, task.clone());
            debug!(id, "local insert");
            task
        })
    }

    async fn set_completed(&self, id: &TaskId, completed: bool) -> TaskResult<()> {
        self.modify(|tasks| {
            if let Some(t) = tasks.iter_mut().find(|t| &t.id == id) {
                t.completed = completed;
            }
        })
    }

    async fn delete(&self, id: &TaskId) -> TaskResult<()> {
        self.modify(|tasks| tasks.retain(|t| &t.id != id))
    }

    async fn delete_many(&self, ids: &BTreeSet<TaskId>) -> TaskResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.modify(|tasks| tasks.retain(|t| !ids.contains(&t.id)))
    }
}
