use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use tasklist_core::{now_iso, BackendKind, Task, TaskError, TaskId, TaskResult};
use tasklist_storage::PersistenceBackend;
use tracing::debug;

use crate::rows::{eq_filter, in_filter, CompletedPatch, NewRow, TaskRow};

#[derive(Clone, Debug)]
pub struct RemoteConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    pub api_key: String,
    pub table: String,
    /// Per-request timeout. `None` waits for as long as the transport does.
    pub timeout: Option<Duration>,
}

/// Remote backend over a PostgREST table. One HTTP round trip per
/// operation, no retries; transport errors, non-2xx answers and undecodable
/// bodies all come back as `BackendUnavailable`.
pub struct RemoteStore {
    client: Client,
    endpoint: String,
}

impl RemoteStore {
    pub fn new(cfg: &RemoteConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(&cfg.api_key).context("api key is not a valid header value")?;
        key.set_sensitive(true);
        let mut bearer =
            HeaderValue::from_str(&format!("Bearer {}", cfg.api_key)).context("api key is not a valid header value")?;
        bearer.set_sensitive(true);
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = cfg.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("build http client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{}", cfg.url.trim_end_matches('/'), cfg.table),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, req: RequestBuilder, what: &'static str) -> Result<Response> {
        let resp = req
            .send()
            .await
            .with_context(|| format!("{what} request"))?
            .error_for_status()
            .with_context(|| format!("{what} status"))?;
        Ok(resp)
    }

    async fn fetch_all(&self) -> Result<Vec<Task>> {
        let req = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        let rows = self
            .send(req, "load")
            .await?
            .json::<Vec<TaskRow>>()
            .await
            .context("load decode")?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn insert_row(&self, text: &str) -> Result<Task> {
        let body = [NewRow {
            text,
            completed: false,
            created_at: now_iso(),
        }];
        let req = self
            .client
            .post(&self.endpoint)
            .header("Prefer", "return=representation")
            .json(&body);
        let mut rows = self
            .send(req, "insert")
            .await?
            .json::<Vec<TaskRow>>()
            .await
            .context("insert decode")?;
        let row = rows.pop().ok_or_else(|| anyhow!("insert returned no row"))?;
        Ok(row.into())
    }

    async fn patch_completed(&self, id: &TaskId, completed: bool) -> Result<()> {
        let req = self
            .client
            .patch(&self.endpoint)
            .query(&[("id", eq_filter(id))])
            .json(&CompletedPatch { completed });
        self.send(req, "update").await?;
        Ok(())
    }

    async fn delete_where(&self, filter: String) -> Result<()> {
        let req = self.client.delete(&self.endpoint).query(&[("id", filter)]);
        self.send(req, "delete").await?;
        Ok(())
    }
}

fn unavailable(err: anyhow::Error) -> TaskError {
    TaskError::unavailable(BackendKind::Remote, err)
}

#[async_trait]
impl PersistenceBackend for RemoteStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn load_all(&self) -> TaskResult<Vec<Task>> {
        self.fetch_all().await.map_err(unavailable)
    }

    async fn insert(&self, text: &str) -> TaskResult<Task> {
        let task = self.insert_row(text).await.map_err(unavailable)?;
        debug!(id = %task.id, "remote insert");
        Ok(task)
    }

    async fn set_completed(&self, id: &TaskId, completed: bool) -> TaskResult<()> {
        self.patch_completed(id, completed).await.map_err(unavailable)
    }

    async fn delete(&self, id: &TaskId) -> TaskResult<()> {
        self.delete_where(eq_filter(id)).await.map_err(unavailable)
    }

    async fn delete_many(&self, ids: &BTreeSet<TaskId>) -> TaskResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.delete_where(in_filter(ids)).await.map_err(unavailable)
    }
}
