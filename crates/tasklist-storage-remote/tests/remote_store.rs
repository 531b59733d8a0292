//! Exercises `RemoteStore` against an in-process stand-in for a PostgREST table.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Query, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use tasklist_core::TaskId;
use tasklist_storage::PersistenceBackend;
use tasklist_storage_remote::{RemoteConfig, RemoteStore, TaskRow};

const KEY: &str = "anon-test-key";

#[derive(Clone, Default)]
struct Table {
    rows: Arc<Mutex<Vec<TaskRow>>>,
    next_id: Arc<AtomicI64>,
    down: Arc<AtomicBool>,
    /// Query strings of filtered requests, as sent.
    queries: Arc<Mutex<Vec<String>>>,
}

impl Table {
    fn check(&self, headers: &HeaderMap) -> Result<(), StatusCode> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
        let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
        let bearer = headers.get("authorization").and_then(|v| v.to_str().ok());
        if apikey != Some(KEY) || bearer != Some(format!("Bearer {KEY}").as_str()) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        Ok(())
    }
}

/// Ids are compared as text, the way a text or uuid column compares them.
/// Only list items may be double-quoted; after `eq.` quotes are part of the value.
fn matching_ids(q: &HashMap<String, String>) -> Result<BTreeSet<String>, StatusCode> {
    let filter = q.get("id").ok_or(StatusCode::BAD_REQUEST)?;
    if let Some(one) = filter.strip_prefix("eq.") {
        return Ok(BTreeSet::from([one.to_string()]));
    }
    if let Some(list) = filter.strip_prefix("in.(").and_then(|s| s.strip_suffix(')')) {
        let items = list.split(',').map(|item| {
            let item = item.trim();
            item.strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or(item)
                .to_string()
        });
        return Ok(items.collect());
    }
    Err(StatusCode::BAD_REQUEST)
}

async fn list(
    headers: HeaderMap,
    State(table): State<Table>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Vec<TaskRow>>, StatusCode> {
    table.check(&headers)?;
    if q.get("select").map(String::as_str) != Some("*") || q.get("order").map(String::as_str) != Some("created_at.desc") {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut rows = table.rows.lock().unwrap().clone();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(rows))
}

async fn insert(
    headers: HeaderMap,
    State(table): State<Table>,
    Json(body): Json<Vec<Value>>,
) -> Result<(StatusCode, Json<Vec<TaskRow>>), StatusCode> {
    table.check(&headers)?;
    if headers.get("prefer").and_then(|v| v.to_str().ok()) != Some("return=representation") {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut created = vec![];
    for new in body {
        let row = TaskRow {
            id: TaskId::Int(table.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            text: new["text"].as_str().ok_or(StatusCode::BAD_REQUEST)?.to_string(),
            completed: new["completed"].as_bool().unwrap_or(false),
            created_at: new["created_at"].as_str().ok_or(StatusCode::BAD_REQUEST)?.to_string(),
        };
        table.rows.lock().unwrap().push(row.clone());
        created.push(row);
    }
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update(
    headers: HeaderMap,
    State(table): State<Table>,
    RawQuery(raw): RawQuery,
    Query(q): Query<HashMap<String, String>>,
    Json(patch): Json<Value>,
) -> Result<StatusCode, StatusCode> {
    table.check(&headers)?;
    table.queries.lock().unwrap().extend(raw);
    let ids = matching_ids(&q)?;
    let completed = patch["completed"].as_bool().ok_or(StatusCode::BAD_REQUEST)?;
    for row in table.rows.lock().unwrap().iter_mut().filter(|r| ids.contains(&r.id.to_string())) {
        row.completed = completed;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn remove(
    headers: HeaderMap,
    State(table): State<Table>,
    RawQuery(raw): RawQuery,
    Query(q): Query<HashMap<String, String>>,
) -> Result<StatusCode, StatusCode> {
    table.check(&headers)?;
    table.queries.lock().unwrap().extend(raw);
    let ids = matching_ids(&q)?;
    table.rows.lock().unwrap().retain(|r| !ids.contains(&r.id.to_string()));
    Ok(StatusCode::NO_CONTENT)
}

async fn serve(table: Table) -> String {
    let app = Router::new()
        .route("/rest/v1/tasks", get(list).post(insert).patch(update).delete(remove))
        .with_state(table);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn store(url: String, key: &str) -> RemoteStore {
    RemoteStore::new(&RemoteConfig {
        url,
        api_key: key.to_string(),
        table: "tasks".to_string(),
        timeout: None,
    })
    .unwrap()
}

#[tokio::test]
async fn insert_returns_server_assigned_row() {
    let table = Table::default();
    let remote = store(serve(table.clone()).await, KEY);

    let task = remote.insert("buy milk").await.unwrap();
    assert_eq!(task.id, TaskId::Int(1));
    assert_eq!(task.text, "buy milk");
    assert!(!task.completed);
    assert!(!task.created_at.is_empty());
    assert_eq!(table.rows.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn load_is_ordered_by_creation_time_descending() {
    let table = Table::default();
    table.rows.lock().unwrap().extend([
        TaskRow { id: TaskId::Int(1), text: "old".into(), completed: false, created_at: "2024-01-01T00:00:00+00:00".into() },
        TaskRow { id: TaskId::Int(3), text: "new".into(), completed: true, created_at: "2024-03-01T00:00:00+00:00".into() },
        TaskRow { id: TaskId::Int(2), text: "mid".into(), completed: false, created_at: "2024-02-01T00:00:00+00:00".into() },
    ]);
    let remote = store(serve(table).await, KEY);

    let texts: Vec<_> = remote.load_all().await.unwrap().into_iter().map(|t| t.text).collect();
    assert_eq!(texts, vec!["new", "mid", "old"]);
}

#[tokio::test]
async fn update_and_deletes_target_rows_by_id() {
    let table = Table::default();
    let remote = store(serve(table.clone()).await, KEY);

    let a = remote.insert("a").await.unwrap();
    let b = remote.insert("b").await.unwrap();
    let c = remote.insert("c").await.unwrap();

    remote.set_completed(&b.id, true).await.unwrap();
    remote.set_completed(&b.id, true).await.unwrap();
    assert!(table.rows.lock().unwrap().iter().find(|r| r.id == b.id).unwrap().completed);

    remote.delete(&a.id).await.unwrap();
    remote.delete(&a.id).await.unwrap();
    remote
        .delete_many(&BTreeSet::from([b.id.clone(), TaskId::Int(99)]))
        .await
        .unwrap();

    let left: Vec<_> = table.rows.lock().unwrap().iter().map(|r| r.id.clone()).collect();
    assert_eq!(left, vec![c.id]);
}

#[tokio::test]
async fn uuid_ids_are_sent_bare_in_eq_filters() {
    const UUID: &str = "3f1c9a2e-1111-2222-3333-444455556666";
    const OTHER: &str = "9b2e0c4d-aaaa-bbbb-cccc-ddddeeeeffff";
    let table = Table::default();
    table.rows.lock().unwrap().extend([
        TaskRow { id: TaskId::from(UUID), text: "a".into(), completed: false, created_at: "2024-01-01T00:00:00+00:00".into() },
        TaskRow { id: TaskId::from(OTHER), text: "b".into(), completed: false, created_at: "2024-01-02T00:00:00+00:00".into() },
    ]);
    let remote = store(serve(table.clone()).await, KEY);

    remote.set_completed(&TaskId::from(UUID), true).await.unwrap();
    assert!(table.rows.lock().unwrap()[0].completed);

    remote.delete(&TaskId::from(UUID)).await.unwrap();
    remote.delete_many(&BTreeSet::from([TaskId::from(OTHER)])).await.unwrap();
    assert!(table.rows.lock().unwrap().is_empty());

    let queries = table.queries.lock().unwrap().clone();
    assert_eq!(
        queries,
        vec![
            format!("id=eq.{UUID}"),
            format!("id=eq.{UUID}"),
            format!("id=in.%28%22{OTHER}%22%29"),
        ]
    );
}

#[tokio::test]
async fn rejected_request_names_the_http_status() {
    let remote = store(serve(Table::default()).await, "nope");
    let err = remote.insert("x").await.unwrap_err();
    let shown = err.to_string();
    assert!(shown.starts_with("remote backend unavailable: insert status"), "{shown}");
    assert!(shown.contains("401"), "{shown}");
}

#[tokio::test]
async fn empty_bulk_delete_skips_the_round_trip() {
    let table = Table::default();
    table.down.store(true, Ordering::SeqCst);
    let remote = store(serve(table).await, KEY);
    remote.delete_many(&BTreeSet::new()).await.unwrap();
}

#[tokio::test]
async fn server_errors_surface_as_backend_unavailable() {
    let table = Table::default();
    let remote = store(serve(table.clone()).await, KEY);
    remote.insert("kept").await.unwrap();

    table.down.store(true, Ordering::SeqCst);
    assert!(remote.load_all().await.unwrap_err().is_unavailable());
    assert!(remote.insert("lost").await.unwrap_err().is_unavailable());
    assert!(remote.set_completed(&TaskId::Int(1), true).await.unwrap_err().is_unavailable());
    assert!(remote.delete(&TaskId::Int(1)).await.unwrap_err().is_unavailable());

    let rows = table.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].completed);
}

#[tokio::test]
async fn wrong_key_is_rejected() {
    let remote = store(serve(Table::default()).await, "nope");
    let err = remote.load_all().await.unwrap_err();
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn unreachable_host_is_backend_unavailable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let remote = store(format!("http://{addr}"), KEY);
    assert!(remote.load_all().await.unwrap_err().is_unavailable());
}

#[test]
fn endpoint_joins_url_and_table() {
    let remote = store("https://example.supabase.co/".to_string(), KEY);
    assert_eq!(remote.endpoint(), "https://example.supabase.co/rest/v1/tasks");
}
