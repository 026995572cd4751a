//! Minimal Reclaim.ai stand-in for tests.
//!
//! Serves the subset of the upstream API the client exercises: task CRUD
//! under `/api/tasks`, the planner verbs that take query parameters on POST,
//! and the calendar events range query. Responses use the upstream's
//! camelCase field names.
//!
//! Every request bumps a counter and records its `Authorization` header, so
//! tests can assert how often the network was actually hit and what
//! credential went over the wire.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

/// Minutes of work represented by one Reclaim time chunk.
pub const MINUTES_PER_CHUNK: u64 = 15;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub status: String,
    pub time_chunks_required: u64,
    pub time_chunks_spent: u64,
    #[serde(default)]
    pub notes: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_chunks")]
    pub time_chunks_required: u64,
}

fn default_chunks() -> u64 {
    4
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    pub title: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub time_chunks_required: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: String,
    pub title: String,
    pub event_start: String,
    pub event_end: String,
}

#[derive(Deserialize)]
struct ListTasksQuery {
    status: Option<String>,
}

#[derive(Deserialize)]
struct EventsQuery {
    start: String,
    end: String,
}

#[derive(Deserialize)]
struct LogWorkQuery {
    minutes: u64,
}

struct StateInner {
    tasks: RwLock<HashMap<u64, Task>>,
    events: RwLock<Vec<Event>>,
    next_id: AtomicU64,
    requests: AtomicUsize,
    last_authorization: Mutex<Option<String>>,
}

/// Shared state behind the router, kept around by tests for seeding and
/// assertions.
#[derive(Clone)]
pub struct MockState {
    inner: Arc<StateInner>,
}

impl MockState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StateInner {
                tasks: RwLock::new(HashMap::new()),
                events: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
                requests: AtomicUsize::new(0),
                last_authorization: Mutex::new(None),
            }),
        }
    }

    /// Inserts a task directly, bypassing HTTP.
    pub async fn seed_task(&self, title: &str, time_chunks_required: u64) -> Task {
        let task = Task {
            id: self.take_id(),
            title: title.to_string(),
            status: "NEW".to_string(),
            time_chunks_required,
            time_chunks_spent: 0,
            notes: String::new(),
        };
        self.inner.tasks.write().await.insert(task.id, task.clone());
        task
    }

    /// Inserts a calendar event directly. `start` and `end` are ISO 8601
    /// timestamps.
    pub async fn seed_event(&self, title: &str, start: &str, end: &str) -> Event {
        let event = Event {
            event_id: format!("evt-{}", self.take_id()),
            title: title.to_string(),
            event_start: start.to_string(),
            event_end: end.to_string(),
        };
        self.inner.events.write().await.push(event.clone());
        event
    }

    pub async fn task(&self, id: u64) -> Option<Task> {
        self.inner.tasks.read().await.get(&id).cloned()
    }

    /// Number of HTTP requests the server has handled.
    pub fn request_count(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    /// `Authorization` header of the most recent request, if any was sent.
    pub fn last_authorization(&self) -> Option<String> {
        self.inner
            .last_authorization
            .lock()
            .expect("authorization mutex poisoned")
            .clone()
    }

    fn take_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn router(state: MockState) -> Router {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/api/planner/done/task/{id}", post(complete_task))
        .route("/api/planner/log-work/task/{id}", post(log_work))
        .route("/api/events", get(list_events))
        .layer(middleware::from_fn_with_state(state.clone(), observe))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: MockState) -> io::Result<()> {
    axum::serve(listener, router(state)).await
}

/// Binds an ephemeral loopback port, serves in a background task and returns
/// the bound address.
pub async fn spawn(state: MockState) -> io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(state)).await {
            tracing::warn!(%error, "mock upstream stopped");
        }
    });
    Ok(addr)
}

async fn observe(State(state): State<MockState>, request: Request, next: Next) -> Response {
    state.inner.requests.fetch_add(1, Ordering::SeqCst);
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    *state
        .inner
        .last_authorization
        .lock()
        .expect("authorization mutex poisoned") = authorization;
    next.run(request).await
}

fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"message": "Resource not found"})))
}

async fn list_tasks(
    State(state): State<MockState>,
    Query(query): Query<ListTasksQuery>,
) -> Json<Vec<Task>> {
    let tasks = state.inner.tasks.read().await;
    let mut all: Vec<Task> = tasks
        .values()
        .filter(|task| query.status.as_ref().is_none_or(|status| task.status == *status))
        .cloned()
        .collect();
    all.sort_by_key(|task| task.id);
    Json(all)
}

async fn create_task(
    State(state): State<MockState>,
    Json(input): Json<CreateTask>,
) -> (StatusCode, Json<Task>) {
    let task = Task {
        id: state.take_id(),
        title: input.title,
        status: "NEW".to_string(),
        time_chunks_required: input.time_chunks_required,
        time_chunks_spent: 0,
        notes: input.notes,
    };
    state.inner.tasks.write().await.insert(task.id, task.clone());
    (StatusCode::CREATED, Json(task))
}

async fn get_task(
    State(state): State<MockState>,
    Path(id): Path<u64>,
) -> Result<Json<Task>, (StatusCode, Json<Value>)> {
    state.task(id).await.map(Json).ok_or_else(not_found)
}

async fn update_task(
    State(state): State<MockState>,
    Path(id): Path<u64>,
    Json(input): Json<UpdateTask>,
) -> Result<Json<Task>, (StatusCode, Json<Value>)> {
    let mut tasks = state.inner.tasks.write().await;
    let task = tasks.get_mut(&id).ok_or_else(not_found)?;
    if let Some(title) = input.title {
        task.title = title;
    }
    if let Some(status) = input.status {
        task.status = status;
    }
    if let Some(notes) = input.notes {
        task.notes = notes;
    }
    if let Some(chunks) = input.time_chunks_required {
        task.time_chunks_required = chunks;
    }
    Ok(Json(task.clone()))
}

async fn delete_task(
    State(state): State<MockState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    state
        .inner
        .tasks
        .write()
        .await
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(not_found)
}

async fn complete_task(
    State(state): State<MockState>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut tasks = state.inner.tasks.write().await;
    let task = tasks.get_mut(&id).ok_or_else(not_found)?;
    task.status = "COMPLETE".to_string();
    Ok(Json(json!({"taskOrHabit": task.clone(), "events": []})))
}

/// Work is logged in whole chunks; leftover minutes under one chunk are
/// discarded, as upstream does.
async fn log_work(
    State(state): State<MockState>,
    Path(id): Path<u64>,
    Query(query): Query<LogWorkQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut tasks = state.inner.tasks.write().await;
    let task = tasks.get_mut(&id).ok_or_else(not_found)?;
    task.time_chunks_spent += query.minutes / MINUTES_PER_CHUNK;
    if task.status == "NEW" {
        task.status = "IN_PROGRESS".to_string();
    }
    Ok(Json(json!({"taskOrHabit": task.clone(), "events": []})))
}

async fn list_events(
    State(state): State<MockState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<Event>> {
    let events = state.inner.events.read().await;
    let matching = events
        .iter()
        .filter(|event| {
            let date = event.event_start.get(..10).unwrap_or(&event.event_start);
            date >= query.start.as_str() && date <= query.end.as_str()
        })
        .cloned()
        .collect();
    Json(matching)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_serializes_with_camel_case_fields() {
        let task = Task {
            id: 7,
            title: "Quarterly report".to_string(),
            status: "SCHEDULED".to_string(),
            time_chunks_required: 8,
            time_chunks_spent: 2,
            notes: String::new(),
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["timeChunksRequired"], 8);
        assert_eq!(json["timeChunksSpent"], 2);
        assert!(json.get("time_chunks_required").is_none());
    }

    #[test]
    fn create_task_defaults_to_one_hour_and_empty_notes() {
        let input: CreateTask = serde_json::from_str(r#"{"title":"New"}"#).unwrap();
        assert_eq!(input.time_chunks_required, 4);
        assert!(input.notes.is_empty());
    }

    #[test]
    fn create_task_rejects_missing_title() {
        let result: Result<CreateTask, _> = serde_json::from_str(r#"{"notes":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn update_task_all_fields_optional() {
        let input: UpdateTask = serde_json::from_str("{}").unwrap();
        assert!(input.title.is_none());
        assert!(input.status.is_none());
        assert!(input.notes.is_none());
        assert!(input.time_chunks_required.is_none());
    }
}
