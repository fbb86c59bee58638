use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::{Body, BodyDataStream, Bytes};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::event::{ByteStream, FileMetadata, NotHandled};
use crate::tree::TreeError;
use crate::widget::{WidgetId, WireNode};

use super::error::ServerError;
use super::sessions::SessionManager;
use super::shutdown::ShutdownManager;

/// Shared state of every route.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub shutdown: Arc<ShutdownManager>,
    pub event_timeout: Duration,
}

impl AppState {
    pub fn new(sessions: Arc<SessionManager>, shutdown: Arc<ShutdownManager>) -> Self {
        let event_timeout = Duration::from_millis(sessions.config().session.event_timeout_ms);
        Self {
            sessions,
            shutdown,
            event_timeout,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/hot-reload", post(hot_reload_all))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", delete(delete_session))
        .route("/sessions/{id}/tree", get(get_tree))
        .route("/sessions/{id}/events", post(post_event))
        .route("/sessions/{id}/refresh", post(refresh_session))
        .route("/sessions/{id}/refresh/{widget_id}", post(refresh_widget))
        .route("/sessions/{id}/upload/{widget_id}/{event}", post(upload))
        .route("/sessions/{id}/hot-reload", post(hot_reload_session))
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub session_id: Uuid,
    pub tree: WireNode,
}

/// Client to server event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub widget_id: WidgetId,
    pub event_name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub handled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<NotHandled>,
    pub patches: Vec<WireNode>,
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": if state.shutdown.is_shutting_down() { "stopping" } else { "healthy" },
        "service": "tether",
        "sessions": state.sessions.len(),
    }))
}

async fn create_session(State(state): State<AppState>) -> Result<Json<SessionCreated>, ServerError> {
    if state.shutdown.is_shutting_down() {
        return Err(ServerError::ShuttingDown);
    }
    let sessions = state.sessions.clone();
    let (tree, wire) =
        with_deadline(state.event_timeout, |cancel| async move { sessions.create(&cancel).await })
            .await?;
    Ok(Json(SessionCreated {
        session_id: tree.session_id(),
        tree: wire,
    }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServerError> {
    state.sessions.remove(&id).await?;
    Ok(Json(json!({ "closed": id })))
}

async fn get_tree(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WireNode>, ServerError> {
    let tree = state.sessions.get(&id)?;
    Ok(Json(tree.snapshot().await?))
}

async fn post_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<EventRequest>, JsonRejection>,
) -> Result<Json<EventResponse>, ServerError> {
    let Json(request) = payload.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let tree = state.sessions.get(&id)?;

    with_deadline(state.event_timeout, |cancel| async move {
        let dispatch = tree
            .trigger_event(&request.widget_id, &request.event_name, &request.args, &cancel)
            .await?;
        let patches = if dispatch.is_handled() {
            tree.refresh_dirty(&cancel).await?
        } else {
            Vec::new()
        };
        Ok(Json(EventResponse {
            handled: dispatch.is_handled(),
            reason: dispatch.reason(),
            patches,
        }))
    })
    .await
}

/// Patches for views whose state changed outside of an event, e.g. from a
/// timer or a background task.
async fn refresh_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServerError> {
    let tree = state.sessions.get(&id)?;
    with_deadline(state.event_timeout, |cancel| async move {
        let patches = tree.refresh_dirty(&cancel).await?;
        Ok(Json(json!({ "patches": patches })))
    })
    .await
}

async fn refresh_widget(
    State(state): State<AppState>,
    Path((id, widget_id)): Path<(String, String)>,
) -> Result<Json<WireNode>, ServerError> {
    let tree = state.sessions.get(&id)?;
    let widget_id = WidgetId::new(widget_id);
    with_deadline(state.event_timeout, |cancel| async move {
        Ok(Json(tree.refresh_view(&widget_id, &cancel).await?))
    })
    .await
}

async fn upload(
    State(state): State<AppState>,
    Path((id, widget_id, event)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<EventResponse>, ServerError> {
    let tree = state.sessions.get(&id)?;
    let meta = file_metadata(&headers)?;
    let stream: ByteStream = Box::pin(IoStream(body.into_data_stream()));
    let widget_id = WidgetId::new(widget_id);

    with_deadline(state.event_timeout, |cancel| async move {
        let dispatch = tree.upload(&widget_id, &event, meta, stream, &cancel).await?;
        let patches = if dispatch.is_handled() {
            tree.refresh_dirty(&cancel).await?
        } else {
            Vec::new()
        };
        Ok(Json(EventResponse {
            handled: dispatch.is_handled(),
            reason: dispatch.reason(),
            patches,
        }))
    })
    .await
}

async fn hot_reload_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WireNode>, ServerError> {
    let tree = state.sessions.get(&id)?;
    with_deadline(state.event_timeout, |cancel| async move {
        Ok(Json(tree.hot_reload(&cancel).await?))
    })
    .await
}

async fn hot_reload_all(State(state): State<AppState>) -> Json<Value> {
    let cancel = CancellationToken::new();
    let results = state.sessions.hot_reload_all(&cancel).await;
    let failed: Vec<String> = results
        .iter()
        .filter(|(_, result)| result.is_err())
        .map(|(id, _)| id.to_string())
        .collect();
    Json(json!({
        "reloaded": results.len() - failed.len(),
        "failed": failed,
    }))
}

fn file_metadata(headers: &HeaderMap) -> Result<FileMetadata, ServerError> {
    let text = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    let name = text("x-file-name")
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ServerError::InvalidRequest("missing x-file-name header".to_string()))?;
    Ok(FileMetadata {
        name,
        content_type: text(header::CONTENT_TYPE.as_str()),
        size: text(header::CONTENT_LENGTH.as_str()).and_then(|len| len.parse().ok()),
    })
}

/// Run `op` with a token that is cancelled when `timeout` elapses.
///
/// The token is also cancelled if the request itself is dropped.
async fn with_deadline<T, F, Fut>(timeout: Duration, op: F) -> Result<T, ServerError>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, ServerError>>,
{
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let timer = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            cancel.cancel();
        })
    };

    let result = op(cancel.clone()).await;
    timer.abort();

    match result {
        Err(ServerError::Tree(TreeError::Cancelled)) if cancel.is_cancelled() => {
            Err(ServerError::Timeout {
                duration_ms: timeout.as_millis() as u64,
            })
        }
        other => other,
    }
}

/// Request body as a stream of byte chunks with I/O errors.
struct IoStream(BodyDataStream);

impl Stream for IoStream {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.0)
            .poll_next(cx)
            .map(|chunk| chunk.map(|chunk| chunk.map_err(io::Error::other)))
    }
}
