use std::path::Path;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::services::ServeDir;

use crate::backup::{BackupError, BackupRotator, SnapshotEntry};
use crate::models::Document;
use crate::storage::{StoreError, TaskStore};

pub const MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;
pub const SAVED_MESSAGE: &str = "Tasks saved successfully";
pub const LOAD_FAILED: &str = "Failed to load tasks";
pub const SAVE_FAILED: &str = "Failed to save tasks";
pub const BACKUP_LIST_FAILED: &str = "Failed to read backups";
pub const BACKUP_RESTORE_FAILED: &str = "Failed to restore backup";

/// Success acknowledgement for a replace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ack {
    pub message: String,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("load failed: {0}")]
    Load(#[source] StoreError),
    #[error("save failed: {0}")]
    Save(#[source] StoreError),
    #[error("request body is not a task document: {0}")]
    InvalidDocument(#[source] serde_json::Error),
    #[error(transparent)]
    Backup(#[from] BackupError),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Load(_) => (StatusCode::INTERNAL_SERVER_ERROR, LOAD_FAILED.to_string()),
            ApiError::Save(_) => (StatusCode::INTERNAL_SERVER_ERROR, SAVE_FAILED.to_string()),
            ApiError::InvalidDocument(err) => {
                (StatusCode::BAD_REQUEST, format!("Invalid task document: {err}"))
            }
            ApiError::Backup(BackupError::InvalidName(name)) => {
                (StatusCode::BAD_REQUEST, format!("Invalid backup name: {name}"))
            }
            ApiError::Backup(BackupError::NotFound(name)) => {
                (StatusCode::NOT_FOUND, format!("Backup not found: {name}"))
            }
            ApiError::Backup(BackupError::Enumerate { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                BACKUP_LIST_FAILED.to_string(),
            ),
            ApiError::Backup(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                BACKUP_RESTORE_FAILED.to_string(),
            ),
            ApiError::Join(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_message();
        if status.is_server_error() {
            log::error!("{self}");
        } else {
            log::warn!("{self}");
        }
        (status, Json(ErrorBody { error })).into_response()
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: TaskStore,
    pub rotator: BackupRotator,
}

impl AppState {
    pub fn new(store: TaskStore, rotator: BackupRotator) -> Self {
        Self { store, rotator }
    }
}

pub fn create_router(state: Arc<AppState>, public_dir: &Path) -> Router {
    Router::new()
        .route("/tasks", get(get_tasks).put(put_tasks))
        .route("/backups", get(list_backups))
        .route("/backups/{name}/restore", post(restore_backup))
        .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES))
        .fallback_service(ServeDir::new(public_dir))
        .with_state(state)
}

async fn get_tasks(State(state): State<Arc<AppState>>) -> Result<Json<Document>, ApiError> {
    let store = state.store.clone();
    let document = tokio::task::spawn_blocking(move || store.load())
        .await?
        .map_err(ApiError::Load)?;
    Ok(Json(document))
}

async fn put_tasks(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Ack>, ApiError> {
    let document: Document = serde_json::from_slice(&body).map_err(ApiError::InvalidDocument)?;
    let task_count = document.tasks.len();
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || store.replace(&document))
        .await?
        .map_err(ApiError::Save)?;
    log::debug!("task document replaced tasks={task_count}");
    Ok(Json(Ack {
        message: SAVED_MESSAGE.to_string(),
    }))
}

async fn list_backups(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SnapshotEntry>>, ApiError> {
    let rotator = state.rotator.clone();
    let list = tokio::task::spawn_blocking(move || rotator.list()).await??;
    Ok(Json(list))
}

async fn restore_backup(
    State(state): State<Arc<AppState>>,
    UrlPath(name): UrlPath<String>,
) -> Result<Json<Document>, ApiError> {
    let rotator = state.rotator.clone();
    let document = tokio::task::spawn_blocking(move || rotator.restore(&name)).await??;
    Ok(Json(document))
}
