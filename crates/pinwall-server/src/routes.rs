use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use pinwall_store::{BlobStore, ErrorKind, Store, StoreError};
use pinwall_types::api::{
    CreateBoard, CreateNote, CreateWorkspace, Page, UpdateBoard, UpdateNote, UpdateWorkspace,
};
use pinwall_types::models::{Board, Note, Workspace};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub blobs: Arc<BlobStore>,
}

/// Store failures mapped onto HTTP: the error code and message go to the
/// client as JSON, the source chain goes to the log.
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError(err) = self;
        let status = match err.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Corrupt => StatusCode::BAD_REQUEST,
            ErrorKind::Database | ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({
            "error": err.code(),
            "message": err.message(),
        });
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {:#}", anyhow::Error::from(err));
        }
        (status, Json(body)).into_response()
    }
}

// -- Workspaces --

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub owner: String,
}

pub async fn list_workspaces(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<Workspace>>, ApiError> {
    Ok(Json(state.store.workspaces().list(&query.owner).await?))
}

pub async fn create_workspace(
    State(state): State<AppState>,
    Json(req): Json<CreateWorkspace>,
) -> Result<impl IntoResponse, ApiError> {
    let ws = state.store.workspaces().create(req).await?;
    Ok((StatusCode::CREATED, Json(ws)))
}

pub async fn update_workspace(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateWorkspace>,
) -> Result<StatusCode, ApiError> {
    state.store.workspaces().update(id, req).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_workspace(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.workspaces().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -- Boards --

#[derive(Debug, Deserialize)]
pub struct BoardQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub cursor: Option<String>,
}

fn default_limit() -> usize {
    pinwall_store::Boards::DEFAULT_PAGE_SIZE
}

pub async fn list_boards(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<BoardQuery>,
) -> Result<Json<Page<Board>>, ApiError> {
    let page = state
        .store
        .boards()
        .list(id, query.limit, query.cursor)
        .await?;
    Ok(Json(page))
}

pub async fn create_board(
    State(state): State<AppState>,
    Json(req): Json<CreateBoard>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state.store.boards().create(req).await?;
    Ok((StatusCode::CREATED, Json(board)))
}

pub async fn get_board(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Board>, ApiError> {
    Ok(Json(state.store.boards().get(id).await?))
}

pub async fn update_board(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBoard>,
) -> Result<StatusCode, ApiError> {
    state.store.boards().update(id, req).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_board(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.boards().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -- Notes --

pub async fn list_notes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Note>>, ApiError> {
    Ok(Json(state.store.notes().list(id).await?))
}

pub async fn create_note(
    State(state): State<AppState>,
    Json(req): Json<CreateNote>,
) -> Result<impl IntoResponse, ApiError> {
    let note = state.store.notes().create(req).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateNote>,
) -> Result<StatusCode, ApiError> {
    state.store.notes().update(id, req).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.notes().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -- Blobs --

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

/// Store an image for a note. The returned key is what the client writes
/// into the note's `images` list; the URL is where it fetches it back.
pub async fn upload_note_image(
    State(state): State<AppState>,
    Path((board_id, note_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let key =
        pinwall_store::note_image_key(board_id, note_id, chrono::Utc::now(), &query.filename);
    state.blobs.upload(&key, &body).await?;
    let url = state.blobs.url(&key);
    Ok((StatusCode::CREATED, Json(json!({ "key": key, "url": url }))))
}

/// Store a background image for a board. The client writes the returned
/// key into the board's `background_image` field.
pub async fn upload_background(
    State(state): State<AppState>,
    Path(board_id): Path<Uuid>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let key = pinwall_store::board_background_key(board_id, chrono::Utc::now(), &query.filename);
    state.blobs.upload(&key, &body).await?;
    let url = state.blobs.url(&key);
    Ok((StatusCode::CREATED, Json(json!({ "key": key, "url": url }))))
}

pub async fn download_blob(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let data = state.blobs.download(&key).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        data,
    ))
}

pub async fn delete_blob(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.blobs.delete(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}
