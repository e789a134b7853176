//! Document routes
//!
//! Listing, uploading and starting a presentation, plus the raw current file.

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use super::MessageResponse;
use crate::state::AppState;

/// Largest accepted upload
const MAX_UPLOAD_SIZE: usize = 200 * 1024 * 1024;

/// Create the documents router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/files", get(list_files))
        .route("/upload", post(upload_document))
        .route("/upload/", post(upload_document))
        .route("/start/:filename", post(start_session))
        .route("/current_file", get(current_file))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
}

#[derive(Serialize)]
pub struct FileList {
    pub files: Vec<String>,
}

#[derive(Serialize)]
pub struct FileUpload {
    pub filename: String,
}

/// List stored documents
async fn list_files(State(state): State<AppState>) -> Result<Json<FileList>> {
    let files = state.gateway().list_documents().await?;
    Ok(Json(FileList { files }))
}

/// Upload a PDF and present it from the first page
async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<FileUpload>> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read upload: {}", e))
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file data: {}", e)))?;

        tracing::debug!(file_name = %filename, size = data.len(), "Received upload");

        let handle = state.gateway().upload_document(&filename, &data).await?;
        return Ok(Json(FileUpload {
            filename: handle.name,
        }));
    }

    Err(AppError::BadRequest("Missing 'file' field".to_string()))
}

/// Present a document that is already stored
async fn start_session(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<MessageResponse>> {
    let handle = state.gateway().start_session(&filename).await?;
    Ok(Json(MessageResponse {
        message: format!("Started streaming {}", handle.name),
    }))
}

/// Serve the PDF currently being presented
async fn current_file(State(state): State<AppState>) -> Result<Response> {
    let (name, data) = state.gateway().current_document().await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, data.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", name),
        )
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(e.to_string()))
}
