//! Page routes
//!
//! Rendering of the presented document and page changes.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use futures::TryStreamExt;
use serde::Deserialize;

use crate::error::{AppError, Result};
use super::MessageResponse;
use crate::state::AppState;

/// Create the pages router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(stream_document))
        .route("/current_page", get(current_page))
        .route("/page", post(change_page))
        .route("/page/", post(change_page))
}

#[derive(Debug, Deserialize)]
pub struct PageNumber {
    pub page_number: i64,
}

/// Every page of the current document, rendered and concatenated in order
async fn stream_document(State(state): State<AppState>) -> Result<Response> {
    let pages = state
        .gateway()
        .render_document()
        .await?
        .map_ok(Bytes::from);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from_stream(pages))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// The page currently being presented, as PNG
async fn current_page(State(state): State<AppState>) -> Result<Response> {
    let data = state.gateway().render_current_page().await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/png")
        .header(header::CONTENT_LENGTH, data.len())
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Move every viewer to another page
async fn change_page(
    State(state): State<AppState>,
    Json(page): Json<PageNumber>,
) -> Result<Json<MessageResponse>> {
    state.gateway().change_page(page.page_number)?;
    Ok(Json(MessageResponse {
        message: format!("Page changed to {}", page.page_number),
    }))
}
