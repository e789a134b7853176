//! Route modules for Pagecast Server

pub mod chat;
pub mod documents;
pub mod health;
pub mod pages;
pub mod viewers;

use axum::Router;
use serde::Serialize;

use crate::state::AppState;

/// Build the full application router
///
/// Paths match the ones the viewer client already calls; the trailing-slash
/// forms are accepted alongside the bare ones.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .merge(documents::router())
        .merge(pages::router())
        .merge(viewers::router())
        .merge(chat::router())
        .with_state(state)
}

/// Plain confirmation body
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}
