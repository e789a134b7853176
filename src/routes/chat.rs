//! Chat relay endpoint

use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use super::MessageResponse;
use crate::state::AppState;

/// Create the chat router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/publish", post(publish_message))
        .route("/publish/", post(publish_message))
}

#[derive(Debug, Deserialize)]
pub struct PublishParams {
    pub message: String,
    pub sender: String,
    #[serde(rename = "isOwner")]
    pub is_owner: bool,
}

/// Forward a chat message to the relay
///
/// Always acknowledges: the relay is fire-and-forget.
async fn publish_message(
    State(state): State<AppState>,
    Query(params): Query<PublishParams>,
) -> Json<MessageResponse> {
    state
        .gateway()
        .relay_message(params.message, params.sender, params.is_owner);

    Json(MessageResponse {
        message: "Message sent to broker.".to_string(),
    })
}
