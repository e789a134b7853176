//! Viewer routes
//!
//! The push channel and the viewer count. A viewer connection moves through
//! Connected → Disconnected exactly once: whatever ends the socket (close
//! frame, read error, end of stream) leads to the same disconnect call.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;

use crate::session::ViewerConnection;
use crate::state::AppState;

/// Text frame a viewer sends to pull the current snapshot
pub const GET_INFO: &str = "get_info";

/// Create the viewers router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(viewer_count))
        .route("/ws", get(ws_handler))
}

#[derive(Serialize)]
pub struct UsersResponse {
    pub connected_users: usize,
}

async fn viewer_count(State(state): State<AppState>) -> Json<UsersResponse> {
    Json(UsersResponse {
        connected_users: state.gateway().viewer_count(),
    })
}

/// WebSocket upgrade handler
///
/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_viewer(socket, state))
}

/// What an inbound frame means for the connection
#[derive(Debug, PartialEq, Eq)]
enum Inbound {
    GetInfo,
    Ignore,
    Closed,
}

fn classify(frame: Result<Message, axum::Error>) -> Inbound {
    match frame {
        Ok(Message::Text(text)) if text.trim() == GET_INFO => Inbound::GetInfo,
        Ok(Message::Close(_)) => Inbound::Closed,
        Ok(_) => Inbound::Ignore,
        Err(e) => {
            tracing::debug!("Viewer socket error: {}", e);
            Inbound::Closed
        }
    }
}

async fn handle_viewer(socket: WebSocket, state: AppState) {
    let (mut sink, mut frames) = socket.split();
    let ViewerConnection {
        handle,
        mut receiver,
    } = state.gateway().connect_viewer();

    // Dedicated writer: a stalled socket only holds up this viewer's queue.
    // When a write fails the task ends and drops the queue, which the next
    // broadcast treats as a failed delivery.
    let writer = tokio::spawn(async move {
        while let Some(text) = receiver.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = frames.next().await {
        match classify(frame) {
            Inbound::GetInfo => {
                state.gateway().request_info(handle);
            }
            Inbound::Ignore => {}
            Inbound::Closed => break,
        }
    }

    state.gateway().disconnect_viewer(handle);
    writer.abort();
}
