//! HTTP API tests against the full router with a stub renderer

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use pagecast_server::relay::LocalRelay;
use pagecast_server::render::{RenderError, RenderPort, RenderResult};
use pagecast_server::routes;
use pagecast_server::state::AppState;
use pagecast_server::storage::DocumentStore;

const BOUNDARY: &str = "pagecast-test-boundary";

/// Every document has the same page count; page N renders as "page-N"
struct FixedRenderer(usize);

#[async_trait]
impl RenderPort for FixedRenderer {
    async fn page_count(&self, _path: &Path) -> RenderResult<usize> {
        Ok(self.0)
    }

    async fn render_page(&self, _path: &Path, index: usize) -> RenderResult<Vec<u8>> {
        if index >= self.0 {
            return Err(RenderError::PageOutOfRange {
                index,
                page_count: self.0,
            });
        }
        Ok(format!("page-{}", index).into_bytes())
    }
}

struct TestApp {
    router: Router,
    state: AppState,
    relay: LocalRelay,
    _dir: TempDir,
}

impl TestApp {
    fn new(pages: usize) -> Self {
        let dir = TempDir::new().unwrap();
        let relay = LocalRelay::new();
        let state = AppState::new(
            DocumentStore::new(dir.path()),
            Arc::new(FixedRenderer(pages)),
            Arc::new(relay.clone()),
            8,
        );
        Self {
            router: routes::router(state.clone()),
            state,
            relay,
            _dir: dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let (status, body) = self.get(uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post_empty(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::post(uri).body(Body::empty()).unwrap();
        let (status, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn upload(&self, filename: &str, data: &[u8]) -> (StatusCode, Value) {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        let (status, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new(1);
    let (status, body) = app.get_json("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_list_files_empty_then_sorted() {
    let app = TestApp::new(2);
    let (status, body) = app.get_json("/files").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "files": [] }));

    app.upload("b.pdf", b"%PDF-b").await;
    app.upload("a.pdf", b"%PDF-a").await;

    let (_, body) = app.get_json("/files").await;
    assert_eq!(body, json!({ "files": ["a.pdf", "b.pdf"] }));
}

#[tokio::test]
async fn test_upload_rejects_non_pdf() {
    let app = TestApp::new(2);
    let (status, body) = app.upload("notes.txt", b"hello").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_file_type");
    assert_eq!(app.state.gateway().current_snapshot().total_pages, 0);
}

#[tokio::test]
async fn test_start_unknown_file_is_not_found() {
    let app = TestApp::new(2);
    let (status, body) = app.post_empty("/start/missing.pdf").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_start_existing_file() {
    let app = TestApp::new(4);
    app.upload("deck.pdf", b"%PDF").await;
    app.post_json("/page/", json!({ "page_number": 3 })).await;

    let (status, body) = app.post_empty("/start/deck.pdf").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Started streaming deck.pdf");
    assert_eq!(app.state.gateway().current_snapshot().current_page, 0);
}

#[tokio::test]
async fn test_page_commands_without_document() {
    let app = TestApp::new(2);

    let (status, body) = app.post_json("/page/", json!({ "page_number": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "no_document_loaded");

    let (status, _) = app.get("/current_page").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/current_file").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_presentation_scenario() {
    let app = TestApp::new(10);

    let (status, body) = app.upload("sample.pdf", b"%PDF-sample").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "filename": "sample.pdf" }));

    let mut viewer = app.state.gateway().connect_viewer();
    let first: Value = serde_json::from_str(&viewer.receiver.recv().await.unwrap()).unwrap();
    assert_eq!(
        first,
        json!({ "current_page": 0, "total_pages": 10, "filename": "sample.pdf", "users": 1 })
    );

    let (status, body) = app.post_json("/page/", json!({ "page_number": 5 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Page changed to 5");
    let pushed: Value = serde_json::from_str(&viewer.receiver.recv().await.unwrap()).unwrap();
    assert_eq!(pushed["current_page"], 5);

    let (status, body) = app.post_json("/page/", json!({ "page_number": 10 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_page");
    let (status, _) = app.post_json("/page", json!({ "page_number": -1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(viewer.receiver.try_recv().is_err());

    let (_, users) = app.get_json("/users").await;
    assert_eq!(users, json!({ "connected_users": 1 }));

    let (status, page) = app.get("/current_page").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page, b"page-5");

    let (status, file) = app.get("/current_file").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(file, b"%PDF-sample");

    app.state.gateway().disconnect_viewer(viewer.handle);
    let (_, users) = app.get_json("/users").await;
    assert_eq!(users, json!({ "connected_users": 0 }));
}

#[tokio::test]
async fn test_document_stream_concatenates_pages() {
    let app = TestApp::new(3);
    app.upload("deck.pdf", b"%PDF").await;

    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"page-0page-1page-2");
}

#[tokio::test]
async fn test_publish_is_relayed() {
    let app = TestApp::new(1);
    let mut rx = app.relay.subscribe();

    let (status, body) = app
        .post_empty("/publish/?message=hello%20all&sender=ana&isOwner=true")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Message sent to broker.");

    let msg = rx.recv().await.unwrap();
    assert_eq!(msg.body, "hello all");
    assert_eq!(msg.sender, "ana");
    assert!(msg.is_owner);
}
