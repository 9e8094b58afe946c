use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chemviz::{router, AppState};
use chemviz_core::history::{
    HistoryEntry, HistoryError, HistoryRecord, HistoryStore, InMemoryHistoryStore,
};
use chrono_tz::Tz;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "chemviz-test-boundary";

fn fixture(name: &str) -> Vec<u8> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../chemviz-parser/tests/data")
        .join(name);
    std::fs::read(path).expect("read fixture")
}

fn app_with(store: Arc<dyn HistoryStore>) -> Router {
    router(Arc::new(AppState::new(store, Tz::UTC)), 1024 * 1024)
}

fn app_with_limit(max_upload_bytes: usize) -> Router {
    let store = Arc::new(InMemoryHistoryStore::new());
    router(Arc::new(AppState::new(store, Tz::UTC)), max_upload_bytes)
}

fn app() -> Router {
    app_with(Arc::new(InMemoryHistoryStore::new()))
}

fn multipart_upload(uri: &str, field: &str, filename: &str, contents: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: text/csv\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

struct UnavailableStore;

#[async_trait]
impl HistoryStore for UnavailableStore {
    async fn append(&self, _entry: HistoryEntry) -> Result<HistoryRecord, HistoryError> {
        Err(HistoryError::Unavailable("connection refused".to_string()))
    }

    async fn list_recent(&self, _limit: usize) -> Result<Vec<HistoryRecord>, HistoryError> {
        Err(HistoryError::Unavailable("connection refused".to_string()))
    }

    async fn count(&self) -> Result<usize, HistoryError> {
        Err(HistoryError::Unavailable("connection refused".to_string()))
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn upload_returns_summary_and_raw_rows() {
    let app = app();
    let request = multipart_upload(
        "/api/upload/",
        "file",
        "sample_equipment_data.csv",
        &fixture("sample_equipment_data.csv"),
    );

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::CREATED);
    let summary = &body["summary"];
    assert_eq!(summary["total_count"], 6);
    assert_eq!(summary["avg_flowrate"], 103.67);
    assert_eq!(summary["avg_pressure"], 5.63);
    assert_eq!(summary["avg_temperature"], 110.0);
    assert_eq!(summary["type_distribution"]["Pump"], 2);
    assert_eq!(summary["type_distribution"]["HeatExchanger"], 1);

    let rows = body["raw_data"].as_array().unwrap();
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0]["Equipment Name"], "Pump-1");
    assert_eq!(rows[0]["Type"], "Pump");
    assert_eq!(rows[0]["Flowrate"], 120.0);
    assert_eq!(rows[0]["Pressure"], 5.2);
}

#[tokio::test]
async fn raw_rows_distinguish_absent_from_sanitized() {
    let app = app();
    let request = multipart_upload(
        "/api/upload",
        "file",
        "dirty.csv",
        &fixture("dirty_equipment_data.csv"),
    );

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::CREATED);
    let first = &body["raw_data"][0];
    assert_eq!(first["Pressure"], 0.0);
    assert_eq!(first["Temperature"], Value::Null);
    assert_eq!(first["Notes"], "inspected");
    assert_eq!(body["summary"]["avg_temperature"], 60.0);
}

#[tokio::test]
async fn missing_columns_are_a_client_error() {
    let app = app();
    let request = multipart_upload(
        "/api/upload/",
        "file",
        "missing_pressure.csv",
        &fixture("missing_pressure.csv"),
    );

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": "Invalid CSV format. Missing columns: Pressure" })
    );
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let app = app();
    let request = multipart_upload("/api/upload/", "attachment", "x.csv", b"a,b\n1,2\n");

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No file uploaded" }));
}

#[tokio::test]
async fn non_multipart_upload_is_rejected() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload/")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file uploaded");
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let app = app_with_limit(64);
    let request = multipart_upload(
        "/api/upload/",
        "file",
        "sample_equipment_data.csv",
        &fixture("sample_equipment_data.csv"),
    );

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].as_str().is_some_and(|msg| !msg.is_empty()));

    let request = Request::builder()
        .uri("/api/history/")
        .body(Body::empty())
        .unwrap();
    let (_, history) = send(&app, request).await;
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn history_lists_five_newest_uploads() {
    let app = app();
    let contents = fixture("sample_equipment_data.csv");
    for idx in 0..6 {
        let request = multipart_upload("/api/upload/", "file", &format!("run_{idx}.csv"), &contents);
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let request = Request::builder()
        .uri("/api/history/")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 5);
    assert_eq!(items[0]["filename"], "run_5.csv");
    assert_eq!(items[4]["filename"], "run_1.csv");
    assert_eq!(items[0]["total"], 6);
    assert_eq!(items[0]["avg_temp"], 110.0);
    assert!(items[0]["date"].as_str().is_some_and(|date| date.contains(", ")));

    let request = Request::builder()
        .uri("/api/history")
        .body(Body::empty())
        .unwrap();
    let (status, without_slash) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(without_slash, body);
}

#[tokio::test]
async fn storage_failures_are_server_errors() {
    let app = app_with(Arc::new(UnavailableStore));

    let request = multipart_upload(
        "/api/upload/",
        "file",
        "sample.csv",
        &fixture("sample_equipment_data.csv"),
    );
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("Server Error:"));

    let request = Request::builder()
        .uri("/api/history/")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
