use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use flare_core::{config::JobsApiConfig, models::Job, FlareError, JobsApi};
use flare_infrastructure::HttpJobsApi;
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct FakeJobsApi {
    filters: Arc<Mutex<Vec<String>>>,
    patches: Arc<Mutex<Vec<(String, Value)>>>,
}

async fn list_nodes(
    State(state): State<FakeJobsApi>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let filter = params.get("filter").cloned().unwrap_or_default();
    state.filters.lock().unwrap().push(filter);

    Json(json!([
        {"id": "n1", "jobId": "job1", "name": "node-1", "running": false,
         "totalSuccessfulConnections": 1000, "totalFailedConnections": 0, "totalDroppedConnections": 2},
        {"id": "n2", "jobId": "job1",
         "totalSuccessfulConnections": 1000, "totalFailedConnections": 5, "totalDroppedConnections": 0},
        {"id": "n3", "jobId": "job1"}
    ]))
}

async fn update_job(
    State(state): State<FakeJobsApi>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    if id == "missing" {
        return StatusCode::NOT_FOUND;
    }
    state.patches.lock().unwrap().push((id, body));
    StatusCode::NO_CONTENT
}

async fn start_fake() -> (String, FakeJobsApi) {
    let state = FakeJobsApi::default();
    let app = Router::new()
        .route("/nodes", get(list_nodes))
        .route("/jobs/{id}", patch(update_job))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/"), state)
}

fn client(base_url: String) -> HttpJobsApi {
    HttpJobsApi::new(&JobsApiConfig {
        base_url,
        request_timeout_seconds: 5,
    })
    .unwrap()
}

fn job(id: &str) -> Job {
    serde_json::from_value(json!({
        "id": id,
        "createdAt": "2024-03-01T10:00:00Z",
        "userId": "user1",
        "taskId": "task1",
        "isRunning": true,
        "passed": false,
        "label": "nightly"
    }))
    .unwrap()
}

#[tokio::test]
async fn test_get_nodes_sends_job_filter() {
    let (base_url, state) = start_fake().await;
    let api = client(base_url);
    assert!(!api.base_url().ends_with('/'));

    let nodes = api.get_nodes("job1").await.unwrap();

    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0].total_successful_connections, 1000);
    assert_eq!(nodes[0].total_dropped_connections, 2);
    assert_eq!(nodes[2].total_successful_connections, 0);

    let filters = state.filters.lock().unwrap().clone();
    assert_eq!(filters.len(), 1);
    let filter: Value = serde_json::from_str(&filters[0]).unwrap();
    assert_eq!(filter, json!({"where": {"jobId": "job1"}}));
}

#[tokio::test]
async fn test_update_job_patches_full_record() {
    let (base_url, state) = start_fake().await;
    let api = client(base_url);

    api.update_job(&job("job1").with_verdict(true)).await.unwrap();

    let patches = state.patches.lock().unwrap().clone();
    assert_eq!(patches.len(), 1);
    let (id, body) = &patches[0];
    assert_eq!(id, "job1");
    assert_eq!(body["passed"], json!(true));
    assert_eq!(body["isRunning"], json!(false));
    assert_eq!(body["userId"], json!("user1"));
    assert_eq!(body["label"], json!("nightly"));
}

#[tokio::test]
async fn test_update_job_encodes_id_as_one_segment() {
    let (base_url, state) = start_fake().await;
    let api = client(base_url);

    api.update_job(&job("team/a b")).await.unwrap();

    let patches = state.patches.lock().unwrap().clone();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].0, "team/a b");
    assert_eq!(patches[0].1["id"], json!("team/a b"));
}

#[test]
fn test_invalid_base_url_is_rejected() {
    let result = HttpJobsApi::new(&JobsApiConfig {
        base_url: "not a url".to_string(),
        request_timeout_seconds: 5,
    });
    assert!(matches!(result, Err(FlareError::Configuration(_))));
}

#[tokio::test]
async fn test_update_job_error_status() {
    let (base_url, _state) = start_fake().await;
    let api = client(base_url);

    let err = api.update_job(&job("missing")).await.unwrap_err();
    assert!(matches!(err, FlareError::JobsApi(_)));
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn test_unreachable_api() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = client(format!("http://{addr}"));
    let err = api.get_nodes("job1").await.unwrap_err();
    assert!(matches!(err, FlareError::JobsApi(_)));
}
