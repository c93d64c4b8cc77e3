use flare_core::ShutdownManager;
use flare_infrastructure::{serve_status, status_router};
use serde_json::Value;
use tokio::net::TcpListener;

#[tokio::test]
async fn test_health_and_disabled_metrics() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownManager::new();

    let server = tokio::spawn(serve_status(
        listener,
        status_router(None),
        shutdown.subscribe(),
    ));

    let client = reqwest::Client::new();
    let health: Value = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["service"], "flare-orchestrator");

    let metrics = client
        .get(format!("http://{addr}/metrics"))
        .send()
        .await
        .unwrap();
    assert_eq!(metrics.status(), reqwest::StatusCode::NOT_FOUND);

    drop(client);
    shutdown.shutdown();
    server.await.unwrap().unwrap();
}
