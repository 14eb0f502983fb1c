mod common;

use common::setup_test_app;
use reqwest::StatusCode;

#[tokio::test]
async fn health_reports_connected_db_and_closed_circuit() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;

    let res = reqwest::Client::new()
        .get(format!("{}/health", base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let health: serde_json::Value = res.json().await.unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["db"], "connected");
    assert_eq!(health["gateway_circuit"], "closed");
    assert!(health["version"].is_string());
}
