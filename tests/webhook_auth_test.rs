mod common;

use common::{setup_test_app, sign_webhook};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn webhook_without_signature_is_unauthorized() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;

    let res = reqwest::Client::new()
        .post(format!("{}/webhooks/gateway", base_url))
        .header("content-type", "application/json")
        .body(json!({ "source_id": "src_test_1" }).to_string())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_with_wrong_signature_is_unauthorized() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;

    let body = json!({ "source_id": "src_test_1" }).to_string();
    let res = reqwest::Client::new()
        .post(format!("{}/webhooks/gateway", base_url))
        .header("x-gateway-signature", sign_webhook(b"different body"))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signed_webhook_for_unknown_source_is_not_found() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;

    let body = json!({ "source_id": "src_missing" }).to_string();
    let res = reqwest::Client::new()
        .post(format!("{}/webhooks/gateway", base_url))
        .header("x-gateway-signature", sign_webhook(body.as_bytes()))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_utf8_body_is_authenticated_before_decoding() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;
    let client = reqwest::Client::new();

    let body: Vec<u8> = vec![0xff, 0xfe, 0x00, 0x01];

    // Unsigned garbage bytes must fail auth, not body decoding.
    let res = client
        .post(format!("{}/webhooks/gateway", base_url))
        .body(body.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Correctly signed but unparseable bytes make it past auth and fail as a
    // payload error.
    let res = client
        .post(format!("{}/webhooks/gateway", base_url))
        .header("x-gateway-signature", sign_webhook(&body))
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
