mod common;

use common::setup_test_app;
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

fn next_week() -> String {
    (chrono::Utc::now() + chrono::Duration::days(7)).to_rfc3339()
}

#[tokio::test]
async fn create_validate_redeem_flow() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;

    let client = reqwest::Client::new();
    let user_id = Uuid::new_v4();

    let res = client
        .post(format!("{}/vouchers", base_url))
        .json(&json!({
            "value": 10000,
            "max_uses": 1,
            "expires_at": next_week(),
            "code": "save100",
            "description": "Campaign voucher"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let voucher: serde_json::Value = res.json().await.unwrap();
    // Codes are normalized to uppercase on the way in.
    assert_eq!(voucher["code"], "SAVE100");

    let res = client
        .post(format!("{}/vouchers/validate", base_url))
        .json(&json!({ "code": "SAVE100", "user_id": user_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{}/vouchers/redeem", base_url))
        .json(&json!({ "code": "SAVE100", "user_id": user_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let redeemed: serde_json::Value = res.json().await.unwrap();
    assert_eq!(redeemed["used_count"], 1);
    assert_eq!(redeemed["redeemed"], true);

    // Second redeem of a single-use voucher is a conflict.
    let res = client
        .post(format!("{}/vouchers/redeem", base_url))
        .json(&json!({ "code": "SAVE100", "user_id": user_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn multi_use_voucher_counts_down_to_its_limit() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;

    let client = reqwest::Client::new();

    client
        .post(format!("{}/vouchers", base_url))
        .json(&json!({
            "value": 5000,
            "max_uses": 3,
            "expires_at": next_week(),
            "code": "TRIPLE"
        }))
        .send()
        .await
        .unwrap();

    for expected_count in 1..=3 {
        let res = client
            .post(format!("{}/vouchers/redeem", base_url))
            .json(&json!({ "code": "TRIPLE", "user_id": Uuid::new_v4() }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let voucher: serde_json::Value = res.json().await.unwrap();
        assert_eq!(voucher["used_count"], expected_count);
    }

    let res = client
        .post(format!("{}/vouchers/redeem", base_url))
        .json(&json!({ "code": "TRIPLE", "user_id": Uuid::new_v4() }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn bound_voucher_rejects_other_users() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;

    let client = reqwest::Client::new();
    let owner = Uuid::new_v4();

    client
        .post(format!("{}/vouchers", base_url))
        .json(&json!({
            "value": 50000,
            "max_uses": 1,
            "expires_at": next_week(),
            "code": "MINEONLY",
            "user_id": owner
        }))
        .send()
        .await
        .unwrap();

    let res = client
        .post(format!("{}/vouchers/redeem", base_url))
        .json(&json!({ "code": "MINEONLY", "user_id": Uuid::new_v4() }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .post(format!("{}/vouchers/redeem", base_url))
        .json(&json!({ "code": "MINEONLY", "user_id": owner }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_code_is_a_conflict() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;

    let client = reqwest::Client::new();
    let payload = json!({
        "value": 10000,
        "max_uses": 1,
        "expires_at": next_week(),
        "code": "DUPE"
    });

    let res = client
        .post(format!("{}/vouchers", base_url))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(format!("{}/vouchers", base_url))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_code_is_not_found() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;

    let res = reqwest::Client::new()
        .post(format!("{}/vouchers/validate", base_url))
        .json(&json!({ "code": "NOPE1234", "user_id": Uuid::new_v4() }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
