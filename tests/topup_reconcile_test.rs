mod common;

use common::{setup_test_app, sign_webhook};
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

async fn seed_bonus_tiers(pool: &sqlx::PgPool) {
    sqlx::query(
        r#"
        INSERT INTO wallet_config (id, min_topup_amount, bonus_tiers, updated_at)
        VALUES (gen_random_uuid(), 10000, $1, NOW())
        "#,
    )
    .bind(json!([
        { "min_amount": 50000, "bonus": 5000 },
        { "min_amount": 100000, "bonus": 15000 }
    ]))
    .execute(pool)
    .await
    .unwrap();
}

#[tokio::test]
async fn webhook_then_poll_credits_exactly_once() {
    let mut server = mockito::Server::new_async().await;
    let (base_url, pool, _container) = setup_test_app(&server.url()).await;
    seed_bonus_tiers(&pool).await;

    let client = reqwest::Client::new();
    let user_id = Uuid::new_v4();

    let _create_source = server
        .mock("POST", "/sources")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"data":{"id":"src_test_1","attributes":{"status":"pending","redirect":{"checkout_url":"https://checkout.example.test/src_test_1"}}}}"#,
        )
        .create_async()
        .await;

    let res = client
        .post(format!("{}/wallets/{}/topups", base_url, user_id))
        .json(&json!({ "amount": 50000, "ewallet_type": "gcash" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let initiated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(initiated["source_id"], "src_test_1");
    assert!(initiated["checkout_url"].as_str().unwrap().contains("src_test_1"));

    // Gateway confirms the source is chargeable; capture must happen once.
    let get_source = server
        .mock("GET", "/sources/src_test_1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"data":{"id":"src_test_1","attributes":{"status":"chargeable","redirect":null}}}"#,
        )
        .expect(1)
        .create_async()
        .await;
    let create_payment = server
        .mock("POST", "/payments")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":{"id":"pay_test_1","attributes":{"status":"paid","redirect":null}}}"#)
        .expect(1)
        .create_async()
        .await;

    let body = json!({ "source_id": "src_test_1", "status": "chargeable" }).to_string();
    let res = client
        .post(format!("{}/webhooks/gateway", base_url))
        .header("x-gateway-signature", sign_webhook(body.as_bytes()))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let outcome: serde_json::Value = res.json().await.unwrap();
    assert_eq!(outcome["outcome"], "credited");

    // ₱500 top-up with a {50000 → 5000} tier: 50000 main + 5000 bonus.
    let res = client
        .get(format!("{}/wallets/{}", base_url, user_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let wallet: serde_json::Value = res.json().await.unwrap();
    assert_eq!(wallet["balance"], 50000);
    assert_eq!(wallet["bonus_balance"], 5000);

    // The post-redirect poll lands after the webhook: terminal row
    // short-circuits without another gateway round trip.
    let res = client
        .post(format!("{}/topups/src_test_1/check", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let outcome: serde_json::Value = res.json().await.unwrap();
    assert_eq!(outcome["outcome"], "already_completed");

    let res = client
        .get(format!("{}/wallets/{}", base_url, user_id))
        .send()
        .await
        .unwrap();
    let wallet: serde_json::Value = res.json().await.unwrap();
    assert_eq!(wallet["balance"], 50000);
    assert_eq!(wallet["bonus_balance"], 5000);

    get_source.assert_async().await;
    create_payment.assert_async().await;
}

#[tokio::test]
async fn pending_source_stays_pending() {
    let mut server = mockito::Server::new_async().await;
    let (base_url, pool, _container) = setup_test_app(&server.url()).await;
    seed_bonus_tiers(&pool).await;

    let client = reqwest::Client::new();
    let user_id = Uuid::new_v4();

    let _create_source = server
        .mock("POST", "/sources")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"data":{"id":"src_test_2","attributes":{"status":"pending","redirect":{"checkout_url":"https://checkout.example.test/src_test_2"}}}}"#,
        )
        .create_async()
        .await;
    let _get_source = server
        .mock("GET", "/sources/src_test_2")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"data":{"id":"src_test_2","attributes":{"status":"pending","redirect":null}}}"#,
        )
        .create_async()
        .await;

    let res = client
        .post(format!("{}/wallets/{}/topups", base_url, user_id))
        .json(&json!({ "amount": 20000, "ewallet_type": "paymaya" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(format!("{}/topups/src_test_2/check", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let outcome: serde_json::Value = res.json().await.unwrap();
    assert_eq!(outcome["outcome"], "still_pending");

    // No credit while the customer has not paid.
    let res = client
        .get(format!("{}/wallets/{}/topups/pending", base_url, user_id))
        .send()
        .await
        .unwrap();
    let pending: serde_json::Value = res.json().await.unwrap();
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["source_id"], "src_test_2");
}

#[tokio::test]
async fn failed_source_never_credits() {
    let mut server = mockito::Server::new_async().await;
    let (base_url, pool, _container) = setup_test_app(&server.url()).await;
    seed_bonus_tiers(&pool).await;

    let client = reqwest::Client::new();
    let user_id = Uuid::new_v4();

    let _create_source = server
        .mock("POST", "/sources")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"data":{"id":"src_test_3","attributes":{"status":"pending","redirect":null}}}"#,
        )
        .create_async()
        .await;
    let _get_source = server
        .mock("GET", "/sources/src_test_3")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"data":{"id":"src_test_3","attributes":{"status":"failed","redirect":null}}}"#,
        )
        .create_async()
        .await;

    client
        .post(format!("{}/wallets/{}/topups", base_url, user_id))
        .json(&json!({ "amount": 30000, "ewallet_type": "gcash" }))
        .send()
        .await
        .unwrap();

    let res = client
        .post(format!("{}/topups/src_test_3/check", base_url))
        .send()
        .await
        .unwrap();
    let outcome: serde_json::Value = res.json().await.unwrap();
    assert_eq!(outcome["outcome"], "failed");

    // Wallet was never created, so there is nothing to have credited.
    let res = client
        .get(format!("{}/wallets/{}", base_url, user_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn topup_below_minimum_is_rejected() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/wallets/{}/topups", base_url, Uuid::new_v4()))
        .json(&json!({ "amount": 5000, "ewallet_type": "gcash" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_ewallet_type_is_rejected() {
    let server = mockito::Server::new_async().await;
    let (base_url, _pool, _container) = setup_test_app(&server.url()).await;

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/wallets/{}/topups", base_url, Uuid::new_v4()))
        .json(&json!({ "amount": 50000, "ewallet_type": "bitcoin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
